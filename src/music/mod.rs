//! Musical primitives: pitch classes, keys and chord tokens.

mod chord;
mod key;
mod pitch;

pub use chord::{Chord, ChordToken, QualityFamily, SpelledPitch};
pub use key::{Key, Mode, UnknownKey};
pub use pitch::{parse_note_prefix, Accidental, PitchClass, SEMITONES};
