use super::pitch::{parse_note_prefix, Accidental, PitchClass};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A key name outside the fixed key space.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key \"{0}\"")]
pub struct UnknownKey(pub String);

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mode {
    Major,
    Minor,
}

/// A musical key. Enharmonic spellings map to the same value.
///
/// Ordering is majors before minors, then by tonic starting at C.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    pub mode: Mode,
    pub tonic: PitchClass,
}

impl Key {
    pub const COUNT: usize = 24;

    pub fn major(tonic: i32) -> Key {
        Key {
            mode: Mode::Major,
            tonic: PitchClass::new(tonic),
        }
    }

    pub fn minor(tonic: i32) -> Key {
        Key {
            mode: Mode::Minor,
            tonic: PitchClass::new(tonic),
        }
    }

    /// Every key of the fixed key space, in key order.
    pub fn all() -> impl Iterator<Item = Key> {
        (0..12)
            .map(Key::major)
            .chain((0..12).map(Key::minor))
    }

    /// Dense index in `0..Key::COUNT`, following key order.
    pub fn index(self) -> usize {
        let base = match self.mode {
            Mode::Major => 0,
            Mode::Minor => 12,
        };
        base + self.tonic.value() as usize
    }

    /// Tonic of the major key sharing this key's signature.
    pub fn signature_pitch(self) -> PitchClass {
        match self.mode {
            Mode::Major => self.tonic,
            Mode::Minor => self.tonic.transpose(3),
        }
    }

    /// Conventional accidental style for chords written in this key.
    pub fn preferred_accidental(self) -> Accidental {
        match self.signature_pitch().value() {
            1 | 3 | 5 | 8 | 10 => Accidental::Flat,
            _ => Accidental::Sharp,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tonic = self.tonic.name(self.preferred_accidental());
        match self.mode {
            Mode::Major => write!(f, "{}", tonic),
            Mode::Minor => write!(f, "{}m", tonic),
        }
    }
}

impl FromStr for Key {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (tonic, _, consumed) =
            parse_note_prefix(trimmed).ok_or_else(|| UnknownKey(s.to_string()))?;

        let rest = trimmed[consumed..].trim();
        let mode = match rest {
            "" | "M" => Mode::Major,
            "-" => Mode::Minor,
            _ => match rest.to_lowercase().as_str() {
                "maj" | "major" => Mode::Major,
                "m" | "min" | "minor" => Mode::Minor,
                _ => return Err(UnknownKey(s.to_string())),
            },
        };

        Ok(Key { mode, tonic })
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
