use std::fmt;

pub const SEMITONES: u8 = 12;

const SHARP_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const FLAT_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// One of the twelve chromatic pitch classes, 0 = C.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PitchClass(u8);

impl PitchClass {
    pub fn new(value: i32) -> PitchClass {
        PitchClass(value.rem_euclid(SEMITONES as i32) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn transpose(self, semitones: i32) -> PitchClass {
        PitchClass::new(self.0 as i32 + semitones)
    }

    /// Semitones to move up from `self` to reach `other`, in `0..12`.
    pub fn interval_to(self, other: PitchClass) -> u8 {
        (other.0 + SEMITONES - self.0) % SEMITONES
    }

    pub fn is_natural(self) -> bool {
        !matches!(self.0, 1 | 3 | 6 | 8 | 10)
    }

    /// Name of this pitch class using the given accidental style.
    /// Natural style falls back to sharps for black keys.
    pub fn name(self, style: Accidental) -> &'static str {
        match style {
            Accidental::Flat => FLAT_NAMES[self.0 as usize],
            Accidental::Natural | Accidental::Sharp => SHARP_NAMES[self.0 as usize],
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name(Accidental::Sharp))
    }
}

/// How a note was (or should be) spelled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Accidental {
    #[default]
    Natural,
    Sharp,
    Flat,
}

fn letter_value(letter: char) -> Option<i32> {
    match letter {
        'C' => Some(0),
        'D' => Some(2),
        'E' => Some(4),
        'F' => Some(5),
        'G' => Some(7),
        'A' => Some(9),
        'B' => Some(11),
        _ => None,
    }
}

/// Parses a note name at the start of `text`: an upper-case letter followed by
/// up to two identical accidentals (`#`, `##`, `b`, `bb`).
///
/// Returns the pitch class, the accidental style and the number of bytes consumed.
pub fn parse_note_prefix(text: &str) -> Option<(PitchClass, Accidental, usize)> {
    let mut chars = text.chars();
    let letter = chars.next()?;
    let base = letter_value(letter)?;

    let mut consumed = letter.len_utf8();
    let mut shift = 0;
    let mut style = Accidental::Natural;

    for c in chars.take(2) {
        let (step, this_style) = match c {
            '#' => (1, Accidental::Sharp),
            'b' => (-1, Accidental::Flat),
            _ => break,
        };
        if style != Accidental::Natural && style != this_style {
            break;
        }
        style = this_style;
        shift += step;
        consumed += c.len_utf8();
    }

    Some((PitchClass::new(base + shift), style, consumed))
}
