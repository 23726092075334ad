use super::pitch::{parse_note_prefix, Accidental, PitchClass};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::fmt;

lazy_static! {
    static ref QUALITY_SUFFIX: Regex =
        Regex::new(r"^(?:maj|Maj|min|dim|aug|sus|add|alt|omit|no|m|M|[0-9]|[#b+\-°øΔ()])*$")
            .expect("Invalid chord quality regex");
}

/// Harmonic family of a chord, derived from its quality suffix.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFamily {
    Major,
    Minor,
    Dominant,
    MajorSeventh,
    MinorSeventh,
    Diminished,
    HalfDiminished,
    Augmented,
    Suspended2,
    Suspended4,
    Power,
}

fn starts_with_extension(s: &str) -> bool {
    s.starts_with('7') || s.starts_with('9') || s.starts_with("11") || s.starts_with("13")
}

impl QualityFamily {
    pub fn from_suffix(suffix: &str) -> QualityFamily {
        let s = suffix;
        if s.is_empty() {
            return QualityFamily::Major;
        }
        if s == "5" {
            return QualityFamily::Power;
        }
        if s.contains('ø') || s.contains("m7b5") || s.contains("m7-5") {
            return QualityFamily::HalfDiminished;
        }
        if s.starts_with("dim") || s.starts_with('°') {
            return QualityFamily::Diminished;
        }
        if s.starts_with("aug") || s.starts_with('+') {
            return QualityFamily::Augmented;
        }
        if s.contains("sus") {
            return if s.contains("sus2") {
                QualityFamily::Suspended2
            } else {
                QualityFamily::Suspended4
            };
        }
        for prefix in ["maj", "Maj", "M", "Δ"] {
            if let Some(rest) = s.strip_prefix(prefix) {
                return if starts_with_extension(rest) {
                    QualityFamily::MajorSeventh
                } else {
                    QualityFamily::Major
                };
            }
        }
        for prefix in ["min", "m", "-"] {
            if let Some(rest) = s.strip_prefix(prefix) {
                return if starts_with_extension(rest) {
                    QualityFamily::MinorSeventh
                } else {
                    QualityFamily::Minor
                };
            }
        }
        if starts_with_extension(s) || s.starts_with("alt") {
            return QualityFamily::Dominant;
        }
        QualityFamily::Major
    }

    /// Chord tones as semitones above the root.
    pub fn intervals(self) -> &'static [u8] {
        match self {
            QualityFamily::Major => &[0, 4, 7],
            QualityFamily::Minor => &[0, 3, 7],
            QualityFamily::Dominant => &[0, 4, 7, 10],
            QualityFamily::MajorSeventh => &[0, 4, 7, 11],
            QualityFamily::MinorSeventh => &[0, 3, 7, 10],
            QualityFamily::Diminished => &[0, 3, 6],
            QualityFamily::HalfDiminished => &[0, 3, 6, 10],
            QualityFamily::Augmented => &[0, 4, 8],
            QualityFamily::Suspended2 => &[0, 2, 7],
            QualityFamily::Suspended4 => &[0, 5, 7],
            QualityFamily::Power => &[0, 7],
        }
    }
}

/// A pitch together with the spelling it was written with.
///
/// `hint` is the accidental style of the original text and survives
/// transposition, so a flat stays a flat after a round trip.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SpelledPitch {
    pub pitch: PitchClass,
    pub hint: Accidental,
    name: &'static str,
}

impl SpelledPitch {
    fn new(pitch: PitchClass, hint: Accidental, fallback: Accidental) -> SpelledPitch {
        let style = match hint {
            Accidental::Natural => fallback,
            other => other,
        };
        SpelledPitch {
            pitch,
            hint,
            name: pitch.name(style),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn transposed(&self, semitones: u8, fallback: Accidental) -> SpelledPitch {
        SpelledPitch::new(self.pitch.transpose(semitones as i32), self.hint, fallback)
    }
}

/// A recognised chord: root, verbatim quality suffix and optional slash bass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Chord {
    pub root: SpelledPitch,
    pub suffix: String,
    pub bass: Option<SpelledPitch>,
    pub family: QualityFamily,
}

impl Chord {
    pub fn parse(text: &str) -> Option<Chord> {
        let (root, root_hint, consumed) = parse_note_prefix(text)?;
        let rest = &text[consumed..];

        let (suffix, bass) = match rest.split_once('/') {
            None => (rest.to_string(), None),
            Some((suffix, bass_text)) => match parse_note_prefix(bass_text) {
                Some((bass, bass_hint, used)) if used == bass_text.len() => (
                    suffix.to_string(),
                    Some(SpelledPitch::new(bass, bass_hint, Accidental::Natural)),
                ),
                // 6/9 style extensions
                _ if !bass_text.is_empty() && bass_text.chars().all(|c| c.is_ascii_digit()) => {
                    (rest.to_string(), None)
                }
                _ => return None,
            },
        };

        let quality_part = suffix.replace('/', "");
        if !QUALITY_SUFFIX.is_match(&quality_part) {
            return None;
        }

        Some(Chord {
            root: SpelledPitch::new(root, root_hint, Accidental::Natural),
            family: QualityFamily::from_suffix(&suffix),
            suffix,
            bass,
        })
    }

    pub fn transposed(&self, semitones: u8, fallback: Accidental) -> Chord {
        Chord {
            root: self.root.transposed(semitones, fallback),
            suffix: self.suffix.clone(),
            bass: self.bass.map(|b| b.transposed(semitones, fallback)),
            family: self.family,
        }
    }

    /// Pitch classes sounding in this chord, bass included.
    pub fn tones(&self) -> impl Iterator<Item = PitchClass> + '_ {
        self.family
            .intervals()
            .iter()
            .map(|i| self.root.pitch.transpose(*i as i32))
            .chain(self.bass.map(|b| b.pitch))
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.root.name(), self.suffix)?;
        if let Some(bass) = &self.bass {
            write!(f, "/{}", bass.name())?;
        }
        Ok(())
    }
}

/// A single token of a progression.
///
/// Tokens that don't follow chord notation are kept verbatim so they can be
/// reported without failing the whole progression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChordToken {
    Chord(Chord),
    Unrecognized(String),
}

impl ChordToken {
    pub fn parse(text: &str) -> ChordToken {
        match Chord::parse(text) {
            Some(chord) => ChordToken::Chord(chord),
            None => ChordToken::Unrecognized(text.to_string()),
        }
    }

    pub fn as_chord(&self) -> Option<&Chord> {
        match self {
            ChordToken::Chord(chord) => Some(chord),
            ChordToken::Unrecognized(_) => None,
        }
    }

    pub fn is_recognized(&self) -> bool {
        self.as_chord().is_some()
    }

    pub fn transposed(&self, semitones: u8, fallback: Accidental) -> ChordToken {
        match self {
            ChordToken::Chord(chord) => ChordToken::Chord(chord.transposed(semitones, fallback)),
            ChordToken::Unrecognized(text) => ChordToken::Unrecognized(text.clone()),
        }
    }
}

impl fmt::Display for ChordToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChordToken::Chord(chord) => write!(f, "{}", chord),
            ChordToken::Unrecognized(text) => write!(f, "{}", text),
        }
    }
}

impl Serialize for ChordToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
