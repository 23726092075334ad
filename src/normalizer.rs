//! Chord normalizer: raw progression parsing and key-to-key transposition.

use crate::music::{ChordToken, Key};
use serde::Serialize;

/// Semitones to move up from `source` to reach `target`, in `0..12`.
///
/// Relative keys share a signature, so the interval between C and Am is 0.
pub fn interval(source: Key, target: Key) -> u8 {
    source.signature_pitch().interval_to(target.signature_pitch())
}

/// A token that could not be read as a chord. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedTokenWarning {
    pub position: usize,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedProgression {
    pub progression: Vec<ChordToken>,
    pub offset: u8,
    pub warnings: Vec<MalformedTokenWarning>,
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ',' || c == '|' || c == ';'
}

/// Splits a raw chord string into tokens. Empty pieces are skipped.
pub fn parse_progression(raw: &str) -> Vec<ChordToken> {
    raw.split(is_separator)
        .filter(|t| !t.is_empty())
        .map(ChordToken::parse)
        .collect()
}

pub fn malformed_tokens(progression: &[ChordToken]) -> Vec<MalformedTokenWarning> {
    progression
        .iter()
        .enumerate()
        .filter_map(|(position, token)| match token {
            ChordToken::Unrecognized(text) => Some(MalformedTokenWarning {
                position,
                token: text.clone(),
            }),
            ChordToken::Chord(_) => None,
        })
        .collect()
}

/// Transposes every pitch-bearing part of every token by `semitones`.
/// Unrecognized tokens pass through untouched.
pub fn transpose_progression(
    progression: &[ChordToken],
    semitones: u8,
    target: Key,
) -> Vec<ChordToken> {
    let fallback = target.preferred_accidental();
    progression
        .iter()
        .map(|token| token.transposed(semitones, fallback))
        .collect()
}

/// Moves a progression written in `source` into `target`.
pub fn normalize(progression: &[ChordToken], source: Key, target: Key) -> NormalizedProgression {
    let offset = interval(source, target);
    NormalizedProgression {
        progression: transpose_progression(progression, offset, target),
        offset,
        warnings: malformed_tokens(progression),
    }
}
