//! Edit-distance alignment between chord sequences.

use crate::music::{ChordToken, PitchClass, QualityFamily};

/// What a chord contributes to matching: its root and harmonic family.
/// Suffix details and slash basses don't take part.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MatchElement {
    pub root: PitchClass,
    pub family: QualityFamily,
}

/// Reduces a progression to the elements used for alignment.
/// Unrecognized tokens are dropped.
pub fn match_sequence(progression: &[ChordToken], collapse_repeats: bool) -> Vec<MatchElement> {
    let mut sequence: Vec<MatchElement> = Vec::with_capacity(progression.len());
    for chord in progression.iter().filter_map(ChordToken::as_chord) {
        let element = MatchElement {
            root: chord.root.pitch,
            family: chord.family,
        };
        if collapse_repeats && sequence.last() == Some(&element) {
            continue;
        }
        sequence.push(element);
    }
    sequence
}

fn substitution_cost(a: &MatchElement, b: &MatchElement, root_match_cost: f64) -> f64 {
    if a == b {
        0.0
    } else if a.root == b.root {
        root_match_cost
    } else {
        1.0
    }
}

/// Levenshtein distance where substituting a chord for another on the same
/// root costs `root_match_cost` instead of a full edit.
pub fn weighted_edit_distance(a: &[MatchElement], b: &[MatchElement], root_match_cost: f64) -> f64 {
    if a.is_empty() {
        return b.len() as f64;
    }
    if b.is_empty() {
        return a.len() as f64;
    }

    let mut prev_row: Vec<f64> = (0..=b.len()).map(|j| j as f64).collect();
    let mut curr_row: Vec<f64> = vec![0.0; b.len() + 1];

    for (i, a_el) in a.iter().enumerate() {
        curr_row[0] = (i + 1) as f64;

        for (j, b_el) in b.iter().enumerate() {
            let cost = substitution_cost(a_el, b_el, root_match_cost);

            curr_row[j + 1] = (prev_row[j + 1] + 1.0) // deletion
                .min(curr_row[j] + 1.0) // insertion
                .min(prev_row[j] + cost); // substitution
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b.len()]
}

/// Similarity in `[0, 1]`: one minus the distance over the longer length.
pub fn similarity_score(a: &[MatchElement], b: &[MatchElement], root_match_cost: f64) -> f64 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    let distance = weighted_edit_distance(a, b, root_match_cost);
    (1.0 - distance / longest as f64).clamp(0.0, 1.0)
}
