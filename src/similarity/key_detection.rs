//! Key estimation for progressions that arrive without one.
//!
//! Chord tones are folded into a pitch-class histogram which is correlated
//! with the Krumhansl-Schmuckler key profiles for each of the 24 keys.

use crate::music::{ChordToken, Key, Mode};

const KS_MAJOR: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];
const KS_MINOR: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// Weight of the opening and closing chords, which usually sit on the tonic.
const BOUNDARY_WEIGHT: f64 = 2.0;

fn pitch_histogram(progression: &[ChordToken]) -> Option<[f64; 12]> {
    let chords: Vec<_> = progression.iter().filter_map(ChordToken::as_chord).collect();
    if chords.is_empty() {
        return None;
    }

    let last = chords.len() - 1;
    let mut histogram = [0.0; 12];
    for (i, chord) in chords.iter().enumerate() {
        let weight = if i == 0 || i == last {
            BOUNDARY_WEIGHT
        } else {
            1.0
        };
        for tone in chord.tones() {
            histogram[tone.value() as usize] += weight;
        }
    }
    Some(histogram)
}

fn pearson(x: &[f64; 12], y: &[f64; 12]) -> f64 {
    let mean_x = x.iter().sum::<f64>() / 12.0;
    let mean_y = y.iter().sum::<f64>() / 12.0;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for i in 0..12 {
        let dx = x[i] - mean_x;
        let dy = y[i] - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator == 0.0 {
        0.0
    } else {
        covariance / denominator
    }
}

fn profile_for(key: Key) -> [f64; 12] {
    let base = match key.mode {
        Mode::Major => &KS_MAJOR,
        Mode::Minor => &KS_MINOR,
    };
    let tonic = key.tonic.value() as usize;
    let mut rotated = [0.0; 12];
    for (pitch, slot) in rotated.iter_mut().enumerate() {
        *slot = base[(pitch + 12 - tonic) % 12];
    }
    rotated
}

/// Most likely key of a progression, `None` if it has no recognized chord.
/// Equal correlations resolve to the earlier key in key order.
pub fn detect_key(progression: &[ChordToken]) -> Option<Key> {
    let histogram = pitch_histogram(progression)?;

    let mut best: Option<(Key, f64)> = None;
    for key in Key::all() {
        let correlation = pearson(&histogram, &profile_for(key));
        match best {
            Some((_, best_correlation)) if correlation <= best_correlation => {}
            _ => best = Some((key, correlation)),
        }
    }
    best.map(|(key, _)| key)
}
