use super::SimilarityMatch;
use crate::corpus::SongId;
use crate::music::Key;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// A scored candidate. Ordering puts the best candidate last: higher score,
/// then more hits, then the lower song id.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub song_id: SongId,
    pub score: f64,
    pub hits: i64,
    pub matched_key: Key,
    pub transposition: u8,
}

impl PartialEq for RankedCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankedCandidate {}

impl Ord for RankedCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then(self.hits.cmp(&other.hits))
            .then(other.song_id.cmp(&self.song_id))
    }
}

impl PartialOrd for RankedCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<RankedCandidate> for SimilarityMatch {
    fn from(candidate: RankedCandidate) -> Self {
        SimilarityMatch {
            song_id: candidate.song_id,
            score: candidate.score,
            matched_key: candidate.matched_key,
            transposition: candidate.transposition,
        }
    }
}

/// Keeps the best `capacity` candidates seen so far.
pub struct TopCandidates {
    tree: BTreeSet<RankedCandidate>,
    capacity: usize,
}

impl TopCandidates {
    pub fn new(capacity: usize) -> TopCandidates {
        TopCandidates {
            capacity,
            tree: BTreeSet::new(),
        }
    }

    pub fn maybe_add(&mut self, candidate: RankedCandidate) {
        if self.capacity == 0 {
            return;
        }
        let should_add = self.tree.len() < self.capacity
            || self.tree.first().map(|worst| *worst < candidate).unwrap_or(true);

        if should_add {
            let _ = self.tree.insert(candidate);
            if self.tree.len() > self.capacity {
                self.tree.pop_first();
            }
        }
    }

    /// Folds another holder into this one. The result doesn't depend on
    /// how candidates were split between the two.
    pub fn merge(mut self, other: TopCandidates) -> TopCandidates {
        for candidate in other.tree {
            self.maybe_add(candidate);
        }
        self
    }

    /// Best first.
    pub fn into_ranked(self) -> Vec<RankedCandidate> {
        self.tree.into_iter().rev().collect()
    }
}
