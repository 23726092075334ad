//! Progression index: every song's progression moved into the reference key.

use crate::corpus::{Corpus, SongId};
use crate::music::{ChordToken, Key};
use crate::normalizer::{self, MalformedTokenWarning, NormalizedProgression};
use crate::registry::KeyEquivalenceRegistry;
use crate::similarity::{match_sequence, MatchElement, SimilarityError};
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::info;

/// Transposes a progression written in `key` into the class of `reference`.
/// Only class anchors decide the offset.
pub fn canonicalize(
    progression: &[ChordToken],
    key: Key,
    registry: &KeyEquivalenceRegistry,
    reference: Key,
) -> NormalizedProgression {
    normalizer::normalize(
        progression,
        registry.class_of(key).anchor(),
        registry.class_of(reference).anchor(),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalProgression {
    pub song_id: SongId,
    pub original_key: Key,
    pub progression: Vec<ChordToken>,
    pub offset: u8,
    pub warnings: Vec<MalformedTokenWarning>,
    pub match_sequence: Vec<MatchElement>,
    pub hits: i64,
}

#[derive(Debug)]
pub struct ProgressionIndex {
    entries: Vec<CanonicalProgression>,
    position_by_id: HashMap<SongId, usize>,
    reference: Key,
    collapse_repeats: bool,
}

impl ProgressionIndex {
    /// Entries are ordered by song id, so the same corpus always yields the
    /// same index regardless of how it was read.
    pub fn build(
        corpus: &Corpus,
        registry: &KeyEquivalenceRegistry,
        reference: Key,
        collapse_repeats: bool,
    ) -> ProgressionIndex {
        let mut entries: Vec<CanonicalProgression> = corpus
            .par_iter_songs()
            .map(|song| {
                let normalized = canonicalize(&song.chords, song.key, registry, reference);
                CanonicalProgression {
                    song_id: song.id,
                    original_key: song.key,
                    match_sequence: match_sequence(&normalized.progression, collapse_repeats),
                    progression: normalized.progression,
                    offset: normalized.offset,
                    warnings: normalized.warnings,
                    hits: song.hits,
                }
            })
            .collect();
        entries.par_sort_unstable_by_key(|e| e.song_id);

        let position_by_id = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.song_id, position))
            .collect();

        info!(
            "Indexed {} progressions in reference key {}",
            entries.len(),
            reference
        );

        ProgressionIndex {
            entries,
            position_by_id,
            reference,
            collapse_repeats,
        }
    }

    pub fn by_id(&self, song_id: SongId) -> Result<&CanonicalProgression, SimilarityError> {
        self.position_by_id
            .get(&song_id)
            .map(|position| &self.entries[*position])
            .ok_or(SimilarityError::NotFound(song_id))
    }

    pub fn entries(&self) -> &[CanonicalProgression] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reference(&self) -> Key {
        self.reference
    }

    pub fn collapse_repeats(&self) -> bool {
        self.collapse_repeats
    }
}
