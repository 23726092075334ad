//! Similarity engine: ranks indexed progressions against a query.

mod alignment;
mod engine;
mod key_detection;
mod ranking;

pub use alignment::{match_sequence, similarity_score, weighted_edit_distance, MatchElement};
pub use engine::{CorpusContext, SimilarityEngine, SimilaritySettings};
pub use key_detection::detect_key;

use crate::corpus::SongId;
use crate::music::{Key, UnknownKey};
use crate::normalizer::MalformedTokenWarning;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimilarityError {
    #[error(transparent)]
    UnknownKey(#[from] UnknownKey),

    #[error("song {0} not found")]
    NotFound(SongId),

    #[error("no chord recognized in {0:?}")]
    UnparsableInput(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityMatch {
    pub song_id: SongId,
    pub score: f64,
    /// The candidate's own key.
    pub matched_key: Key,
    /// Semitones to move the query up so it sounds in `matched_key`'s class.
    pub transposition: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityResult {
    /// `None` when the query was a raw chord string.
    pub query_song_id: Option<SongId>,
    pub matches: Vec<SimilarityMatch>,
    pub warnings: Vec<MalformedTokenWarning>,
}
