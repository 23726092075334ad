//! Result assembly: joins ranked matches back to song metadata.
//!
//! A match whose song is missing from the corpus is dropped from the output
//! and counted, the rest of the response is still served.

use crate::corpus::{Corpus, SongId};
use crate::music::Key;
use crate::normalizer::MalformedTokenWarning;
use crate::similarity::{SimilarityMatch, SimilarityResult};
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarSong {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub key: Key,
    pub capo: i32,
    pub score: f64,
    pub matched_key: Key,
    pub transposition: u8,
    pub hits: i64,
    pub votes: i64,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssembledResult {
    pub query_song_id: Option<SongId>,
    pub rows: Vec<SimilarSong>,
    pub warnings: Vec<MalformedTokenWarning>,
    pub dropped: usize,
}

/// Resolve a single match to its display row.
pub fn resolve_match(corpus: &Corpus, matched: &SimilarityMatch) -> Option<SimilarSong> {
    let song = corpus.get(matched.song_id)?;
    Some(SimilarSong {
        id: song.id,
        title: song.title.clone(),
        artist: song.artist.clone(),
        key: song.key,
        capo: song.capo,
        score: matched.score,
        matched_key: matched.matched_key,
        transposition: matched.transposition,
        hits: song.hits,
        votes: song.votes,
        rating: song.rating,
    })
}

pub fn assemble(corpus: &Corpus, result: SimilarityResult) -> AssembledResult {
    let total = result.matches.len();
    let rows: Vec<SimilarSong> = result
        .matches
        .iter()
        .filter_map(|m| {
            let row = resolve_match(corpus, m);
            if row.is_none() {
                warn!("Dropping match {}: song missing from corpus", m.song_id);
            }
            row
        })
        .collect();
    let dropped = total - rows.len();
    if dropped > 0 {
        warn!(
            "Dropped {} of {} matches for query {:?}",
            dropped, total, result.query_song_id
        );
    }

    AssembledResult {
        query_song_id: result.query_song_id,
        rows,
        warnings: result.warnings,
        dropped,
    }
}
