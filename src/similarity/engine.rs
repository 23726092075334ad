use super::ranking::{RankedCandidate, TopCandidates};
use super::{
    detect_key, match_sequence, similarity_score, MatchElement, SimilarityError, SimilarityMatch,
    SimilarityResult,
};
use crate::corpus::{load_corpus, Corpus, CorpusSource, SongId};
use crate::index::{canonicalize, CanonicalProgression, ProgressionIndex};
use crate::music::{Key, SEMITONES};
use crate::normalizer::parse_progression;
use crate::registry::{KeyEquivalenceRegistry, DEFAULT_KEY_GROUPS};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilaritySettings {
    pub default_limit: usize,
    pub max_limit: usize,
    pub min_score: f64,
    pub root_match_cost: f64,
    pub collapse_repeats: bool,
}

impl Default for SimilaritySettings {
    fn default() -> Self {
        SimilaritySettings {
            default_limit: 20,
            max_limit: 100,
            min_score: 0.0,
            root_match_cost: 0.5,
            collapse_repeats: true,
        }
    }
}

impl SimilaritySettings {
    /// Missing or zero limits mean the default; anything above the cap is capped.
    pub fn resolve_limit(&self, requested: Option<usize>) -> usize {
        let limit = match requested {
            None | Some(0) => self.default_limit,
            Some(n) => n,
        };
        limit.min(self.max_limit)
    }
}

/// Everything a query reads. Immutable once built; reloads build a new one.
#[derive(Debug)]
pub struct CorpusContext {
    pub corpus: Corpus,
    pub index: ProgressionIndex,
    pub registry: Arc<KeyEquivalenceRegistry>,
    pub reference: Key,
}

/// The canonical form of a query, before it is compared to the index.
struct Query<'a> {
    song_id: Option<SongId>,
    sequence: &'a [MatchElement],
    offset: u8,
}

impl CorpusContext {
    pub fn build(
        corpus: Corpus,
        registry: Arc<KeyEquivalenceRegistry>,
        reference: Key,
        collapse_repeats: bool,
    ) -> CorpusContext {
        let index = ProgressionIndex::build(&corpus, &registry, reference, collapse_repeats);
        CorpusContext {
            corpus,
            index,
            registry,
            reference,
        }
    }

    /// Reads the corpus and builds a context from it.
    ///
    /// Key groups come from `key_groups` when given, otherwise from the source,
    /// otherwise the relative major/minor pairs. An invalid partition is fatal.
    pub fn load(
        source: &dyn CorpusSource,
        key_groups: Option<&str>,
        reference: Key,
        collapse_repeats: bool,
    ) -> Result<CorpusContext> {
        let stored_groups = match key_groups {
            Some(_) => None,
            None => source
                .load_key_groups()
                .context("Could not read key groups from the corpus source")?,
        };
        let (groups, origin) = match (key_groups, stored_groups.as_deref()) {
            (Some(groups), _) => (groups, "configuration"),
            (None, Some(groups)) => (groups, "corpus source"),
            (None, None) => (DEFAULT_KEY_GROUPS, "defaults"),
        };
        let registry = KeyEquivalenceRegistry::parse(groups)
            .with_context(|| format!("Invalid key groups from {}: {:?}", origin, groups))?;
        info!(
            "Using {} key equivalence classes from {}",
            registry.classes().len(),
            origin
        );

        let corpus = load_corpus(source)?;
        Ok(CorpusContext::build(
            corpus,
            Arc::new(registry),
            reference,
            collapse_repeats,
        ))
    }

    pub fn similar_by_existing(
        &self,
        song_id: SongId,
        limit: Option<usize>,
        settings: &SimilaritySettings,
    ) -> Result<SimilarityResult, SimilarityError> {
        let entry = self.index.by_id(song_id)?;
        // Nothing to align against: every candidate would score 0.
        if entry.match_sequence.is_empty() {
            debug!("Song {} has no recognized chords, no matches", song_id);
            return Ok(SimilarityResult {
                query_song_id: Some(song_id),
                matches: vec![],
                warnings: entry.warnings.clone(),
            });
        }
        let query = Query {
            song_id: Some(song_id),
            sequence: &entry.match_sequence,
            offset: entry.offset,
        };
        Ok(SimilarityResult {
            query_song_id: Some(song_id),
            matches: self.rank(&query, settings.resolve_limit(limit), settings),
            warnings: entry.warnings.clone(),
        })
    }

    /// Ranks the corpus against a raw chord string. The key is detected from
    /// the chords unless `key_hint` names one.
    pub fn similar_by_chords(
        &self,
        raw_chords: &str,
        key_hint: Option<&str>,
        limit: Option<usize>,
        settings: &SimilaritySettings,
    ) -> Result<(SimilarityResult, Key), SimilarityError> {
        let progression = parse_progression(raw_chords);
        let detected = detect_key(&progression)
            .ok_or_else(|| SimilarityError::UnparsableInput(raw_chords.to_string()))?;
        let key = match key_hint {
            Some(name) => name.parse::<Key>()?,
            None => detected,
        };
        debug!("Chord query {:?} taken as {}", raw_chords, key);

        let normalized = canonicalize(&progression, key, &self.registry, self.reference);
        let sequence = match_sequence(&normalized.progression, self.index.collapse_repeats());
        let query = Query {
            song_id: None,
            sequence: &sequence,
            offset: normalized.offset,
        };
        let result = SimilarityResult {
            query_song_id: None,
            matches: self.rank(&query, settings.resolve_limit(limit), settings),
            warnings: normalized.warnings,
        };
        Ok((result, key))
    }

    fn score_candidate(
        &self,
        query: &Query,
        candidate: &CanonicalProgression,
        settings: &SimilaritySettings,
    ) -> Option<RankedCandidate> {
        if query.song_id == Some(candidate.song_id) || candidate.match_sequence.is_empty() {
            return None;
        }
        let score = similarity_score(
            query.sequence,
            &candidate.match_sequence,
            settings.root_match_cost,
        );
        if score < settings.min_score {
            return None;
        }
        Some(RankedCandidate {
            song_id: candidate.song_id,
            score,
            hits: candidate.hits,
            matched_key: candidate.original_key,
            transposition: (query.offset + SEMITONES - candidate.offset) % SEMITONES,
        })
    }

    fn rank(
        &self,
        query: &Query,
        limit: usize,
        settings: &SimilaritySettings,
    ) -> Vec<SimilarityMatch> {
        self.index
            .entries()
            .par_iter()
            .fold(
                || TopCandidates::new(limit),
                |mut holder, candidate| {
                    if let Some(ranked) = self.score_candidate(query, candidate, settings) {
                        holder.maybe_add(ranked);
                    }
                    holder
                },
            )
            .reduce(|| TopCandidates::new(limit), TopCandidates::merge)
            .into_ranked()
            .into_iter()
            .map(Into::into)
            .collect()
    }
}

/// Serves queries against the active corpus context and swaps it on reload.
pub struct SimilarityEngine {
    active: RwLock<Arc<CorpusContext>>,
    settings: SimilaritySettings,
}

impl SimilarityEngine {
    pub fn new(context: CorpusContext, settings: SimilaritySettings) -> SimilarityEngine {
        SimilarityEngine {
            active: RwLock::new(Arc::new(context)),
            settings,
        }
    }

    pub fn settings(&self) -> &SimilaritySettings {
        &self.settings
    }

    /// The context current at call time. Queries keep using it even if a
    /// reload happens meanwhile.
    pub fn snapshot(&self) -> Arc<CorpusContext> {
        match self.active.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Makes `context` the active one. The lock is held only for the swap.
    pub fn reload(&self, context: CorpusContext) {
        let context = Arc::new(context);
        let mut guard = match self.active.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = context;
    }

    pub fn similar_by_existing(
        &self,
        song_id: SongId,
        limit: Option<usize>,
    ) -> Result<SimilarityResult, SimilarityError> {
        self.snapshot()
            .similar_by_existing(song_id, limit, &self.settings)
    }

    pub fn similar_by_chords(
        &self,
        raw_chords: &str,
        key_hint: Option<&str>,
        limit: Option<usize>,
    ) -> Result<(SimilarityResult, Key), SimilarityError> {
        self.snapshot()
            .similar_by_chords(raw_chords, key_hint, limit, &self.settings)
    }
}
