use axum::extract::FromRef;

use crate::corpus::CorpusSource;
use crate::similarity::SimilarityEngine;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedEngine = Arc<SimilarityEngine>;
pub type GuardedCorpusSource = Arc<dyn CorpusSource>;
/// Serializes reloads so two rebuilds never race to swap.
pub type ReloadLock = Arc<tokio::sync::Mutex<()>>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub engine: GuardedEngine,
    pub corpus_source: GuardedCorpusSource,
    pub reload_lock: ReloadLock,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        engine: GuardedEngine,
        corpus_source: GuardedCorpusSource,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            engine,
            corpus_source,
            reload_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

impl FromRef<ServerState> for GuardedEngine {
    fn from_ref(input: &ServerState) -> Self {
        input.engine.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
