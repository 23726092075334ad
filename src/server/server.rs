use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{log_requests, metrics, state::*, ServerConfig};
use crate::assembler::{assemble, AssembledResult, SimilarSong};
use crate::corpus::{SongId, SongLink};
use crate::music::Key;
use crate::normalizer::MalformedTokenWarning;
use crate::similarity::{CorpusContext, SimilarityEngine, SimilarityError, SimilaritySettings};

#[derive(Debug, Error)]
enum ApiError {
    #[error(transparent)]
    Similarity(#[from] SimilarityError),

    #[error("{0}")]
    BadRequest(String),

    #[error("query did not complete within {0} seconds")]
    Timeout(u64),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Similarity(SimilarityError::NotFound(_)) => "not_found",
            ApiError::Similarity(SimilarityError::UnparsableInput(_)) => "unparsable_input",
            ApiError::Similarity(SimilarityError::UnknownKey(_)) => "unknown_key",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Timeout(_) => "timeout",
            ApiError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Similarity(SimilarityError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Similarity(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub songs: usize,
    pub indexed: usize,
    pub reference_key: Key,
    pub key_classes: usize,
    pub settings: SimilaritySettings,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct SimBySongParams {
    pub songid: Option<String>,
    pub limit: Option<String>,
}

#[derive(Deserialize, Debug)]
struct SimByProgParams {
    pub chords: Option<String>,
    pub key: Option<String>,
    pub limit: Option<String>,
}

#[derive(Serialize)]
struct SimBySongResponse {
    query_song_id: SongId,
    dataset: Vec<SimilarSong>,
    links: Vec<SongLink>,
    warnings: Vec<MalformedTokenWarning>,
    dropped: usize,
}

#[derive(Serialize)]
struct SimByProgResponse {
    dataset: Vec<SimilarSong>,
    comp_key: Key,
    warnings: Vec<MalformedTokenWarning>,
    dropped: usize,
}

#[derive(Serialize)]
struct ReloadResponse {
    songs: usize,
    indexed: usize,
    duration_ms: u128,
}

fn parse_limit(raw: Option<&str>) -> Result<Option<usize>, ApiError> {
    match raw {
        None => Ok(None),
        Some(text) => text
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ApiError::BadRequest(format!("invalid limit {:?}", text))),
    }
}

/// Runs a query off the async runtime, bounded by the configured timeout.
async fn run_query<T, F>(state: &ServerState, kind: &'static str, query: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&SimilarityEngine) -> Result<T, SimilarityError> + Send + 'static,
{
    let engine = state.engine.clone();
    let timeout_sec = state.config.query_timeout_sec;
    let start = Instant::now();

    let task = tokio::task::spawn_blocking(move || query(&engine));
    let outcome = match tokio::time::timeout(Duration::from_secs(timeout_sec), task).await {
        Err(_) => Err(ApiError::Timeout(timeout_sec)),
        Ok(Err(join_error)) => Err(ApiError::Internal(format!(
            "query task failed: {}",
            join_error
        ))),
        Ok(Ok(result)) => result.map_err(ApiError::from),
    };

    let label = match &outcome {
        Ok(_) => "ok",
        Err(err) => err.kind(),
    };
    metrics::record_similarity_query(kind, label, start.elapsed());
    outcome
}

fn record_assembly(assembled: &AssembledResult) {
    if assembled.dropped > 0 {
        metrics::record_dropped_rows(assembled.dropped);
    }
}

async fn list_corpus(State(engine): State<GuardedEngine>) -> Response {
    let context = engine.snapshot();
    Json(context.corpus.songs_by_id()).into_response()
}

async fn sim_by_song(
    State(state): State<ServerState>,
    Query(params): Query<SimBySongParams>,
) -> Result<Json<SimBySongResponse>, ApiError> {
    let raw_id = params
        .songid
        .ok_or_else(|| ApiError::BadRequest("songid parameter is required".to_string()))?;
    let song_id: SongId = raw_id
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid songid {:?}", raw_id)))?;
    let limit = parse_limit(params.limit.as_deref())?;

    let (assembled, links) = run_query(&state, "by_song", move |engine| {
        let context = engine.snapshot();
        let result = context.similar_by_existing(song_id, limit, engine.settings())?;
        let links = context.corpus.links(song_id).to_vec();
        Ok((assemble(&context.corpus, result), links))
    })
    .await?;
    record_assembly(&assembled);

    Ok(Json(SimBySongResponse {
        query_song_id: song_id,
        dataset: assembled.rows,
        links,
        warnings: assembled.warnings,
        dropped: assembled.dropped,
    }))
}

async fn sim_by_prog(
    State(state): State<ServerState>,
    Query(params): Query<SimByProgParams>,
) -> Result<Json<SimByProgResponse>, ApiError> {
    let chords = params
        .chords
        .ok_or_else(|| ApiError::BadRequest("chords parameter is required".to_string()))?;
    let key_hint = params.key.filter(|k| !k.trim().is_empty());
    let limit = parse_limit(params.limit.as_deref())?;

    let (assembled, comp_key) = run_query(&state, "by_chords", move |engine| {
        let context = engine.snapshot();
        let (result, key) =
            context.similar_by_chords(&chords, key_hint.as_deref(), limit, engine.settings())?;
        Ok((assemble(&context.corpus, result), key))
    })
    .await?;
    record_assembly(&assembled);

    Ok(Json(SimByProgResponse {
        dataset: assembled.rows,
        comp_key,
        warnings: assembled.warnings,
        dropped: assembled.dropped,
    }))
}

async fn get_stats(State(state): State<ServerState>) -> impl IntoResponse {
    let context = state.engine.snapshot();
    Json(ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        songs: context.corpus.len(),
        indexed: context.index.len(),
        reference_key: context.reference,
        key_classes: context.registry.classes().len(),
        settings: state.engine.settings().clone(),
    })
}

/// Rebuilds the corpus context from the source and swaps it in.
/// On failure the active context keeps serving.
async fn reload(State(state): State<ServerState>) -> Result<Json<ReloadResponse>, ApiError> {
    let _guard = state.reload_lock.lock().await;

    let source = state.corpus_source.clone();
    let key_groups = state.config.key_groups.clone();
    let reference = state.config.reference_key;
    let collapse_repeats = state.engine.settings().collapse_repeats;
    let start = Instant::now();

    let loaded = tokio::task::spawn_blocking(move || {
        CorpusContext::load(
            source.as_ref(),
            key_groups.as_deref(),
            reference,
            collapse_repeats,
        )
    })
    .await;

    let context = match loaded {
        Ok(Ok(context)) => context,
        Ok(Err(err)) => {
            metrics::record_reload("error");
            warn!("Reload failed, keeping the active corpus: {:#}", err);
            return Err(ApiError::Internal(format!("reload failed: {:#}", err)));
        }
        Err(join_error) => {
            metrics::record_reload("error");
            return Err(ApiError::Internal(format!(
                "reload task failed: {}",
                join_error
            )));
        }
    };

    let response = ReloadResponse {
        songs: context.corpus.len(),
        indexed: context.index.len(),
        duration_ms: start.elapsed().as_millis(),
    };
    metrics::set_corpus_metrics(
        context.corpus.len(),
        context.index.len(),
        context.registry.classes().len(),
    );
    state.engine.reload(context);
    metrics::record_reload("ok");
    info!(
        "Corpus reloaded: {} songs in {}ms",
        response.songs, response.duration_ms
    );

    Ok(Json(response))
}

pub fn make_app(state: ServerState) -> Router {
    Router::new()
        .route("/", get(list_corpus))
        .route("/sim-by-song", get(sim_by_song))
        .route("/sim-by-prog", get(sim_by_prog))
        .route("/stats", get(get_stats))
        .route("/reload", post(reload))
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .with_state(state)
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics::metrics_handler))
}

pub async fn run_server(
    config: ServerConfig,
    engine: GuardedEngine,
    corpus_source: GuardedCorpusSource,
) -> Result<()> {
    let metrics_listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", config.metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", config.metrics_port))?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, make_metrics_app()).await {
            error!("Metrics server stopped: {}", err);
        }
    });

    let port = config.port;
    let app = make_app(ServerState::new(config, engine, corpus_source));

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;

    Ok(axum::serve(listener, app).await?)
}
