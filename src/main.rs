use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chordmatch_server::config::{AppConfig, CliConfig, FileConfig};
use chordmatch_server::corpus::{CorpusSource, SqliteCorpusSource};
use chordmatch_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use chordmatch_server::similarity::{CorpusContext, SimilarityEngine, SimilaritySettings};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite corpus database file.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Optional TOML config file. Its values override the CLI.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3010)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9100)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Upper bound in seconds for a single similarity query.
    #[clap(long, default_value_t = 10)]
    pub query_timeout_sec: u64,

    /// Key equivalence groups: keys of a group joined by '|', groups separated
    /// by ',', e.g. "C|Am,G|Em,...". Defaults to relative pairs.
    #[clap(long)]
    pub key_groups: Option<String>,

    /// Key every progression is normalized into before matching.
    #[clap(long)]
    pub reference_key: Option<String>,

    /// Number of matches returned when a query does not ask for a limit.
    #[clap(long, default_value_t = 20)]
    pub default_limit: usize,

    /// Hard cap on the number of matches per query.
    #[clap(long, default_value_t = 100)]
    pub max_limit: usize,

    /// Candidates scoring below this are left out.
    #[clap(long, default_value_t = 0.0)]
    pub min_score: f64,

    /// Cost of substituting a chord with another of the same root.
    #[clap(long, default_value_t = 0.5)]
    pub root_match_cost: f64,

    /// Keep consecutive repeated chords when matching.
    #[clap(long)]
    pub no_collapse_repeats: bool,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_path: self.db_path.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            query_timeout_sec: self.query_timeout_sec,
            key_groups: self.key_groups.clone(),
            reference_key: self.reference_key.clone(),
            default_limit: self.default_limit,
            max_limit: self.max_limit,
            min_score: self.min_score,
            root_match_cost: self.root_match_cost,
            collapse_repeats: !self.no_collapse_repeats,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}...", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!("Opening SQLite corpus database at {:?}...", app_config.db_path);
    let corpus_source: Arc<dyn CorpusSource> =
        Arc::new(SqliteCorpusSource::new(&app_config.db_path));

    let similarity: SimilaritySettings = app_config.similarity.clone();
    let context = CorpusContext::load(
        corpus_source.as_ref(),
        app_config.key_groups.as_deref(),
        app_config.reference_key,
        similarity.collapse_repeats,
    )?;

    info!("Initializing metrics...");
    metrics::init_metrics();
    metrics::set_corpus_metrics(
        context.corpus.len(),
        context.index.len(),
        context.registry.classes().len(),
    );

    let engine = Arc::new(SimilarityEngine::new(context, similarity));

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level,
        port: app_config.port,
        metrics_port: app_config.metrics_port,
        query_timeout_sec: app_config.query_timeout_sec,
        key_groups: app_config.key_groups,
        reference_key: app_config.reference_key,
    };

    info!("Ready to serve at port {}!", server_config.port);
    info!("Metrics available at port {}!", server_config.metrics_port);
    run_server(server_config, engine, corpus_source).await
}
