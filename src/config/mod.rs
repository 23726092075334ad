mod file_config;

pub use file_config::{FileConfig, SimilarityConfig};

use crate::music::Key;
use crate::registry::KeyEquivalenceRegistry;
use crate::server::RequestsLoggingLevel;
use crate::similarity::SimilaritySettings;
use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_REFERENCE_KEY: &str = "C";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub query_timeout_sec: u64,
    pub key_groups: Option<String>,
    pub reference_key: Option<String>,
    pub default_limit: usize,
    pub max_limit: usize,
    pub min_score: f64,
    pub root_match_cost: f64,
    pub collapse_repeats: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        let similarity = SimilaritySettings::default();
        CliConfig {
            db_path: None,
            port: 3010,
            metrics_port: 9100,
            logging_level: RequestsLoggingLevel::default(),
            query_timeout_sec: 10,
            key_groups: None,
            reference_key: None,
            default_limit: similarity.default_limit,
            max_limit: similarity.max_limit,
            min_score: similarity.min_score,
            root_match_cost: similarity.root_match_cost,
            collapse_repeats: similarity.collapse_repeats,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub query_timeout_sec: u64,

    /// Explicit key groups. When absent the corpus database decides.
    pub key_groups: Option<String>,
    pub reference_key: Key,
    pub similarity: SimilaritySettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in config file")
            })?;
        if !db_path.exists() {
            bail!("Corpus database does not exist: {:?}", db_path);
        }
        if !db_path.is_file() {
            bail!("db_path is not a file: {:?}", db_path);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);
        if port == metrics_port {
            bail!("port and metrics_port must differ (both {})", port);
        }

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let query_timeout_sec = file.query_timeout_sec.unwrap_or(cli.query_timeout_sec);
        if query_timeout_sec == 0 {
            bail!("query_timeout_sec must be greater than 0");
        }

        let key_groups = file.key_groups.or_else(|| cli.key_groups.clone());
        if let Some(groups) = key_groups.as_deref() {
            KeyEquivalenceRegistry::parse(groups)
                .with_context(|| format!("Invalid key groups: {:?}", groups))?;
        }

        let reference_name = file
            .reference_key
            .or_else(|| cli.reference_key.clone())
            .unwrap_or_else(|| DEFAULT_REFERENCE_KEY.to_string());
        let reference_key: Key = reference_name
            .parse()
            .with_context(|| format!("Invalid reference key: {:?}", reference_name))?;

        let sim_file = file.similarity.unwrap_or_default();
        let similarity = SimilaritySettings {
            default_limit: sim_file.default_limit.unwrap_or(cli.default_limit),
            max_limit: sim_file.max_limit.unwrap_or(cli.max_limit),
            min_score: sim_file.min_score.unwrap_or(cli.min_score),
            root_match_cost: sim_file.root_match_cost.unwrap_or(cli.root_match_cost),
            collapse_repeats: sim_file.collapse_repeats.unwrap_or(cli.collapse_repeats),
        };
        validate_similarity(&similarity)?;

        Ok(Self {
            db_path,
            port,
            metrics_port,
            logging_level,
            query_timeout_sec,
            key_groups,
            reference_key,
            similarity,
        })
    }
}

fn validate_similarity(settings: &SimilaritySettings) -> Result<()> {
    if settings.default_limit == 0 || settings.max_limit == 0 {
        bail!("Result limits must be greater than 0");
    }
    if settings.default_limit > settings.max_limit {
        bail!(
            "default_limit ({}) must not exceed max_limit ({})",
            settings.default_limit,
            settings.max_limit
        );
    }
    if !(0.0..=1.0).contains(&settings.root_match_cost) {
        bail!(
            "root_match_cost must be within [0, 1], got {}",
            settings.root_match_cost
        );
    }
    if !(0.0..=1.0).contains(&settings.min_score) {
        bail!("min_score must be within [0, 1], got {}", settings.min_score);
    }
    Ok(())
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
