use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub query_timeout_sec: Option<u64>,

    // Matching
    pub key_groups: Option<String>,
    pub reference_key: Option<String>,
    pub similarity: Option<SimilarityConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SimilarityConfig {
    pub default_limit: Option<usize>,
    pub max_limit: Option<usize>,
    pub min_score: Option<f64>,
    /// Cost of substituting a chord with another on the same root.
    pub root_match_cost: Option<f64>,
    pub collapse_repeats: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
