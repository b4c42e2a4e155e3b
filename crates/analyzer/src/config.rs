//! Analyzer service configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Service configuration, read from `ANALYZER_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    /// Cluster name attached to every structured log event
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Snapshot loaded into the record store at startup
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    /// Write the record store back to `snapshot_path` on shutdown
    #[serde(default)]
    pub export_on_shutdown: bool,

    /// Seconds between staleness checks of the recompute loop
    #[serde(default = "default_recompute_interval")]
    pub recompute_interval_secs: u64,

    /// Default minimum chain length for displacement reports
    #[serde(default = "default_min_chain_length")]
    pub min_chain_length: usize,

    /// Largest accepted request body; snapshot imports grow with the store
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_cluster_name() -> String {
    std::env::var("CLUSTER_NAME").unwrap_or_else(|_| "default".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_recompute_interval() -> u64 {
    30
}

fn default_min_chain_length() -> usize {
    1
}

fn default_max_body_bytes() -> usize {
    64 * 1024 * 1024
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            cluster_name: default_cluster_name(),
            api_port: default_api_port(),
            snapshot_path: None,
            export_on_shutdown: false,
            recompute_interval_secs: default_recompute_interval(),
            min_chain_length: default_min_chain_length(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("ANALYZER"))
            .build()
            .context("Failed to read analyzer configuration")?;

        config
            .try_deserialize()
            .context("Invalid analyzer configuration")
    }

    pub fn recompute_interval(&self) -> Duration {
        Duration::from_secs(self.recompute_interval_secs.max(1))
    }
}
