//! Server configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use theft_engine::config::{
    EngineConfig, DEFAULT_EXPECTED_FEATURES, DEFAULT_MAX_BATCH_SIZE, DEFAULT_PARALLEL_THRESHOLD,
    DEFAULT_THRESHOLD,
};

/// Environment variable prefix, e.g. `THEFT_API_PORT`
pub const ENV_PREFIX: &str = "THEFT";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Directory holding the artifact bundle
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    /// Port for the HTTP API
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Threshold applied when a request does not carry one
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,

    /// When false every request is scored by the fallback model
    #[serde(default = "default_true")]
    pub primary_enabled: bool,

    /// Number of features the bundle must declare; 0 accepts any count
    #[serde(default = "default_expected_features")]
    pub expected_features: usize,

    /// Batch size from which records are scored in parallel
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("models_artifacts")
}

fn default_api_port() -> u16 {
    8000
}

fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_true() -> bool {
    true
}

fn default_expected_features() -> usize {
    DEFAULT_EXPECTED_FEATURES
}

fn default_parallel_threshold() -> usize {
    DEFAULT_PARALLEL_THRESHOLD
}

impl ServerConfig {
    /// Load configuration from `THEFT_*` environment variables
    pub fn load() -> Result<Self> {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    pub fn from_environment(source: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(source.try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid THEFT_* configuration")
    }

    /// Engine settings derived from this configuration
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            artifact_dir: self.artifact_dir.clone(),
            max_batch_size: self.max_batch_size,
            default_threshold: self.default_threshold,
            expected_features: (self.expected_features > 0).then_some(self.expected_features),
            primary_enabled: self.primary_enabled,
            parallel_threshold: self.parallel_threshold,
        }
    }
}
