//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Maximum number of records accepted in one batch call
pub const DEFAULT_MAX_BATCH_SIZE: usize = 10_000;

/// Probability cutoff used for the boolean prediction when none is supplied
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Number of inputs the shipped feature spec declares
pub const DEFAULT_EXPECTED_FEATURES: usize = 14;

/// Batches at least this large are scored on the rayon pool
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 256;

/// Settings that shape loading and scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding the artifact bundle
    pub artifact_dir: PathBuf,
    /// Batch ceiling
    pub max_batch_size: usize,
    /// Threshold applied when the caller omits one
    pub default_threshold: f64,
    /// Feature count the loader insists on; `None` accepts whatever the bundle declares
    pub expected_features: Option<usize>,
    /// When false, primary requests are served by the fallback model
    pub primary_enabled: bool,
    /// Minimum batch size scored in parallel
    pub parallel_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("models_artifacts"),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            default_threshold: DEFAULT_THRESHOLD,
            expected_features: Some(DEFAULT_EXPECTED_FEATURES),
            primary_enabled: true,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl EngineConfig {
    pub fn with_artifact_dir(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
            ..Default::default()
        }
    }
}
