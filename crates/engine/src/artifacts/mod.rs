//! Artifact bundle produced by the offline training job
//!
//! The bundle is assembled once, checked for internal consistency and then
//! only ever read. Nothing in the engine mutates it after load.

mod loader;
mod manifest;

pub use loader::ArtifactLoader;
pub use manifest::{compute_checksum, Manifest};

use crate::error::LoadError;
use crate::models::{FeatureSpec, TrainingMetrics};
use crate::predictor::{Classifier, LogisticRegression, RandomForest};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const SCALER_FILE: &str = "scaler.json";
pub const PRIMARY_MODEL_FILE: &str = "random_forest.json";
pub const FALLBACK_MODEL_FILE: &str = "logistic_regression.json";
pub const FEATURES_FILE: &str = "features.json";
pub const METRICS_FILE: &str = "metrics.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Files that must exist for a bundle to load
pub const REQUIRED_FILES: [&str; 5] = [
    SCALER_FILE,
    PRIMARY_MODEL_FILE,
    FALLBACK_MODEL_FILE,
    FEATURES_FILE,
    METRICS_FILE,
];

/// Version reported for bundles shipped without a manifest
pub const UNVERSIONED: &str = "unversioned";

/// Wire form of `scaler.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerArtifact {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Per-feature standardization parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Scaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl Scaler {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, String> {
        if mean.len() != scale.len() {
            return Err(format!(
                "mean has {} entries but scale has {}",
                mean.len(),
                scale.len()
            ));
        }
        if let Some(i) = mean.iter().position(|m| !m.is_finite()) {
            return Err(format!("mean[{}] is not finite", i));
        }
        if let Some(i) = scale.iter().position(|s| !s.is_finite() || *s == 0.0) {
            return Err(format!("scale[{}] must be finite and non-zero", i));
        }
        Ok(Self { mean, scale })
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// `(x - mean_i) / scale_i` component-wise
    pub fn transform(&self, raw: &[f64]) -> Vec<f64> {
        raw.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }

    /// `x * scale_i + mean_i` component-wise
    pub fn inverse_transform(&self, scaled: &[f64]) -> Vec<f64> {
        scaled
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| x * s + m)
            .collect()
    }
}

impl TryFrom<ScalerArtifact> for Scaler {
    type Error = String;

    fn try_from(artifact: ScalerArtifact) -> Result<Self, Self::Error> {
        Self::new(artifact.mean, artifact.scale)
    }
}

/// Deserialized pieces of a bundle before the cross-artifact checks
#[derive(Debug, Clone)]
pub struct BundleParts {
    pub version: String,
    pub primary: RandomForest,
    pub fallback: LogisticRegression,
    pub scaler: Scaler,
    pub features: Vec<FeatureSpec>,
    pub metrics: TrainingMetrics,
}

/// Immutable, internally consistent set of models and metadata
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    version: String,
    primary: RandomForest,
    fallback: LogisticRegression,
    scaler: Scaler,
    features: Vec<FeatureSpec>,
    metrics: TrainingMetrics,
}

impl ArtifactBundle {
    /// Check that every artifact agrees on the feature layout.
    ///
    /// `expected_features` pins the feature count; `None` accepts whatever
    /// the feature spec declares.
    pub fn assemble(parts: BundleParts, expected_features: Option<usize>) -> Result<Self, LoadError> {
        let n = parts.features.len();
        if n == 0 {
            return Err(LoadError::mismatch("feature spec declares no features"));
        }
        if let Some(expected) = expected_features {
            if n != expected {
                return Err(LoadError::mismatch(format!(
                    "feature spec declares {} features, expected {}",
                    n, expected
                )));
            }
        }

        let mut seen = HashSet::with_capacity(n);
        if let Some(dup) = parts.features.iter().find(|f| !seen.insert(f.name.as_str())) {
            return Err(LoadError::mismatch(format!(
                "feature '{}' is declared more than once",
                dup.name
            )));
        }

        let dims = [
            ("scaler", parts.scaler.len()),
            ("primary model", parts.primary.n_features()),
            ("fallback model", parts.fallback.n_features()),
        ];
        for (what, got) in dims {
            if got != n {
                return Err(LoadError::mismatch(format!(
                    "{} was fit on {} features but the feature spec declares {}",
                    what, got, n
                )));
            }
        }

        Ok(Self {
            version: parts.version,
            primary: parts.primary,
            fallback: parts.fallback,
            scaler: parts.scaler,
            features: parts.features,
            metrics: parts.metrics,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn primary(&self) -> &RandomForest {
        &self.primary
    }

    pub fn fallback(&self) -> &LogisticRegression {
        &self.fallback
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }
}
