//! Read-only views of the loaded bundle: model metadata and feature ranking

use crate::artifacts::ArtifactBundle;
use crate::models::{FeatureType, TrainingMetrics};
use crate::predictor::Classifier;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Model metadata reported by the model info endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub fallback_model_type: String,
    pub features_count: usize,
    pub training_metrics: TrainingMetrics,
    pub version: String,
    pub n_trees: usize,
    pub features: Vec<String>,
}

/// One row of the feature ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub name: String,
    pub importance: f64,
    /// Share of the total importance weight, rounded to two decimals
    pub importance_percent: f64,
    pub data_type: FeatureType,
}

pub fn model_info(bundle: &ArtifactBundle) -> ModelInfo {
    ModelInfo {
        model_type: bundle.primary().model_type().to_string(),
        fallback_model_type: bundle.fallback().model_type().to_string(),
        features_count: bundle.feature_count(),
        training_metrics: *bundle.metrics(),
        version: bundle.version().to_string(),
        n_trees: bundle.primary().n_trees(),
        features: bundle.features().iter().map(|f| f.name.clone()).collect(),
    }
}

/// Features sorted by importance, highest first.
///
/// Ties keep feature-spec order. `n` larger than the feature count, or
/// `None`, returns every feature.
pub fn top_features(bundle: &ArtifactBundle, n: Option<usize>) -> Vec<FeatureImportance> {
    let total: f64 = bundle.features().iter().map(|f| f.importance_weight).sum();

    let mut ranked: Vec<FeatureImportance> = bundle
        .features()
        .iter()
        .map(|f| FeatureImportance {
            name: f.name.clone(),
            importance: f.importance_weight,
            importance_percent: if total > 0.0 {
                (f.importance_weight / total * 10_000.0).round() / 100.0
            } else {
                0.0
            },
            data_type: f.expected_type,
        })
        .collect();

    // Vec::sort_by is stable
    ranked.sort_by(|a, b| {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(n.unwrap_or(ranked.len()));
    ranked
}
