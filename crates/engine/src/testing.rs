//! Fixture bundle for tests
//!
//! A small but complete bundle over the 14 shipped feature names. The forest
//! splits on the tamper indicator, the interior equipment status and the
//! bill payment rate, so a record with both indicators set is flagged while a
//! record sitting on the training means with clean indicators is Low risk.

use crate::artifacts::{
    compute_checksum, ArtifactBundle, BundleParts, Manifest, Scaler, ScalerArtifact,
    FALLBACK_MODEL_FILE, FEATURES_FILE, MANIFEST_FILE, METRICS_FILE, PRIMARY_MODEL_FILE,
    SCALER_FILE,
};
use crate::config::EngineConfig;
use crate::models::{FeatureSpec, FeatureType, InferenceRecord, ModelMetrics, TrainingMetrics};
use crate::predictor::{
    DecisionTree, LogisticRegression, PredictionEngine, RandomForest, RandomForestArtifact,
    TreeNode,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use tempfile::TempDir;

pub const FIXTURE_VERSION: &str = "fixture-2026.02";

/// (name, type, importance, mean, scale, fallback coefficient)
const FEATURES: [(&str, FeatureType, f64, f64, f64, f64); 14] = [
    ("monthly_kwh_consumption", FeatureType::Float, 0.12, 350.0, 120.0, -0.3),
    ("bill_pay_rate", FeatureType::Float, 0.10, 0.85, 0.15, -0.6),
    ("days_since_meter_installation", FeatureType::Integer, 0.03, 900.0, 400.0, 0.05),
    ("final_spread_value", FeatureType::Float, 0.04, 0.0, 1.0, 0.1),
    ("interior_equipment_status", FeatureType::Binary, 0.14, 0.5, 0.5, 1.2),
    ("interior_lights_status", FeatureType::Binary, 0.05, 0.5, 0.5, 0.3),
    ("tamper_indicator", FeatureType::Binary, 0.18, 0.5, 0.5, 1.5),
    ("reactive_power_import", FeatureType::Float, 0.06, 40.0, 15.0, 0.2),
    ("reactive_power_export", FeatureType::Float, 0.04, 10.0, 5.0, 0.2),
    ("neutral_current", FeatureType::Float, 0.07, 2.0, 1.0, 0.4),
    ("peak_voltage_deviation", FeatureType::Float, 0.05, 5.0, 2.0, 0.3),
    ("non_technical_losses", FeatureType::Float, 0.08, 0.08, 0.05, 0.8),
    ("phase_imbalance_percentage", FeatureType::Float, 0.04, 7.5, 3.0, 0.25),
    ("reserved_slot", FeatureType::Float, 0.0, 0.0, 1.0, 0.0),
];

const FALLBACK_INTERCEPT: f64 = 1.0;

/// Feature names in vector order
pub fn feature_names() -> Vec<&'static str> {
    FEATURES.iter().map(|f| f.0).collect()
}

pub fn fixture_features() -> Vec<FeatureSpec> {
    FEATURES
        .iter()
        .map(|(name, ty, importance, ..)| FeatureSpec {
            name: name.to_string(),
            expected_type: *ty,
            importance_weight: *importance,
        })
        .collect()
}

pub fn fixture_scaler() -> ScalerArtifact {
    ScalerArtifact {
        mean: FEATURES.iter().map(|f| f.3).collect(),
        scale: FEATURES.iter().map(|f| f.4).collect(),
    }
}

fn split(feature: usize, threshold: f64, left: usize, right: usize) -> TreeNode {
    TreeNode::Split {
        feature,
        threshold,
        left,
        right,
    }
}

fn leaf(value: f64) -> TreeNode {
    TreeNode::Leaf { value }
}

pub fn fixture_forest() -> RandomForestArtifact {
    let trees = vec![
        // tamper_indicator
        DecisionTree {
            nodes: vec![split(6, 0.0, 1, 2), leaf(0.1), leaf(0.9)],
        },
        // interior_equipment_status
        DecisionTree {
            nodes: vec![split(4, 0.0, 1, 2), leaf(0.15), leaf(0.85)],
        },
        // tamper_indicator, then bill_pay_rate far below the mean
        DecisionTree {
            nodes: vec![
                split(6, 0.0, 1, 4),
                split(1, -1.0, 2, 3),
                leaf(0.7),
                leaf(0.05),
                leaf(0.8),
            ],
        },
    ];
    RandomForestArtifact {
        n_features: FEATURES.len(),
        trees,
    }
}

pub fn fixture_logistic() -> LogisticRegression {
    LogisticRegression {
        coefficients: FEATURES.iter().map(|f| f.5).collect(),
        intercept: FALLBACK_INTERCEPT,
    }
}

pub fn fixture_metrics() -> TrainingMetrics {
    TrainingMetrics {
        primary: ModelMetrics {
            roc_auc: 0.94,
            precision: 0.81,
            recall: 0.77,
            f1_score: 0.79,
        },
        fallback: ModelMetrics {
            roc_auc: 0.86,
            precision: 0.68,
            recall: 0.71,
            f1_score: 0.69,
        },
    }
}

pub fn fixture_parts() -> BundleParts {
    let forest = fixture_forest();
    let scaler = fixture_scaler();
    BundleParts {
        version: FIXTURE_VERSION.to_string(),
        primary: RandomForest::new(forest.n_features, forest.trees)
            .expect("fixture forest is valid"),
        fallback: fixture_logistic(),
        scaler: Scaler::new(scaler.mean, scaler.scale).expect("fixture scaler is valid"),
        features: fixture_features(),
        metrics: fixture_metrics(),
    }
}

pub fn fixture_bundle() -> ArtifactBundle {
    ArtifactBundle::assemble(fixture_parts(), Some(FEATURES.len())).expect("fixture bundle is consistent")
}

/// Engine over the fixture bundle with default configuration
pub fn fixture_engine() -> PredictionEngine {
    PredictionEngine::new(fixture_bundle(), EngineConfig::default())
}

/// Record sitting on the training means with every indicator clear
pub fn baseline_record(customer_id: impl Into<Value>) -> InferenceRecord {
    let mut record = InferenceRecord::new(customer_id);
    for (name, ty, _, mean, ..) in FEATURES {
        let value = match ty {
            FeatureType::Binary => json!(0),
            FeatureType::Integer => json!(mean as i64),
            FeatureType::Float => json!(mean),
        };
        record.values.insert(name.to_string(), value);
    }
    record
}

/// Write the fixture bundle, with a checksummed manifest, into `dir`
pub fn write_fixture_artifacts(dir: &Path) -> io::Result<()> {
    let documents: [(&str, Vec<u8>); 5] = [
        (SCALER_FILE, serde_json::to_vec_pretty(&fixture_scaler())?),
        (PRIMARY_MODEL_FILE, serde_json::to_vec_pretty(&fixture_forest())?),
        (FALLBACK_MODEL_FILE, serde_json::to_vec_pretty(&fixture_logistic())?),
        (FEATURES_FILE, serde_json::to_vec_pretty(&fixture_features())?),
        (METRICS_FILE, serde_json::to_vec_pretty(&fixture_metrics())?),
    ];

    let mut checksums = BTreeMap::new();
    for (file, bytes) in &documents {
        std::fs::write(dir.join(file), bytes)?;
        checksums.insert(file.to_string(), compute_checksum(bytes));
    }

    let manifest = Manifest {
        version: FIXTURE_VERSION.to_string(),
        created_at: Some("2026-02-21T00:00:00Z".to_string()),
        checksums,
    };
    std::fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(&manifest)?)
}

/// Temporary directory holding the fixture bundle
pub fn fixture_artifact_dir() -> io::Result<TempDir> {
    let dir = TempDir::new()?;
    write_fixture_artifacts(dir.path())?;
    Ok(dir)
}
