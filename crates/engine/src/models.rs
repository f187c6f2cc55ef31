//! Core data models for the scoring engine

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Key under which a record carries its opaque customer identifier
pub const CUSTOMER_ID_KEY: &str = "customer_id";

/// Declared type of one model input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    Float,
    Integer,
    Binary,
}

impl FeatureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Float => "float",
            FeatureType::Integer => "integer",
            FeatureType::Binary => "binary",
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of `features.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub expected_type: FeatureType,
    #[serde(rename = "importance")]
    pub importance_weight: f64,
}

/// Metrics captured for one model at training time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub roc_auc: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

/// Training metrics for both shipped models, reported verbatim
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub primary: ModelMetrics,
    pub fallback: ModelMetrics,
}

/// Which classifier scores a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelChoice {
    #[default]
    Primary,
    Fallback,
}

impl ModelChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelChoice::Primary => "primary",
            ModelChoice::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelChoice {
    type Err = EngineError;

    /// Accepts the role names and the algorithm names the models ship under
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" | "random_forest" => Ok(ModelChoice::Primary),
            "fallback" | "logistic_regression" => Ok(ModelChoice::Fallback),
            _ => Err(EngineError::UnknownModel(s.to_string())),
        }
    }
}

/// Severity band derived from a probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One incoming record: named feature values plus an opaque customer id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Value>,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl InferenceRecord {
    pub fn new(customer_id: impl Into<Value>) -> Self {
        Self {
            customer_id: Some(customer_id.into()),
            values: Map::new(),
        }
    }

    /// Builder-style setter for one feature value
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Split a flat JSON object into the customer id and the remaining values
    pub fn from_object(mut values: Map<String, Value>) -> Self {
        let customer_id = values.remove(CUSTOMER_ID_KEY);
        Self {
            customer_id,
            values,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

/// Scored record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub customer_id: Option<Value>,
    pub probability: f64,
    pub prediction: bool,
    pub risk_level: RiskLevel,
    pub model_used: ModelChoice,
}

/// Per-record batch outcome: a scored result or the reason it was not scored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordOutcome {
    Scored(InferenceResult),
    Failed(RecordFailure),
}

impl RecordOutcome {
    pub fn is_scored(&self) -> bool {
        matches!(self, RecordOutcome::Scored(_))
    }

    pub fn result(&self) -> Option<&InferenceResult> {
        match self {
            RecordOutcome::Scored(r) => Some(r),
            RecordOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&RecordFailure> {
        match self {
            RecordOutcome::Scored(_) => None,
            RecordOutcome::Failed(f) => Some(f),
        }
    }
}

/// Error entry attached to a batch record that could not be scored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordFailure {
    pub customer_id: Option<Value>,
    pub error: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
}

impl RecordFailure {
    pub fn new(customer_id: Option<Value>, err: &EngineError) -> Self {
        Self {
            customer_id,
            error: err.to_string(),
            code: err.code().to_string(),
            feature: err.feature().map(str::to_string),
        }
    }
}

/// Aggregate counts for one batch call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub flagged: usize,
    pub failed: usize,
    pub high_risk: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_probability: Option<f64>,
    pub model: ModelChoice,
    pub threshold: f64,
    pub completed_at: DateTime<Utc>,
}

/// Ordered per-record outcomes plus the summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutput {
    pub records: Vec<RecordOutcome>,
    pub summary: BatchSummary,
}
