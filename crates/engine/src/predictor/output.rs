//! Risk banding and result assembly
//!
//! The risk level depends on the probability alone. The boolean prediction
//! depends on the caller's threshold. The two are reported side by side and
//! may disagree near the band edges.

use crate::models::{InferenceResult, ModelChoice, RiskLevel};
use serde_json::Value;

/// Lowest probability classified as Medium
pub const MEDIUM_RISK_FLOOR: f64 = 0.3;

/// Lowest probability classified as High
pub const HIGH_RISK_FLOOR: f64 = 0.7;

/// Map a probability onto the fixed Low/Medium/High bands.
///
/// Each band includes its lower bound: 0.3 is Medium and 0.7 is High.
pub fn classify(probability: f64) -> RiskLevel {
    if probability >= HIGH_RISK_FLOOR {
        RiskLevel::High
    } else if probability >= MEDIUM_RISK_FLOOR {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Assemble the per-record result from a model score
pub fn build_result(
    customer_id: Option<Value>,
    probability: f64,
    threshold: f64,
    model_used: ModelChoice,
) -> InferenceResult {
    InferenceResult {
        customer_id,
        probability,
        prediction: probability >= threshold,
        risk_level: classify(probability),
        model_used,
    }
}
