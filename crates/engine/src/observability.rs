//! Metrics and structured event logging for the scoring service
//!
//! Metrics live in the default Prometheus registry and are registered once
//! per process; [`EngineMetrics`] is a cheap handle onto them.

use crate::models::{BatchSummary, InferenceResult, ModelChoice};
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    GaugeVec, Histogram, IntCounter, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Latency buckets in seconds
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5,
    1.0, 2.5,
];

const BATCH_SIZE_BUCKETS: &[f64] = &[
    1.0, 10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
];

static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    prediction_latency_seconds: Histogram,
    batch_latency_seconds: Histogram,
    batch_size: Histogram,
    predictions: IntCounterVec,
    flagged: IntCounter,
    validation_errors: IntCounterVec,
    model_version_info: GaugeVec,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "theft_engine_prediction_latency_seconds",
                "Time spent scoring a single record",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            batch_latency_seconds: register_histogram!(
                "theft_engine_batch_latency_seconds",
                "Time spent scoring a whole batch",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register batch_latency_seconds"),

            batch_size: register_histogram!(
                "theft_engine_batch_size",
                "Number of records per batch request",
                BATCH_SIZE_BUCKETS.to_vec()
            )
            .expect("Failed to register batch_size"),

            predictions: register_int_counter_vec!(
                "theft_engine_predictions_total",
                "Records scored, by the model that produced the probability",
                &["model"]
            )
            .expect("Failed to register predictions_total"),

            flagged: register_int_counter!(
                "theft_engine_flagged_total",
                "Records predicted as theft at the requested threshold"
            )
            .expect("Failed to register flagged_total"),

            validation_errors: register_int_counter_vec!(
                "theft_engine_validation_errors_total",
                "Records rejected before scoring, by error code",
                &["code"]
            )
            .expect("Failed to register validation_errors_total"),

            model_version_info: register_gauge_vec!(
                "theft_engine_model_version_info",
                "Information about the loaded artifact bundle",
                &["version", "model_type"]
            )
            .expect("Failed to register model_version_info"),
        }
    }
}

/// Handle to the process-wide scoring metrics.
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    /// Record a finished batch's latency and size
    pub fn observe_batch(&self, duration_secs: f64, size: usize) {
        self.inner().batch_latency_seconds.observe(duration_secs);
        self.inner().batch_size.observe(size as f64);
    }

    /// Count one scored record
    pub fn record_result(&self, result: &InferenceResult) {
        self.inner()
            .predictions
            .with_label_values(&[result.model_used.as_str()])
            .inc();
        if result.prediction {
            self.inner().flagged.inc();
        }
    }

    pub fn inc_validation_error(&self, code: &str) {
        self.inner()
            .validation_errors
            .with_label_values(&[code])
            .inc();
    }

    /// Replace the model version info series
    pub fn set_model_version(&self, version: &str, model_type: &str) {
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version, model_type])
            .set(1.0);
    }

    pub fn predictions_for(&self, model: ModelChoice) -> u64 {
        self.inner()
            .predictions
            .with_label_values(&[model.as_str()])
            .get()
    }

    pub fn flagged_count(&self) -> u64 {
        self.inner().flagged.get()
    }

    pub fn validation_errors_for(&self, code: &str) -> u64 {
        self.inner()
            .validation_errors
            .with_label_values(&[code])
            .get()
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn log_startup(&self, version: &str, port: u16) {
        info!(
            event = "service_started",
            service = %self.service,
            service_version = %version,
            port = port,
            "Theft detection service started"
        );
    }

    pub fn log_artifacts_loaded(
        &self,
        dir: &str,
        model_version: &str,
        features: usize,
        primary_enabled: bool,
    ) {
        if primary_enabled {
            info!(
                event = "artifacts_loaded",
                service = %self.service,
                dir = %dir,
                model_version = %model_version,
                features = features,
                "Artifact bundle loaded"
            );
        } else {
            warn!(
                event = "artifacts_loaded",
                service = %self.service,
                dir = %dir,
                model_version = %model_version,
                features = features,
                primary_enabled = false,
                "Artifact bundle loaded with primary model disabled, serving fallback only"
            );
        }
    }

    pub fn log_prediction(&self, result: &InferenceResult, latency_secs: f64) {
        info!(
            event = "prediction_scored",
            service = %self.service,
            customer_id = ?result.customer_id,
            probability = result.probability,
            prediction = result.prediction,
            risk_level = %result.risk_level,
            model_used = %result.model_used,
            latency_ms = latency_secs * 1000.0,
            "Scored record"
        );
    }

    pub fn log_batch(&self, summary: &BatchSummary, latency_secs: f64) {
        if summary.failed > 0 {
            warn!(
                event = "batch_scored",
                service = %self.service,
                total = summary.total,
                flagged = summary.flagged,
                failed = summary.failed,
                high_risk = summary.high_risk,
                model = %summary.model,
                threshold = summary.threshold,
                latency_ms = latency_secs * 1000.0,
                "Scored batch with rejected records"
            );
        } else {
            info!(
                event = "batch_scored",
                service = %self.service,
                total = summary.total,
                flagged = summary.flagged,
                high_risk = summary.high_risk,
                model = %summary.model,
                threshold = summary.threshold,
                latency_ms = latency_secs * 1000.0,
                "Scored batch"
            );
        }
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Theft detection service shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskLevel;
    use serde_json::json;

    fn result(model_used: ModelChoice, prediction: bool) -> InferenceResult {
        InferenceResult {
            customer_id: Some(json!("C-1")),
            probability: if prediction { 0.9 } else { 0.1 },
            prediction,
            risk_level: if prediction { RiskLevel::High } else { RiskLevel::Low },
            model_used,
        }
    }

    #[test]
    fn test_metrics_handles_share_registry() {
        let a = EngineMetrics::new();
        let b = EngineMetrics::new();

        let before = b.predictions_for(ModelChoice::Fallback);
        a.record_result(&result(ModelChoice::Fallback, false));
        assert!(b.predictions_for(ModelChoice::Fallback) >= before + 1);
    }

    #[test]
    fn test_flagged_counts_positive_predictions_only() {
        let metrics = EngineMetrics::new();
        let before = metrics.flagged_count();
        metrics.record_result(&result(ModelChoice::Primary, true));
        metrics.record_result(&result(ModelChoice::Primary, false));
        assert!(metrics.flagged_count() >= before + 1);
    }

    #[test]
    fn test_validation_errors_by_code() {
        let metrics = EngineMetrics::new();
        let before = metrics.validation_errors_for("FEATURE_MISSING_TEST");
        metrics.inc_validation_error("FEATURE_MISSING_TEST");
        assert_eq!(metrics.validation_errors_for("FEATURE_MISSING_TEST"), before + 1);
    }

    #[test]
    fn test_observations_accepted() {
        let metrics = EngineMetrics::new();
        metrics.observe_prediction_latency(0.0004);
        metrics.observe_batch(0.02, 128);
        metrics.set_model_version("fixture", "RandomForestClassifier");
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("theft-server");
        assert_eq!(logger.service(), "theft-server");
    }
}
