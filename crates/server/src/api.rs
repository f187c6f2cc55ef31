//! HTTP API for scoring, model introspection, health checks and metrics

use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use theft_engine::{
    health::HealthRegistry,
    observability::{EngineMetrics, StructuredLogger},
    BatchOutput, EngineError, FeatureImportance, InferenceRecord, InferenceResult, ModelChoice,
    ModelInfo, PredictionEngine, RecordOutcome,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Upper bound on request bodies; a full batch of records is several MiB
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PredictionEngine>,
    pub health_registry: HealthRegistry,
    pub metrics: EngineMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        engine: Arc<PredictionEngine>,
        health_registry: HealthRegistry,
        metrics: EngineMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            engine,
            health_registry,
            metrics,
            logger,
        }
    }
}

/// Single prediction body.
///
/// Features go under `features`, or sit flat next to `customer_id`.
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub customer_id: Option<Value>,
    #[serde(default)]
    pub features: Option<Map<String, Value>>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(flatten)]
    pub flat: Map<String, Value>,
}

impl PredictRequest {
    fn into_record(self) -> InferenceRecord {
        InferenceRecord {
            customer_id: self.customer_id,
            values: self.features.unwrap_or(self.flat),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(flatten)]
    pub result: InferenceResult,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub records: Vec<InferenceRecord>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct FeaturesQuery {
    pub top: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeaturesResponse {
    pub feature_count: usize,
    pub features: Vec<FeatureImportance>,
}

fn parse_model(model: Option<&str>) -> Result<ModelChoice, EngineError> {
    model.map_or(Ok(ModelChoice::default()), |m| m.parse())
}

/// Health check; always answers 200 with the service status in the body
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;
    (StatusCode::OK, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> ApiResult<impl IntoResponse> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

async fn model_info(State(state): State<Arc<AppState>>) -> Json<ModelInfo> {
    Json(state.engine.model_info())
}

async fn features(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FeaturesQuery>, QueryRejection>,
) -> ApiResult<Json<FeaturesResponse>> {
    let Query(query) = query?;
    Ok(Json(FeaturesResponse {
        feature_count: state.engine.bundle().feature_count(),
        features: state.engine.top_features(query.top),
    }))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<PredictResponse>> {
    let Json(body) = body?;
    let request: PredictRequest = serde_json::from_value(body)?;
    let choice = parse_model(request.model.as_deref())?;
    let threshold = request.threshold;
    let record = request.into_record();

    let start = Instant::now();
    let result = state
        .engine
        .predict_record(&record, choice, threshold)
        .map_err(|e| {
            if let EngineError::Validation(v) = &e {
                state.metrics.inc_validation_error(v.code());
            }
            e
        })?;
    let elapsed = start.elapsed().as_secs_f64();

    state.metrics.observe_prediction_latency(elapsed);
    state.metrics.record_result(&result);
    state.logger.log_prediction(&result, elapsed);

    Ok(Json(PredictResponse {
        result,
        timestamp: Utc::now(),
    }))
}

async fn predict_batch(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<BatchOutput>> {
    let Json(body) = body?;
    let request: BatchRequest = serde_json::from_value(body)?;
    let choice = parse_model(request.model.as_deref())?;
    let threshold = request.threshold;
    let records = request.records;

    let start = Instant::now();
    let engine = state.engine.clone();
    let output = tokio::task::spawn_blocking(move || {
        engine.predict_batch(&records, choice, threshold)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Batch scoring task failed: {}", e)))??;
    let elapsed = start.elapsed().as_secs_f64();

    state.metrics.observe_batch(elapsed, output.summary.total);
    for outcome in &output.records {
        match outcome {
            RecordOutcome::Scored(result) => state.metrics.record_result(result),
            RecordOutcome::Failed(failure) => state.metrics.inc_validation_error(&failure.code),
        }
    }
    state.logger.log_batch(&output.summary, elapsed);

    Ok(Json(output))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>, cors_enabled: bool) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/model_info", get(model_info))
        .route("/features", get(features))
        .route("/predict", post(predict))
        .route("/predict_batch", post(predict_batch))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if cors_enabled {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>, cors_enabled: bool) -> anyhow::Result<()> {
    let app = create_router(state, cors_enabled);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
