//! Integration tests for the scoring API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use theft_engine::{
    config::EngineConfig,
    health::{components, HealthRegistry},
    observability::{EngineMetrics, StructuredLogger},
    testing, PredictionEngine,
};
use theft_server::{api::AppState, create_router, ServerConfig};
use tower::ServiceExt;

async fn setup_app_with(config: EngineConfig) -> (Router, Arc<AppState>) {
    let engine = PredictionEngine::new(testing::fixture_bundle(), config);

    let health_registry = HealthRegistry::new("test");
    health_registry.register(components::ARTIFACTS).await;
    health_registry.register(components::ENGINE).await;
    health_registry
        .set_model_loaded(engine.bundle().version())
        .await;

    let state = Arc::new(AppState::new(
        Arc::new(engine),
        health_registry,
        EngineMetrics::new(),
        StructuredLogger::new("test"),
    ));
    let router = create_router(state.clone(), false);

    (router, state)
}

async fn setup_test_app() -> (Router, Arc<AppState>) {
    setup_app_with(EngineConfig::default()).await
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read_json(response).await
}

async fn post_raw(app: Router, uri: &str, body: String) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    read_json(response).await
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_raw(app, uri, body.to_string()).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

/// Flat record with both theft indicators set
fn flagged_record(customer_id: &str) -> Value {
    let record = testing::baseline_record(customer_id)
        .with("tamper_indicator", 1)
        .with("interior_equipment_status", 1);
    serde_json::to_value(record).unwrap()
}

fn baseline_record(customer_id: &str) -> Value {
    serde_json::to_value(testing::baseline_record(customer_id)).unwrap()
}

fn nested(record: Value) -> Value {
    let mut features = record.as_object().unwrap().clone();
    let customer_id = features.remove("customer_id").unwrap_or(Value::Null);
    json!({ "customer_id": customer_id, "features": features })
}

#[tokio::test]
async fn test_health_reports_loaded_model() {
    let (app, _state) = setup_test_app().await;

    let (status, health) = get(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["version"], "test");
    assert_eq!(health["model_loaded"], true);
    assert_eq!(health["model_version"], testing::FIXTURE_VERSION);
    assert!(health["timestamp"].is_string());
    assert!(health["components"]["artifacts"].is_object());
    assert!(health["components"]["engine"].is_object());
}

#[tokio::test]
async fn test_health_is_ok_even_when_unhealthy() {
    let (app, state) = setup_test_app().await;

    state
        .health_registry
        .set_unhealthy(components::ENGINE, "Scoring failures")
        .await;

    let (status, health) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_returns_503_until_ready() {
    let (app, state) = setup_test_app().await;

    let (status, readiness) = get(app.clone(), "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);

    state.health_registry.set_ready(true).await;

    let (status, readiness) = get(app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, state) = setup_test_app().await;

    state
        .metrics
        .set_model_version(testing::FIXTURE_VERSION, "RandomForestClassifier");
    let (status, _) = post(app.clone(), "/predict", flagged_record("C-M")).await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("theft_engine_prediction_latency_seconds_bucket"));
    assert!(metrics_text.contains("theft_engine_predictions_total"));
    assert!(metrics_text.contains("theft_engine_flagged_total"));
    assert!(metrics_text.contains("theft_engine_model_version_info"));
}

#[tokio::test]
async fn test_model_info() {
    let (app, _state) = setup_test_app().await;

    let (status, info) = get(app, "/model_info").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["model_type"], "RandomForestClassifier");
    assert_eq!(info["fallback_model_type"], "LogisticRegression");
    assert_eq!(info["features_count"], 14);
    assert_eq!(info["n_trees"], 3);
    assert_eq!(info["version"], testing::FIXTURE_VERSION);
    assert_eq!(info["training_metrics"]["primary"]["roc_auc"], 0.94);
    assert_eq!(info["training_metrics"]["fallback"]["f1_score"], 0.69);
}

#[tokio::test]
async fn test_features_top_n() {
    let (app, _state) = setup_test_app().await;

    let (status, body) = get(app, "/features?top=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["feature_count"], 14);
    let features = body["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);
    assert_eq!(features[0]["name"], "tamper_indicator");
    assert_eq!(features[0]["data_type"], "binary");
    assert_eq!(features[0]["importance_percent"], 18.0);
    assert_eq!(features[1]["name"], "interior_equipment_status");
}

#[tokio::test]
async fn test_features_without_top_lists_all() {
    let (app, _state) = setup_test_app().await;

    let (_, body) = get(app.clone(), "/features").await;
    assert_eq!(body["features"].as_array().unwrap().len(), 14);

    let (_, body) = get(app, "/features?top=100").await;
    assert_eq!(body["features"].as_array().unwrap().len(), 14);
}

#[tokio::test]
async fn test_features_rejects_bad_query() {
    let (app, _state) = setup_test_app().await;

    let (status, body) = get(app, "/features?top=lots").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MALFORMED_REQUEST");
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_predict_flags_tampered_meter() {
    let (app, _state) = setup_test_app().await;

    let mut body = nested(flagged_record("C-001"));
    body["threshold"] = json!(0.5);
    let (status, result) = post(app, "/predict", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["customer_id"], "C-001");
    assert_eq!(result["prediction"], true);
    assert_eq!(result["risk_level"], "High");
    assert_eq!(result["model_used"], "primary");
    assert!((result["probability"].as_f64().unwrap() - 0.85).abs() < 1e-9);
    assert!(result["timestamp"].is_string());
}

#[tokio::test]
async fn test_predict_accepts_flat_features() {
    let (app, _state) = setup_test_app().await;

    let (status, result) = post(app, "/predict", baseline_record("C-002")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["customer_id"], "C-002");
    assert_eq!(result["prediction"], false);
    assert_eq!(result["risk_level"], "Low");
}

#[tokio::test]
async fn test_predict_is_deterministic() {
    let (app, _state) = setup_test_app().await;

    let (_, first) = post(app.clone(), "/predict", flagged_record("C-003")).await;
    let (_, second) = post(app, "/predict", flagged_record("C-003")).await;

    assert_eq!(first["probability"], second["probability"]);
}

#[tokio::test]
async fn test_predict_with_fallback_alias() {
    let (app, _state) = setup_test_app().await;

    let mut body = flagged_record("C-004");
    body["model"] = json!("logistic_regression");
    let (status, result) = post(app, "/predict", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["model_used"], "fallback");
    assert_eq!(result["risk_level"], "High");
}

#[tokio::test]
async fn test_predict_uses_fallback_when_primary_disabled() {
    let config = EngineConfig {
        primary_enabled: false,
        ..Default::default()
    };
    let (app, _state) = setup_app_with(config).await;

    let (status, result) = post(app, "/predict", baseline_record("C-005")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["model_used"], "fallback");
}

#[tokio::test]
async fn test_predict_missing_feature_is_422() {
    let (app, _state) = setup_test_app().await;

    let mut body = baseline_record("C-006");
    body.as_object_mut().unwrap().remove("neutral_current");
    let (status, error) = post(app, "/predict", body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["code"], "FEATURE_MISSING");
    assert_eq!(error["status"], 422);
    assert!(error["error"].as_str().unwrap().contains("neutral_current"));
}

#[tokio::test]
async fn test_predict_type_mismatch_is_422() {
    let (app, _state) = setup_test_app().await;

    let mut body = baseline_record("C-007");
    body["tamper_indicator"] = json!("yes");
    let (status, error) = post(app, "/predict", body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["code"], "TYPE_MISMATCH");
}

#[tokio::test]
async fn test_predict_overflowing_value_is_422() {
    let (app, _state) = setup_test_app().await;

    let mut body = baseline_record("C-X");
    body["bill_pay_rate"] = json!(1e308);
    body["non_technical_losses"] = json!(1e308);
    body["model"] = json!("fallback");
    let (status, error) = post(app, "/predict", body).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["code"], "OUT_OF_RANGE");
    assert!(error["error"].as_str().unwrap().contains("bill_pay_rate"));
}

#[tokio::test]
async fn test_predict_unknown_model_is_400() {
    let (app, _state) = setup_test_app().await;

    let mut body = baseline_record("C-008");
    body["model"] = json!("xgboost");
    let (status, error) = post(app, "/predict", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "UNKNOWN_MODEL");
}

#[tokio::test]
async fn test_predict_invalid_threshold_is_400() {
    let (app, _state) = setup_test_app().await;

    let mut body = baseline_record("C-009");
    body["threshold"] = json!(1.5);
    let (status, error) = post(app, "/predict", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "INVALID_THRESHOLD");
}

#[tokio::test]
async fn test_predict_malformed_body_is_400() {
    let (app, _state) = setup_test_app().await;

    let (status, error) = post_raw(app, "/predict", "{\"customer_id\": ".to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "MALFORMED_REQUEST");
}

#[tokio::test]
async fn test_batch_isolates_failed_record() {
    let (app, _state) = setup_test_app().await;

    let mut broken = baseline_record("C-B2");
    broken.as_object_mut().unwrap().remove("tamper_indicator");
    let body = json!({
        "records": [flagged_record("C-B1"), broken, baseline_record("C-B3")],
        "threshold": 0.5
    });
    let (status, output) = post(app, "/predict_batch", body).await;

    assert_eq!(status, StatusCode::OK);
    let records = output["records"].as_array().unwrap();
    assert_eq!(records.len(), 3);

    assert_eq!(records[0]["customer_id"], "C-B1");
    assert_eq!(records[0]["prediction"], true);

    assert_eq!(records[1]["customer_id"], "C-B2");
    assert_eq!(records[1]["code"], "FEATURE_MISSING");
    assert_eq!(records[1]["feature"], "tamper_indicator");

    assert_eq!(records[2]["customer_id"], "C-B3");
    assert_eq!(records[2]["risk_level"], "Low");

    let summary = &output["summary"];
    assert_eq!(summary["total"], 3);
    assert_eq!(summary["flagged"], 1);
    assert_eq!(summary["failed"], 1);
    assert_eq!(summary["high_risk"], 1);
    assert_eq!(summary["model"], "primary");
    assert!(summary["completed_at"].is_string());
}

#[tokio::test]
async fn test_batch_over_ceiling_is_400() {
    let config = EngineConfig {
        max_batch_size: 2,
        ..Default::default()
    };
    let (app, _state) = setup_app_with(config).await;

    let body = json!({
        "records": [baseline_record("A"), baseline_record("B"), baseline_record("C")]
    });
    let (status, error) = post(app, "/predict_batch", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "BATCH_TOO_LARGE");
}

#[tokio::test]
async fn test_empty_batch() {
    let (app, _state) = setup_test_app().await;

    let (status, output) = post(app, "/predict_batch", json!({ "records": [] })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(output["records"].as_array().unwrap().len(), 0);
    assert_eq!(output["summary"]["total"], 0);
    assert!(output["summary"].get("mean_probability").is_none());
}

#[tokio::test]
async fn test_batch_without_records_field_is_400() {
    let (app, _state) = setup_test_app().await;

    let (status, error) = post(app, "/predict_batch", json!({ "rows": [] })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["code"], "MALFORMED_REQUEST");
}

#[tokio::test]
async fn test_engine_loads_from_configured_directory() {
    let dir = testing::fixture_artifact_dir().unwrap();
    let mut vars = HashMap::new();
    vars.insert(
        "THEFT_ARTIFACT_DIR".to_string(),
        dir.path().display().to_string(),
    );
    let config = ServerConfig::from_environment(
        config::Environment::with_prefix("THEFT").source(Some(vars)),
    )
    .unwrap();

    let engine = PredictionEngine::load(config.engine_config()).unwrap();
    assert_eq!(engine.bundle().version(), testing::FIXTURE_VERSION);
}
