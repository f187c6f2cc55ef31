//! Theft Server - electricity theft scoring service
//!
//! Loads one artifact bundle at startup and serves single and batch
//! predictions over HTTP until interrupted.

use anyhow::{Context, Result};
use std::sync::Arc;
use theft_engine::{
    health::{components, HealthRegistry},
    observability::{EngineMetrics, StructuredLogger},
    predictor::Classifier,
    PredictionEngine,
};
use theft_server::{api, ServerConfig};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_NAME: &str = "theft-server";
const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting theft-server");

    let config = ServerConfig::load()?;
    info!(
        artifact_dir = %config.artifact_dir.display(),
        port = config.api_port,
        primary_enabled = config.primary_enabled,
        "Server configured"
    );

    let health_registry = HealthRegistry::new(SERVICE_VERSION);
    health_registry.register(components::ARTIFACTS).await;
    health_registry.register(components::ENGINE).await;

    let metrics = EngineMetrics::new();
    let logger = StructuredLogger::new(SERVICE_NAME);

    let engine = match PredictionEngine::load(config.engine_config()) {
        Ok(engine) => engine,
        Err(e) => {
            error!(
                code = e.code(),
                error = %e,
                dir = %config.artifact_dir.display(),
                "Failed to load artifact bundle"
            );
            return Err(e).with_context(|| {
                format!(
                    "cannot start without a valid bundle in {}",
                    config.artifact_dir.display()
                )
            });
        }
    };

    let bundle = engine.bundle();
    health_registry.set_model_loaded(bundle.version()).await;
    metrics.set_model_version(bundle.version(), bundle.primary().model_type());
    logger.log_artifacts_loaded(
        &config.artifact_dir.display().to_string(),
        bundle.version(),
        bundle.feature_count(),
        config.primary_enabled,
    );
    if !config.primary_enabled {
        health_registry
            .set_degraded(components::ENGINE, "Primary model disabled, serving fallback")
            .await;
    }

    let app_state = Arc::new(api::AppState::new(
        Arc::new(engine),
        health_registry.clone(),
        metrics,
        logger.clone(),
    ));

    health_registry.set_ready(true).await;
    logger.log_startup(SERVICE_VERSION, config.api_port);

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state, config.cors_enabled));

    tokio::select! {
        result = api_handle => {
            result.context("API server task panicked")??;
            logger.log_shutdown("API server stopped");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            health_registry.set_ready(false).await;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
