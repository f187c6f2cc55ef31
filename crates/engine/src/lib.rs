//! Scoring engine for electricity theft detection
//!
//! This crate provides the core functionality for:
//! - Loading and validating a trained artifact bundle
//! - Normalizing customer records against the feature spec
//! - Scoring with the primary (random forest) or fallback (logistic) model
//! - Risk banding and batch summaries
//! - Health checks and observability

pub mod artifacts;
pub mod config;
pub mod error;
pub mod health;
pub mod introspection;
pub mod models;
pub mod observability;
pub mod predictor;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use artifacts::{ArtifactBundle, ArtifactLoader};
pub use config::EngineConfig;
pub use error::{EngineError, LoadError, ValidationError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use introspection::{FeatureImportance, ModelInfo};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use predictor::PredictionEngine;
