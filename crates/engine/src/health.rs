//! Health and readiness reporting for the scoring service
//!
//! The health report never fails: it always answers with a status, the
//! current time and the service version, plus whether a bundle is loaded.
//! Readiness gates traffic until the bundle is in memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Serving, but not as configured (e.g. primary model disabled)
    Degraded,
    Unhealthy,
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Body of the health endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Worst status among the components; no components means healthy
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|c| c.status)
            .max_by_key(|s| match s {
                ComponentStatus::Healthy => 0,
                ComponentStatus::Degraded => 1,
                ComponentStatus::Unhealthy => 2,
            })
            .unwrap_or(ComponentStatus::Healthy)
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const ARTIFACTS: &str = "artifacts";
    pub const ENGINE: &str = "engine";
}

/// Shared registry of component health and the loaded bundle version
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    service_version: String,
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    model_version: Arc<RwLock<Option<String>>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new(service_version: impl Into<String>) -> Self {
        Self {
            service_version: service_version.into(),
            components: Arc::new(RwLock::new(HashMap::new())),
            model_version: Arc::new(RwLock::new(None)),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components
            .write()
            .await
            .insert(name.to_string(), health);
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Record the version of the bundle now serving traffic
    pub async fn set_model_loaded(&self, version: impl Into<String>) {
        *self.model_version.write().await = Some(version.into());
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let model_version = self.model_version.read().await.clone();
        HealthResponse {
            status: HealthResponse::compute_status(&components),
            timestamp: Utc::now(),
            version: self.service_version.clone(),
            model_loaded: model_version.is_some(),
            model_version,
            components,
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;

        let reason = if !ready {
            Some("Service not yet initialized")
        } else if !health.model_loaded {
            Some("No artifact bundle loaded")
        } else if health.status == ComponentStatus::Unhealthy {
            Some("Critical component unhealthy")
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason: reason.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_health_reports_no_model() {
        let registry = HealthRegistry::new("1.0.0");
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert_eq!(health.version, "1.0.0");
        assert!(!health.model_loaded);
        assert!(health.model_version.is_none());
    }

    #[tokio::test]
    async fn test_model_loaded_reported() {
        let registry = HealthRegistry::new("1.0.0");
        registry.set_model_loaded("2026.02").await;

        let health = registry.health().await;
        assert!(health.model_loaded);
        assert_eq!(health.model_version.as_deref(), Some("2026.02"));
    }

    #[tokio::test]
    async fn test_worst_component_wins() {
        let registry = HealthRegistry::new("1.0.0");
        registry.register(components::ARTIFACTS).await;
        registry.register(components::ENGINE).await;

        registry
            .set_degraded(components::ENGINE, "Primary model disabled")
            .await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);

        registry
            .set_unhealthy(components::ARTIFACTS, "Bundle unreadable")
            .await;
        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_readiness_requires_ready_flag_and_model() {
        let registry = HealthRegistry::new("1.0.0");
        assert!(!registry.readiness().await.ready);

        registry.set_ready(true).await;
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("No artifact bundle loaded"));

        registry.set_model_loaded("v1").await;
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_readiness_not_ready_when_unhealthy() {
        let registry = HealthRegistry::new("1.0.0");
        registry.register(components::ARTIFACTS).await;
        registry.set_model_loaded("v1").await;
        registry.set_ready(true).await;
        registry.set_unhealthy(components::ARTIFACTS, "Failed").await;

        assert!(!registry.readiness().await.ready);
    }
}
