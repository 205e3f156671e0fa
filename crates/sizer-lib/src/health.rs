//! Component health tracking for liveness and readiness probes
//!
//! The webhook is unhealthy only when one of its servers stops; a metrics
//! store that cannot answer leaves admissions working (fail-open) and is
//! reported as degraded.
//!
//! Health is observability only. Admission decisions never read it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Component is experiencing issues but still operational
    Degraded,
    /// Component has failed
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
    pub fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Degraded,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Unhealthy,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Compute overall status from component statuses
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let mut has_degraded = false;

        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => has_degraded = true,
                ComponentStatus::Healthy => {}
            }
        }

        if has_degraded {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
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
    pub const WEBHOOK: &str = "webhook";
    pub const OPS_API: &str = "ops_api";
    pub const METRICS_STORE: &str = "metrics_store";
}

/// Consecutive failed metrics fetches before the store is reported degraded
pub const DEFAULT_STORE_FAILURE_THRESHOLD: u32 = 3;

/// Health registry for tracking component health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), ComponentHealth::healthy());
    }

    /// Update component health status
    pub async fn update(&self, name: &str, health: ComponentHealth) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), health);
    }

    /// Mark component as healthy
    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    /// Mark component as degraded
    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    /// Mark component as unhealthy
    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Set readiness status
    pub async fn set_ready(&self, ready: bool) {
        let mut r = self.ready.write().await;
        *r = ready;
    }

    /// Get health response
    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Get readiness response
    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;
        let critical_healthy = health.status != ComponentStatus::Unhealthy;

        if !ready {
            ReadinessResponse {
                ready: false,
                reason: Some("Webhook not yet serving".to_string()),
            }
        } else if !critical_healthy {
            ReadinessResponse {
                ready: false,
                reason: Some("Critical component unhealthy".to_string()),
            }
        } else {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        }
    }
}

/// Tracks metrics store fetch outcomes across admissions.
///
/// Admissions run concurrently, so a single failed fetch is not reported;
/// the `metrics_store` component turns degraded after `threshold` failures
/// in a row and healthy again on the next complete fetch.
#[derive(Debug, Clone)]
pub struct StoreHealthTracker {
    registry: HealthRegistry,
    failures: Arc<AtomicU32>,
    threshold: u32,
}

impl StoreHealthTracker {
    pub fn new(registry: HealthRegistry) -> Self {
        Self::with_threshold(registry, DEFAULT_STORE_FAILURE_THRESHOLD)
    }

    /// A threshold of 0 is treated as 1
    pub fn with_threshold(registry: HealthRegistry, threshold: u32) -> Self {
        Self {
            registry,
            failures: Arc::new(AtomicU32::new(0)),
            threshold: threshold.max(1),
        }
    }

    pub fn registry(&self) -> &HealthRegistry {
        &self.registry
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Every dimension was fetched
    pub async fn record_success(&self) {
        let streak = self.failures.swap(0, Ordering::Relaxed);
        if streak >= self.threshold {
            self.registry.set_healthy(components::METRICS_STORE).await;
        }
    }

    /// At least one dimension was nullified for `workload`
    pub async fn record_failure(&self, workload: &str) {
        let streak = self.failures.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        if streak >= self.threshold {
            self.registry
                .set_degraded(
                    components::METRICS_STORE,
                    format!(
                        "{} consecutive metrics fetches incomplete, last for workload {}",
                        streak, workload
                    ),
                )
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_registry_initial_state() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_health_registry_component_registration() {
        let registry = HealthRegistry::new();
        registry.register(components::WEBHOOK).await;

        let health = registry.health().await;
        assert!(health.components.contains_key(components::WEBHOOK));
        assert_eq!(
            health.components[components::WEBHOOK].status,
            ComponentStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_health_registry_degraded_status() {
        let registry = HealthRegistry::new();
        registry.register(components::WEBHOOK).await;
        registry.register(components::METRICS_STORE).await;

        registry
            .set_degraded(components::METRICS_STORE, "metrics unavailable for workload web")
            .await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(
            health.components[components::METRICS_STORE].message.as_deref(),
            Some("metrics unavailable for workload web")
        );
    }

    #[tokio::test]
    async fn test_degraded_metrics_store_keeps_webhook_ready() {
        let registry = HealthRegistry::new();
        registry.register(components::WEBHOOK).await;
        registry.register(components::METRICS_STORE).await;
        registry.set_ready(true).await;

        registry
            .set_degraded(components::METRICS_STORE, "connection refused")
            .await;
        assert!(registry.readiness().await.ready);

        registry.set_healthy(components::METRICS_STORE).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_health_registry_unhealthy_status() {
        let registry = HealthRegistry::new();
        registry.register(components::WEBHOOK).await;
        registry.register(components::METRICS_STORE).await;

        registry.set_unhealthy(components::WEBHOOK, "listener closed").await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_readiness_not_ready_initially() {
        let registry = HealthRegistry::new();
        let readiness = registry.readiness().await;

        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }

    #[tokio::test]
    async fn test_readiness_ready_when_set() {
        let registry = HealthRegistry::new();
        registry.set_ready(true).await;

        let readiness = registry.readiness().await;
        assert!(readiness.ready);
    }

    #[tokio::test]
    async fn test_readiness_not_ready_when_unhealthy() {
        let registry = HealthRegistry::new();
        registry.register(components::WEBHOOK).await;
        registry.set_ready(true).await;
        registry.set_unhealthy(components::WEBHOOK, "Failed").await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
    }

    #[tokio::test]
    async fn test_store_tracker_degrades_after_threshold() {
        let registry = HealthRegistry::new();
        registry.register(components::METRICS_STORE).await;
        let tracker = StoreHealthTracker::with_threshold(registry.clone(), 2);

        tracker.record_failure("web").await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);

        tracker.record_failure("web").await;
        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(
            health.components[components::METRICS_STORE].message.as_deref(),
            Some("2 consecutive metrics fetches incomplete, last for workload web")
        );
    }

    #[tokio::test]
    async fn test_store_tracker_single_failure_between_successes_is_quiet() {
        let registry = HealthRegistry::new();
        registry.register(components::METRICS_STORE).await;
        let tracker = StoreHealthTracker::new(registry.clone());

        for _ in 0..5 {
            tracker.record_failure("web").await;
            tracker.record_success().await;
        }

        assert_eq!(tracker.consecutive_failures(), 0);
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_store_tracker_recovers_on_success() {
        let registry = HealthRegistry::new();
        registry.register(components::METRICS_STORE).await;
        let tracker = StoreHealthTracker::with_threshold(registry.clone(), 0);
        assert_eq!(tracker.threshold(), 1);

        tracker.record_failure("web").await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);

        tracker.record_success().await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }
}
