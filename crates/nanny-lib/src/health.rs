//! Health tracking for the nanny
//!
//! Backs the liveness and readiness probes. The node watcher and the
//! reconciler report their state here after every event or poll cycle.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Consecutive failures after which a component counts as unhealthy
pub const UNHEALTHY_AFTER_FAILURES: u32 = 30;

/// Component names for health tracking
pub mod components {
    pub const NODE_WATCHER: &str = "node_watcher";
    pub const RECONCILER: &str = "reconciler";
}

/// Ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Failing, but the next poll may recover
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    /// Liveness holds for healthy and degraded components
    pub fn is_live(self) -> bool {
        self != ComponentStatus::Unhealthy
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    /// Unix seconds of the last report
    pub reported_at: i64,
}

impl ComponentHealth {
    fn ok() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            last_error: None,
            consecutive_failures: 0,
            reported_at: chrono::Utc::now().timestamp(),
        }
    }

    fn failing(status: ComponentStatus, error: String, consecutive_failures: u32) -> Self {
        Self {
            status,
            last_error: Some(error),
            consecutive_failures,
            reported_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Body of the liveness probe
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

/// Body of the readiness probe
#[derive(Debug, Clone, Serialize)]
pub struct Readiness {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

#[derive(Debug, Default)]
struct RegistryState {
    components: BTreeMap<String, ComponentHealth>,
    cycle_completed: bool,
}

/// Shared registry of component health, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a component as healthy
    pub async fn register(&self, name: &str) {
        self.set_healthy(name).await;
    }

    pub async fn set_healthy(&self, name: &str) {
        self.state
            .write()
            .await
            .components
            .insert(name.to_string(), ComponentHealth::ok());
    }

    /// Count one more failure; degraded at first, unhealthy once they pile up
    pub async fn record_failure(&self, name: &str, error: impl Into<String>) {
        let mut state = self.state.write().await;
        let failures = state
            .components
            .get(name)
            .map_or(0, |c| c.consecutive_failures)
            .saturating_add(1);
        let status = if failures >= UNHEALTHY_AFTER_FAILURES {
            ComponentStatus::Unhealthy
        } else {
            ComponentStatus::Degraded
        };
        state.components.insert(
            name.to_string(),
            ComponentHealth::failing(status, error.into(), failures),
        );
    }

    /// Mark a component as failed beyond recovery
    pub async fn set_unhealthy(&self, name: &str, error: impl Into<String>) {
        let mut state = self.state.write().await;
        let failures = state
            .components
            .get(name)
            .map_or(0, |c| c.consecutive_failures);
        state.components.insert(
            name.to_string(),
            ComponentHealth::failing(ComponentStatus::Unhealthy, error.into(), failures),
        );
    }

    /// Record that a full poll cycle has completed
    pub async fn mark_cycle_completed(&self) {
        self.state.write().await.cycle_completed = true;
    }

    pub async fn health(&self) -> HealthReport {
        let state = self.state.read().await;
        let status = state
            .components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        HealthReport {
            status,
            components: state.components.clone(),
        }
    }

    pub async fn readiness(&self) -> Readiness {
        let cycle_completed = self.state.read().await.cycle_completed;
        let reason = if !cycle_completed {
            Some("No poll cycle has completed yet")
        } else if !self.health().await.status.is_live() {
            Some("A component is unhealthy")
        } else {
            None
        };

        Readiness {
            ready: reason.is_none(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_registry_is_healthy_but_not_ready() {
        let registry = HealthRegistry::new();

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }

    #[tokio::test]
    async fn test_failures_degrade_then_recover() {
        let registry = HealthRegistry::new();
        registry.register(components::NODE_WATCHER).await;
        registry.register(components::RECONCILER).await;

        registry
            .record_failure(components::RECONCILER, "deployment not found")
            .await;
        registry
            .record_failure(components::RECONCILER, "deployment not found")
            .await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        let reconciler = &health.components[components::RECONCILER];
        assert_eq!(reconciler.consecutive_failures, 2);
        assert_eq!(reconciler.last_error.as_deref(), Some("deployment not found"));

        registry.set_healthy(components::RECONCILER).await;
        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert_eq!(health.components[components::RECONCILER].consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_repeated_failures_become_unhealthy() {
        let registry = HealthRegistry::new();
        for _ in 0..UNHEALTHY_AFTER_FAILURES - 1 {
            registry.record_failure(components::RECONCILER, "timeout").await;
        }
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);

        registry.record_failure(components::RECONCILER, "timeout").await;
        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_unhealthy_component_blocks_readiness() {
        let registry = HealthRegistry::new();
        registry.register(components::NODE_WATCHER).await;
        registry.mark_cycle_completed().await;
        assert!(registry.readiness().await.ready);

        registry
            .set_unhealthy(components::NODE_WATCHER, "watch stream ended")
            .await;
        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason, Some("A component is unhealthy"));
    }
}
