//! Library for the pod nanny
//!
//! This crate provides the core functionality for:
//! - Exact resource quantities and resource lists
//! - Estimating resource envelopes from cluster size
//! - Deciding when and how to rewrite a container's resources
//! - The poll loop and its Kubernetes collaborator
//! - Configuration, health checks and observability

pub mod cluster;
pub mod config;
pub mod estimator;
pub mod health;
pub mod observability;
pub mod quantity;
pub mod reconciler;
pub mod resources;

pub use cluster::{ClusterError, ClusterState, FakeCluster, KubeCluster, ManagedSpec, WorkloadRef};
pub use crate::config::{ConfigError, Configuration, EstimatorKind, NannyConfig};
pub use estimator::{Estimator, ExponentialEstimator, LinearEstimator};
pub use health::{ComponentHealth, ComponentStatus, HealthRegistry, HealthReport, Readiness};
pub use observability::{NannyMetrics, StructuredLogger};
pub use quantity::{Quantity, QuantityError, QuantityFormat};
pub use reconciler::{
    check_resource, should_overwrite, CycleError, CycleOutcome, PollConfig, Reconciler,
    ReconcilerBuilder,
};
pub use resources::{EstimatorResult, Resource, ResourceKind, ResourceList, ResourceListPair};
