//! Cluster state access
//!
//! The reconciler talks to the cluster only through [`ClusterState`]:
//! count the nodes, read the managed container's resources, write them back.

mod fake;
mod kubernetes;

pub use self::fake::FakeCluster;
pub use self::kubernetes::{KubeCluster, WorkloadRef};

use crate::quantity::QuantityError;
use crate::resources::ResourceList;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from the cluster collaborator
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The tracked workload or container does not exist
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    /// Communication failed; the next poll retries
    #[error("transient cluster error: {0}")]
    Transient(String),

    /// The workload declares a quantity that cannot be parsed
    #[error("invalid quantity in workload spec: {0}")]
    InvalidQuantity(#[from] QuantityError),

    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
}

/// Declared resources of the managed container
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagedSpec {
    pub limits: ResourceList,
    pub requests: ResourceList,
}

/// Trait for cluster state implementations
#[async_trait]
pub trait ClusterState: Send + Sync {
    /// Current number of cluster nodes
    ///
    /// Waits until at least one full node listing has been observed.
    async fn count_members(&self) -> Result<u64, ClusterError>;

    /// Current limits and requests of the managed container
    async fn read_managed_spec(&self) -> Result<ManagedSpec, ClusterError>;

    /// Replace the managed container's limits and requests in one update
    async fn write_managed_spec(
        &self,
        limits: &ResourceList,
        requests: &ResourceList,
    ) -> Result<(), ClusterError>;
}
