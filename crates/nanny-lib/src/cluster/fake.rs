//! In-memory cluster state for tests and offline evaluation

use super::{ClusterError, ClusterState, ManagedSpec};
use crate::resources::ResourceList;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Cluster state with canned values
///
/// Writes replace the stored spec, so a later read observes them.
#[derive(Debug, Default)]
pub struct FakeCluster {
    nodes: AtomicU64,
    spec: Mutex<ManagedSpec>,
    writes: AtomicUsize,
    fail_count: AtomicBool,
    fail_read: AtomicBool,
    fail_write: AtomicBool,
}

impl FakeCluster {
    pub fn new(nodes: u64, limits: ResourceList, requests: ResourceList) -> Self {
        Self {
            nodes: AtomicU64::new(nodes),
            spec: Mutex::new(ManagedSpec { limits, requests }),
            ..Default::default()
        }
    }

    pub fn set_nodes(&self, nodes: u64) {
        self.nodes.store(nodes, Ordering::SeqCst);
    }

    /// Current stored spec
    pub fn spec(&self) -> ManagedSpec {
        self.spec
            .lock()
            .map(|spec| spec.clone())
            .unwrap_or_default()
    }

    /// Number of successful writes
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_count(&self, fail: bool) {
        self.fail_count.store(fail, Ordering::SeqCst);
    }

    pub fn fail_read(&self, fail: bool) {
        self.fail_read.store(fail, Ordering::SeqCst);
    }

    pub fn fail_write(&self, fail: bool) {
        self.fail_write.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClusterState for FakeCluster {
    async fn count_members(&self) -> Result<u64, ClusterError> {
        if self.fail_count.load(Ordering::SeqCst) {
            return Err(ClusterError::Transient("node listing unavailable".to_string()));
        }
        Ok(self.nodes.load(Ordering::SeqCst))
    }

    async fn read_managed_spec(&self) -> Result<ManagedSpec, ClusterError> {
        if self.fail_read.load(Ordering::SeqCst) {
            return Err(ClusterError::NotFound {
                kind: "deployment",
                name: "fake".to_string(),
            });
        }
        Ok(self.spec())
    }

    async fn write_managed_spec(
        &self,
        limits: &ResourceList,
        requests: &ResourceList,
    ) -> Result<(), ClusterError> {
        if self.fail_write.load(Ordering::SeqCst) {
            return Err(ClusterError::Transient("connection reset".to_string()));
        }
        let mut spec = self
            .spec
            .lock()
            .map_err(|_| ClusterError::Transient("fake state poisoned".to_string()))?;
        spec.limits = limits.clone();
        spec.requests = requests.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
