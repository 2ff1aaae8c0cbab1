//! Exponential estimation
//!
//! Rounds node counts up to power-of-two buckets before scaling, so a large
//! cluster only triggers a resize when it crosses a bucket boundary.

use super::{envelope, offset_node_counts, Estimator};
use crate::resources::{EstimatorResult, Resource, ResourceListPair};

/// Smallest bucket used when none is configured
pub const DEFAULT_MIN_CLUSTER_SIZE: u64 = 16;

#[derive(Debug, Clone)]
pub struct ExponentialEstimator {
    resources: Vec<Resource>,
    recommendation_offset: u32,
    acceptance_offset: u32,
    min_cluster_size: u64,
}

impl ExponentialEstimator {
    pub fn new(
        resources: Vec<Resource>,
        recommendation_offset: u32,
        acceptance_offset: u32,
        min_cluster_size: u64,
    ) -> Self {
        Self {
            resources,
            recommendation_offset,
            acceptance_offset,
            min_cluster_size: min_cluster_size.max(1),
        }
    }

    /// The bucket a node count falls into
    pub fn bucket(&self, nodes: u64) -> u64 {
        if nodes <= self.min_cluster_size {
            return self.min_cluster_size;
        }
        let mut bucket = self.min_cluster_size;
        while bucket < nodes {
            bucket = bucket.saturating_mul(2);
        }
        bucket
    }

    fn range(&self, node_count: u64, offset: u32) -> ResourceListPair {
        let (low, high) = offset_node_counts(node_count, offset);
        envelope(&self.resources, self.bucket(low), self.bucket(high))
    }
}

impl Estimator for ExponentialEstimator {
    fn estimate(&self, node_count: u64) -> EstimatorResult {
        EstimatorResult {
            recommended_range: self.range(node_count, self.recommendation_offset),
            acceptable_range: self.range(node_count, self.acceptance_offset),
        }
    }
}
