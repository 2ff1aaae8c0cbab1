//! Resource estimation from cluster size
//!
//! An estimator maps a node count to two envelopes: a narrow recommended
//! range that corrections snap to and a wider acceptable range whose
//! crossing triggers a correction.

mod exponential;
mod linear;

pub use exponential::{ExponentialEstimator, DEFAULT_MIN_CLUSTER_SIZE};
pub use linear::LinearEstimator;

use crate::resources::{EstimatorResult, Resource, ResourceList, ResourceListPair};

/// Trait for estimation strategies
pub trait Estimator: Send + Sync {
    /// Compute the envelopes for a cluster of `node_count` nodes
    fn estimate(&self, node_count: u64) -> EstimatorResult;
}

/// Node counts bounding `node_count` by `offset_percent` in each direction
///
/// The low bound rounds toward fewer nodes and the high bound toward more,
/// so rounding never narrows the envelope. The low bound is clamped at zero.
pub fn offset_node_counts(node_count: u64, offset_percent: u32) -> (u64, u64) {
    let n = node_count as u128;
    // floor(-x / 100) == -ceil(x / 100), so both sides move by the same amount
    let delta = (n * offset_percent as u128).div_ceil(100);

    let low = n.saturating_sub(delta);
    let high = n + delta;
    (clamp_u64(low), clamp_u64(high))
}

/// Per-resource values for the given adjusted node counts
pub(crate) fn envelope(resources: &[Resource], nodes_low: u64, nodes_high: u64) -> ResourceListPair {
    ResourceListPair {
        lower: scale_all(resources, nodes_low),
        upper: scale_all(resources, nodes_high),
    }
}

fn scale_all(resources: &[Resource], nodes: u64) -> ResourceList {
    resources
        .iter()
        .map(|r| (r.name.clone(), r.scaled(nodes)))
        .collect()
}

fn clamp_u64(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_node_counts_rounding() {
        // 5 * 10% = 0.5 -> low rounds down to 4, high rounds up to 6
        assert_eq!(offset_node_counts(5, 10), (4, 6));
        assert_eq!(offset_node_counts(10, 20), (8, 12));
        assert_eq!(offset_node_counts(100, 0), (100, 100));
        assert_eq!(offset_node_counts(0, 50), (0, 0));
    }

    #[test]
    fn test_offset_node_counts_clamps_at_zero() {
        assert_eq!(offset_node_counts(10, 150), (0, 25));
    }

    #[test]
    fn test_offset_node_counts_full_range() {
        assert_eq!(offset_node_counts(7, 100), (0, 14));
    }
}
