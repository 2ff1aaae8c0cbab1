//! Linear estimation: `base + extra_per_node * nodes`

use super::{envelope, offset_node_counts, Estimator};
use crate::resources::{EstimatorResult, Resource, ResourceListPair};

/// Scales every managed resource linearly with the node count
#[derive(Debug, Clone)]
pub struct LinearEstimator {
    resources: Vec<Resource>,
    recommendation_offset: u32,
    acceptance_offset: u32,
}

impl LinearEstimator {
    pub fn new(resources: Vec<Resource>, recommendation_offset: u32, acceptance_offset: u32) -> Self {
        Self {
            resources,
            recommendation_offset,
            acceptance_offset,
        }
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    fn range(&self, node_count: u64, offset: u32) -> ResourceListPair {
        let (low, high) = offset_node_counts(node_count, offset);
        envelope(&self.resources, low, high)
    }
}

impl Estimator for LinearEstimator {
    fn estimate(&self, node_count: u64) -> EstimatorResult {
        EstimatorResult {
            recommended_range: self.range(node_count, self.recommendation_offset),
            acceptable_range: self.range(node_count, self.acceptance_offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantity::Quantity;
    use crate::resources::ResourceKind;
    use proptest::prelude::*;

    fn q(s: &str) -> Quantity {
        Quantity::parse(s).unwrap()
    }

    fn cpu_and_memory() -> Vec<Resource> {
        vec![
            Resource::new(ResourceKind::Cpu, q("0.3"), q("10m")),
            Resource::new(ResourceKind::Memory, q("200Mi"), q("4Mi")),
        ]
    }

    #[test]
    fn test_zero_offsets_give_point_envelopes() {
        let resources = vec![
            Resource::new(ResourceKind::Cpu, q("0.3"), q("0")),
            Resource::new(ResourceKind::Memory, q("200Mi"), q("0")),
        ];
        let estimator = LinearEstimator::new(resources, 0, 0);
        let result = estimator.estimate(5);

        let expected = &result.recommended_range.lower;
        assert_eq!(expected.get(&ResourceKind::Cpu), Some(&q("0.3")));
        assert_eq!(expected.get(&ResourceKind::Memory), Some(&q("200Mi")));
        assert_eq!(result.recommended_range.upper, *expected);
        assert_eq!(result.acceptable_range.lower, *expected);
        assert_eq!(result.acceptable_range.upper, *expected);
    }

    #[test]
    fn test_offsets_widen_envelopes() {
        let estimator = LinearEstimator::new(cpu_and_memory(), 10, 20);
        let result = estimator.estimate(10);

        // Recommended: 9 and 11 nodes
        assert_eq!(result.recommended_range.lower.get(&ResourceKind::Cpu), Some(&q("390m")));
        assert_eq!(result.recommended_range.upper.get(&ResourceKind::Cpu), Some(&q("410m")));
        // Acceptable: 8 and 12 nodes
        assert_eq!(result.acceptable_range.lower.get(&ResourceKind::Cpu), Some(&q("380m")));
        assert_eq!(result.acceptable_range.upper.get(&ResourceKind::Cpu), Some(&q("420m")));
        assert_eq!(
            result.acceptable_range.upper.get(&ResourceKind::Memory).map(|m| m.to_string()),
            Some("248Mi".to_string())
        );
    }

    #[test]
    fn test_zero_nodes_collapse_to_base() {
        let estimator = LinearEstimator::new(cpu_and_memory(), 10, 20);
        let result = estimator.estimate(0);

        for range in [&result.recommended_range, &result.acceptable_range] {
            assert_eq!(range.lower.get(&ResourceKind::Cpu), Some(&q("300m")));
            assert_eq!(range.upper.get(&ResourceKind::Memory), Some(&q("200Mi")));
        }
    }

    #[test]
    fn test_only_configured_resources_are_estimated() {
        let estimator = LinearEstimator::new(cpu_and_memory(), 0, 0);
        let result = estimator.estimate(3);
        assert!(!result.acceptable_range.lower.contains(&ResourceKind::Storage));
        assert_eq!(result.acceptable_range.upper.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_envelopes_grow_with_nodes(
            n in 0u64..10_000,
            extra_milli in 0i64..1_000,
            rec in 0u32..=100,
            acc_delta in 0u32..=100,
        ) {
            let acc = (rec + acc_delta).min(100);
            let resources = vec![Resource::new(
                ResourceKind::Cpu,
                q("100m"),
                Quantity::from_milli(extra_milli, Default::default()),
            )];
            let estimator = LinearEstimator::new(resources, rec, acc);
            let now = estimator.estimate(n);
            let next = estimator.estimate(n + 1);

            let cpu = ResourceKind::Cpu;
            prop_assert!(now.recommended_range.lower.get(&cpu) <= next.recommended_range.lower.get(&cpu));
            prop_assert!(now.recommended_range.upper.get(&cpu) <= next.recommended_range.upper.get(&cpu));
            // Recommended band sits inside the acceptable band
            prop_assert!(now.acceptable_range.lower.get(&cpu) <= now.recommended_range.lower.get(&cpu));
            prop_assert!(now.recommended_range.upper.get(&cpu) <= now.acceptable_range.upper.get(&cpu));
        }
    }
}
