//! Reconciliation of the managed container's resources
//!
//! The decision functions compare declared resources against the estimator's
//! acceptable range and pick a correction from the recommended range. The
//! poll loop in [`Reconciler`] applies them once per poll period.
//!
//! Triggering on the wide acceptable range while snapping to the narrow
//! recommended range gives hysteresis: a corrected container lands inside the
//! acceptable range and does not re-trigger at the same node count.

mod poll;

pub use poll::{CycleError, CycleOutcome, PollConfig, Reconciler, ReconcilerBuilder};

use crate::resources::{EstimatorResult, ResourceKind, ResourceList};
use std::collections::BTreeSet;

/// Kinds always checked, whether configured or not
const BUILTIN_KINDS: [ResourceKind; 3] = [ResourceKind::Cpu, ResourceKind::Memory, ResourceKind::Storage];

/// Correction for one resource kind in one declared list, if it is out of bounds
///
/// A kind declared on one side but not the other (estimate vs. actual) is out
/// of bounds and snaps to the recommended lower bound. Values outside the
/// inclusive acceptable range snap to the nearer recommended bound.
pub fn check_resource(
    estimate: &EstimatorResult,
    actual: &ResourceList,
    kind: &ResourceKind,
) -> Option<ResourceList> {
    let acceptable = &estimate.acceptable_range;
    let recommended = &estimate.recommended_range;

    let value = actual.get(kind);
    let low = acceptable.lower.get(kind);
    let high = acceptable.upper.get(kind);

    match (value, low, high) {
        (None, None, None) => None,
        (Some(value), Some(low), Some(high)) => {
            if value < low {
                Some(recommended.lower.clone())
            } else if value > high {
                Some(recommended.upper.clone())
            } else {
                None
            }
        }
        _ => Some(recommended.lower.clone()),
    }
}

/// The replacement resource list for both limits and requests, if any
///
/// Checks `limits` then `requests`, each over the checked kinds in stable
/// order, and returns the first correction found. That single list replaces
/// every managed resource at once.
pub fn should_overwrite(
    estimate: &EstimatorResult,
    limits: &ResourceList,
    requests: &ResourceList,
) -> Option<ResourceList> {
    let kinds = checked_kinds(estimate);
    [limits, requests].into_iter().find_map(|list| {
        kinds
            .iter()
            .find_map(|kind| check_resource(estimate, list, kind))
    })
}

/// Built-in kinds plus every kind the estimator produces, in stable order
fn checked_kinds(estimate: &EstimatorResult) -> BTreeSet<ResourceKind> {
    let acceptable = &estimate.acceptable_range;
    BUILTIN_KINDS
        .iter()
        .cloned()
        .chain(acceptable.lower.iter().map(|(kind, _)| kind.clone()))
        .chain(acceptable.upper.iter().map(|(kind, _)| kind.clone()))
        .collect()
}
