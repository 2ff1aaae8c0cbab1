//! Observability infrastructure for the nanny
//!
//! Provides:
//! - Prometheus metrics (poll latency, cluster size, resizes, poll errors)
//! - Structured JSON logging with tracing

use crate::cluster::WorkloadRef;
use crate::resources::ResourceList;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for poll cycle latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

static GLOBAL_METRICS: OnceLock<NannyMetricsInner> = OnceLock::new();

struct NannyMetricsInner {
    poll_latency_seconds: Histogram,
    cluster_nodes: IntGauge,
    resizes: IntCounter,
    dry_run_decisions: IntCounter,
    poll_errors: IntCounterVec,
}

impl NannyMetricsInner {
    fn new() -> Self {
        Self {
            poll_latency_seconds: register_histogram!(
                "pod_nanny_poll_latency_seconds",
                "Time spent in one poll cycle",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register poll_latency_seconds"),

            cluster_nodes: register_int_gauge!(
                "pod_nanny_cluster_nodes",
                "Number of nodes observed in the last poll cycle"
            )
            .expect("Failed to register cluster_nodes"),

            resizes: register_int_counter!(
                "pod_nanny_resizes_total",
                "Number of resource updates written to the managed container"
            )
            .expect("Failed to register resizes_total"),

            dry_run_decisions: register_int_counter!(
                "pod_nanny_dry_run_decisions_total",
                "Number of resource updates skipped because of dry-run mode"
            )
            .expect("Failed to register dry_run_decisions_total"),

            poll_errors: register_int_counter_vec!(
                "pod_nanny_poll_errors_total",
                "Number of aborted poll cycles by failing stage",
                &["stage"]
            )
            .expect("Failed to register poll_errors_total"),
        }
    }
}

/// Handle to the process-wide nanny metrics
///
/// Clones share the same underlying Prometheus collectors.
#[derive(Clone)]
pub struct NannyMetrics {
    _private: (),
}

impl Default for NannyMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl NannyMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(NannyMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &NannyMetricsInner {
        GLOBAL_METRICS.get_or_init(NannyMetricsInner::new)
    }

    pub fn observe_poll_latency(&self, duration_secs: f64) {
        self.inner().poll_latency_seconds.observe(duration_secs);
    }

    pub fn set_cluster_nodes(&self, nodes: u64) {
        self.inner()
            .cluster_nodes
            .set(i64::try_from(nodes).unwrap_or(i64::MAX));
    }

    pub fn inc_resizes(&self) {
        self.inner().resizes.inc();
    }

    pub fn inc_dry_run_decisions(&self) {
        self.inner().dry_run_decisions.inc();
    }

    pub fn inc_poll_errors(&self, stage: &str) {
        self.inner().poll_errors.with_label_values(&[stage]).inc();
    }

    pub fn resizes(&self) -> u64 {
        self.inner().resizes.get()
    }

    pub fn poll_errors(&self, stage: &str) -> u64 {
        self.inner().poll_errors.with_label_values(&[stage]).get()
    }
}

/// Structured logger for nanny events
#[derive(Clone)]
pub struct StructuredLogger {
    workload: String,
}

impl StructuredLogger {
    pub fn new(workload: &WorkloadRef) -> Self {
        Self {
            workload: workload.to_string(),
        }
    }

    pub fn log_startup(&self, version: &str, estimator: &str, poll_period_secs: u64) {
        info!(
            event = "nanny_started",
            workload = %self.workload,
            nanny_version = %version,
            estimator = %estimator,
            poll_period_secs = poll_period_secs,
            "Pod nanny started"
        );
    }

    pub fn log_resize(&self, nodes: u64, previous: &ResourceList, corrected: &ResourceList) {
        info!(
            event = "resources_resized",
            workload = %self.workload,
            nodes = nodes,
            previous = %previous,
            corrected = %corrected,
            "Resources out of bounds, updated limits and requests"
        );
    }

    pub fn log_dry_run(&self, nodes: u64, corrected: &ResourceList) {
        info!(
            event = "resize_skipped_dry_run",
            workload = %self.workload,
            nodes = nodes,
            corrected = %corrected,
            "Resources out of bounds, dry run leaves them unchanged"
        );
    }

    pub fn log_poll_failure(&self, stage: &str, error: &str) {
        warn!(
            event = "poll_failed",
            workload = %self.workload,
            stage = %stage,
            error = %error,
            "Poll cycle aborted, retrying on next poll"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "nanny_shutdown",
            workload = %self.workload,
            reason = %reason,
            "Pod nanny shutting down"
        );
    }
}
