//! The reconciliation poll loop
//!
//! Each cycle counts nodes, reads the managed container's resources, asks the
//! estimator for envelopes and writes a correction when needed. A failed
//! cycle is logged and abandoned; the next tick is the retry.

use super::should_overwrite;
use crate::cluster::{ClusterError, ClusterState};
use crate::estimator::Estimator;
use crate::health::{components, HealthRegistry};
use crate::observability::{NannyMetrics, StructuredLogger};
use crate::resources::ResourceList;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Configuration for the poll loop
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Time between the start of consecutive cycles (default: 10 seconds)
    pub poll_period: Duration,
    /// Compute corrections without writing them
    pub dry_run: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_period: Duration::from_secs(10),
            dry_run: false,
        }
    }
}

/// What a completed cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Declared resources are within the acceptable range
    Unchanged { nodes: u64 },
    /// Limits and requests were both replaced with this list
    Updated { nodes: u64, resources: ResourceList },
    /// A correction was needed but dry-run mode skipped the write
    DryRun { nodes: u64, resources: ResourceList },
}

/// Why a cycle was abandoned
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("failed to count cluster nodes: {0}")]
    CountNodes(#[source] ClusterError),
    #[error("failed to read managed resources: {0}")]
    ReadSpec(#[source] ClusterError),
    #[error("failed to write managed resources: {0}")]
    WriteSpec(#[source] ClusterError),
}

impl CycleError {
    /// Stage label used in logs and metrics
    pub fn stage(&self) -> &'static str {
        match self {
            CycleError::CountNodes(_) => "count_nodes",
            CycleError::ReadSpec(_) => "read_spec",
            CycleError::WriteSpec(_) => "write_spec",
        }
    }
}

/// Poll loop keeping the managed container sized for the cluster
pub struct Reconciler {
    estimator: Arc<dyn Estimator>,
    cluster: Arc<dyn ClusterState>,
    config: PollConfig,
    health: HealthRegistry,
    metrics: NannyMetrics,
    logger: Option<StructuredLogger>,
}

impl Reconciler {
    pub fn new(
        estimator: Arc<dyn Estimator>,
        cluster: Arc<dyn ClusterState>,
        config: PollConfig,
        health: HealthRegistry,
    ) -> Self {
        Self {
            estimator,
            cluster,
            config,
            health,
            metrics: NannyMetrics::new(),
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Run cycles until a shutdown signal arrives
    ///
    /// Shutdown is only observed between cycles, so a write in flight always
    /// completes.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            poll_period_secs = self.config.poll_period.as_secs(),
            dry_run = self.config.dry_run,
            "Starting reconciliation loop"
        );

        let mut ticker = interval(self.config.poll_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Failures are already logged and recorded
                    let _ = self.run_once().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down reconciliation loop");
                    break;
                }
            }
        }
    }

    /// Run a single poll cycle
    pub async fn run_once(&self) -> Result<CycleOutcome, CycleError> {
        let start = Instant::now();
        let result = self.cycle().await;
        self.metrics
            .observe_poll_latency(start.elapsed().as_secs_f64());

        match &result {
            Ok(outcome) => {
                debug!(outcome = ?outcome, "Poll cycle complete");
                self.health.set_healthy(components::RECONCILER).await;
                self.health.mark_cycle_completed().await;
            }
            Err(e) => {
                self.metrics.inc_poll_errors(e.stage());
                if let Some(logger) = &self.logger {
                    logger.log_poll_failure(e.stage(), &e.to_string());
                } else {
                    tracing::warn!(stage = e.stage(), error = %e, "Poll cycle aborted");
                }
                self.health
                    .record_failure(components::RECONCILER, e.to_string())
                    .await;
            }
        }

        result
    }

    async fn cycle(&self) -> Result<CycleOutcome, CycleError> {
        let nodes = self
            .cluster
            .count_members()
            .await
            .map_err(CycleError::CountNodes)?;
        self.metrics.set_cluster_nodes(nodes);

        let spec = self
            .cluster
            .read_managed_spec()
            .await
            .map_err(CycleError::ReadSpec)?;

        let estimate = self.estimator.estimate(nodes);
        let Some(corrected) = should_overwrite(&estimate, &spec.limits, &spec.requests) else {
            return Ok(CycleOutcome::Unchanged { nodes });
        };

        if self.config.dry_run {
            self.metrics.inc_dry_run_decisions();
            if let Some(logger) = &self.logger {
                logger.log_dry_run(nodes, &corrected);
            }
            return Ok(CycleOutcome::DryRun {
                nodes,
                resources: corrected,
            });
        }

        self.cluster
            .write_managed_spec(&corrected, &corrected)
            .await
            .map_err(CycleError::WriteSpec)?;

        self.metrics.inc_resizes();
        if let Some(logger) = &self.logger {
            logger.log_resize(nodes, &spec.limits, &corrected);
        }

        Ok(CycleOutcome::Updated {
            nodes,
            resources: corrected,
        })
    }
}

/// Builder for the reconciliation loop
pub struct ReconcilerBuilder {
    estimator: Option<Arc<dyn Estimator>>,
    cluster: Option<Arc<dyn ClusterState>>,
    config: PollConfig,
    health: HealthRegistry,
    logger: Option<StructuredLogger>,
}

impl ReconcilerBuilder {
    pub fn new() -> Self {
        Self {
            estimator: None,
            cluster: None,
            config: PollConfig::default(),
            health: HealthRegistry::new(),
            logger: None,
        }
    }

    pub fn estimator(mut self, estimator: Arc<dyn Estimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn cluster(mut self, cluster: Arc<dyn ClusterState>) -> Self {
        self.cluster = Some(cluster);
        self
    }

    pub fn poll_period(mut self, period: Duration) -> Self {
        self.config.poll_period = period;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.config.dry_run = dry_run;
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> Result<Reconciler> {
        let estimator = self
            .estimator
            .ok_or_else(|| anyhow::anyhow!("Estimator is required"))?;
        let cluster = self
            .cluster
            .ok_or_else(|| anyhow::anyhow!("Cluster state is required"))?;

        let reconciler = Reconciler::new(estimator, cluster, self.config, self.health);
        Ok(match self.logger {
            Some(logger) => reconciler.with_logger(logger),
            None => reconciler,
        })
    }
}

impl Default for ReconcilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
