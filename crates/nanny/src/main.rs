//! Pod Nanny - keeps an add-on's resources sized for the cluster
//!
//! This binary runs alongside the managed add-on, watches the cluster's node
//! count and rewrites the add-on container's limits and requests whenever they
//! drift outside the acceptable range.

use anyhow::{Context, Result};
use nanny_lib::{
    health::components, HealthRegistry, KubeCluster, NannyMetrics, ReconcilerBuilder,
    StructuredLogger,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const NANNY_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting pod-nanny");

    let settings = config::Settings::load()?;
    let configuration = &settings.configuration;
    info!(
        workload = %configuration.workload,
        recommendation_offset = configuration.recommendation_offset,
        acceptance_offset = configuration.acceptance_offset,
        resources = configuration.resources.len(),
        "Nanny configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::NODE_WATCHER).await;
    health_registry.register(components::RECONCILER).await;

    let metrics = NannyMetrics::new();

    let logger = StructuredLogger::new(&configuration.workload);
    logger.log_startup(
        NANNY_VERSION,
        configuration.estimator.as_str(),
        configuration.poll_period.as_secs(),
    );

    let client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let cluster = Arc::new(KubeCluster::new(
        client,
        configuration.workload.clone(),
        health_registry.clone(),
    ));

    let reconciler = ReconcilerBuilder::new()
        .estimator(configuration.build_estimator())
        .cluster(cluster)
        .poll_period(configuration.poll_period)
        .dry_run(configuration.dry_run)
        .health(health_registry.clone())
        .logger(logger.clone())
        .build()?;

    let app_state = Arc::new(api::AppState::new(health_registry, metrics));
    let api_handle = tokio::spawn(api::serve(settings.api_port, app_state));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let loop_handle = tokio::spawn(reconciler.run(shutdown_rx));

    let reason = shutdown_signal().await?;
    logger.log_shutdown(reason);

    // The loop finishes any cycle in progress before it exits
    let _ = shutdown_tx.send(());
    loop_handle.await.context("Reconciliation loop panicked")?;
    api_handle.abort();

    info!("Shutting down");
    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() -> Result<&'static str> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .context("Failed to install SIGTERM handler")?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                Ok("SIGINT received")
            }
            _ = terminate.recv() => Ok("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("SIGINT received")
    }
}
