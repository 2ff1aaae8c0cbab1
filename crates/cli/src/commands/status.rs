//! Inspect a live workload and report what the nanny would do

use anyhow::{Context, Result};
use colored::Colorize;
use nanny_lib::{
    should_overwrite, ClusterState, EstimatorResult, HealthRegistry, KubeCluster, NannyConfig,
    ResourceList,
};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

use crate::commands::check::print_correction;
use crate::config::kube_client;
use crate::output::{envelope_rows, format_list, print_json, print_table, OutputFormat};

/// How long to wait for the first node listing
const NODE_SYNC_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct StatusReport<'a> {
    workload: String,
    nodes: u64,
    limits: &'a ResourceList,
    requests: &'a ResourceList,
    estimate: &'a EstimatorResult,
    correction: Option<&'a ResourceList>,
}

/// Read the managed container and evaluate it; never writes
pub async fn show_status(
    config: &NannyConfig,
    kubeconfig: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let configuration = config.validate()?;
    let client = kube_client(kubeconfig).await?;
    let cluster = KubeCluster::new(client, configuration.workload.clone(), HealthRegistry::new());

    let nodes = tokio::time::timeout(NODE_SYNC_TIMEOUT, cluster.count_members())
        .await
        .context("Timed out waiting for the node listing")??;
    let spec = cluster
        .read_managed_spec()
        .await
        .with_context(|| format!("Failed to read {}", configuration.workload))?;

    let estimate = configuration.build_estimator().estimate(nodes);
    let correction = should_overwrite(&estimate, &spec.limits, &spec.requests);

    match format {
        OutputFormat::Json => print_json(&StatusReport {
            workload: configuration.workload.to_string(),
            nodes,
            limits: &spec.limits,
            requests: &spec.requests,
            estimate: &estimate,
            correction: correction.as_ref(),
        })?,
        OutputFormat::Table => {
            println!("{}", "Nanny Status".bold());
            println!("{}", "=".repeat(60));
            println!("Workload:  {}", configuration.workload.to_string().cyan());
            println!("Nodes:     {}", nodes);
            println!("Limits:    {}", format_list(&spec.limits));
            println!("Requests:  {}", format_list(&spec.requests));
            if configuration.dry_run {
                println!("Mode:      {}", "dry run".yellow());
            }
            println!();
            print_table(&envelope_rows(&estimate), format);
            println!();
            print_correction(correction.as_ref());
        }
    }

    Ok(())
}
