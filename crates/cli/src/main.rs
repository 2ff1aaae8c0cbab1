//! Pod Nanny CLI
//!
//! Offline previews of the resource envelopes and a read-only view of
//! what the nanny would do to a live workload.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{check, estimate, status};
use std::path::PathBuf;

/// Pod Nanny CLI
#[derive(Parser)]
#[command(name = "nannyctl")]
#[command(author, version, about = "CLI for Pod Nanny", long_about = None)]
pub struct Cli {
    /// Path to the nanny configuration file (can also be set via NANNY_CONFIG_FILE)
    #[arg(long, short, env = "NANNY_CONFIG_FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the recommended and acceptable envelopes for a node count
    Estimate {
        /// Number of nodes in the cluster
        #[arg(long, short)]
        nodes: u64,
    },

    /// Check a resource spec against the envelopes without a cluster
    Check {
        /// Number of nodes in the cluster
        #[arg(long, short)]
        nodes: u64,

        /// Current limits (e.g. cpu=300m,memory=200Mi)
        #[arg(long, default_value = "")]
        limits: String,

        /// Current requests (e.g. cpu=300m,memory=200Mi)
        #[arg(long, default_value = "")]
        requests: String,
    },

    /// Inspect the managed container in a live cluster (read-only)
    Status {
        /// Path to kubeconfig file (uses default if not specified)
        #[arg(long, env = "KUBECONFIG")]
        kubeconfig: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let nanny_config = config::load_nanny_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Estimate { nodes } => {
            estimate::show_estimate(&nanny_config, nodes, cli.format)?;
        }
        Commands::Check {
            nodes,
            limits,
            requests,
        } => {
            let limits = check::parse_resource_list(&limits)?;
            let requests = check::parse_resource_list(&requests)?;
            check::check_spec(&nanny_config, nodes, &limits, &requests, cli.format)?;
        }
        Commands::Status { kubeconfig } => {
            status::show_status(&nanny_config, kubeconfig.as_deref(), cli.format).await?;
        }
    }

    Ok(())
}
