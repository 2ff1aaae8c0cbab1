//! Preview the envelopes for a node count

use anyhow::Result;
use colored::Colorize;
use nanny_lib::NannyConfig;

use crate::output::{envelope_rows, print_json, print_table, OutputFormat};

pub fn show_estimate(config: &NannyConfig, nodes: u64, format: OutputFormat) -> Result<()> {
    let estimator = config.estimator_settings()?;
    let estimate = estimator.estimate(nodes);

    match format {
        OutputFormat::Json => print_json(&estimate)?,
        OutputFormat::Table => {
            println!("{}", "Resource Envelopes".bold());
            println!("{}", "=".repeat(60));
            println!("Nodes:                  {}", nodes.to_string().cyan());
            println!("Estimator:              {}", config.estimator.as_str());
            println!(
                "Recommendation offset:  {}%",
                config.recommendation_offset
            );
            println!("Acceptance offset:      {}%", config.acceptance_offset);
            println!();
            print_table(&envelope_rows(&estimate), format);
        }
    }

    Ok(())
}
