//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use nanny_lib::{EstimatorResult, Quantity, ResourceKind, ResourceList};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Row of an envelope table
#[derive(Tabled, Serialize)]
pub struct EnvelopeRow {
    #[tabled(rename = "Resource")]
    pub resource: String,
    #[tabled(rename = "Acceptable Low")]
    pub acceptable_lower: String,
    #[tabled(rename = "Recommended Low")]
    pub recommended_lower: String,
    #[tabled(rename = "Recommended High")]
    pub recommended_upper: String,
    #[tabled(rename = "Acceptable High")]
    pub acceptable_upper: String,
}

/// One row per resource kind appearing in any envelope
pub fn envelope_rows(estimate: &EstimatorResult) -> Vec<EnvelopeRow> {
    let mut kinds: Vec<&ResourceKind> = estimate
        .acceptable_range
        .lower
        .iter()
        .chain(estimate.acceptable_range.upper.iter())
        .chain(estimate.recommended_range.lower.iter())
        .chain(estimate.recommended_range.upper.iter())
        .map(|(kind, _)| kind)
        .collect();
    kinds.sort();
    kinds.dedup();

    kinds
        .into_iter()
        .map(|kind| EnvelopeRow {
            resource: kind.to_string(),
            acceptable_lower: format_quantity(estimate.acceptable_range.lower.get(kind)),
            recommended_lower: format_quantity(estimate.recommended_range.lower.get(kind)),
            recommended_upper: format_quantity(estimate.recommended_range.upper.get(kind)),
            acceptable_upper: format_quantity(estimate.acceptable_range.upper.get(kind)),
        })
        .collect()
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// A quantity, or a dash when the resource is not specified
pub fn format_quantity(quantity: Option<&Quantity>) -> String {
    quantity
        .map(|q| q.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// A resource list, or a dash when it is empty
pub fn format_list(list: &ResourceList) -> String {
    if list.is_empty() {
        "-".to_string()
    } else {
        list.to_string()
    }
}

/// Color a bounds verdict
pub fn color_verdict(verdict: &str) -> String {
    match verdict {
        "ok" => verdict.green().to_string(),
        "below" | "above" => verdict.yellow().to_string(),
        "missing" | "unexpected" => verdict.red().to_string(),
        _ => verdict.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanny_lib::{Estimator, LinearEstimator, Resource};

    fn q(s: &str) -> Quantity {
        Quantity::parse(s).unwrap()
    }

    #[test]
    fn test_envelope_rows() {
        let resources = vec![
            Resource::new(ResourceKind::Memory, q("100Mi"), q("1Mi")),
            Resource::new(ResourceKind::Cpu, q("100m"), q("1m")),
        ];
        let estimate = LinearEstimator::new(resources, 10, 20).estimate(10);

        let rows = envelope_rows(&estimate);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].resource, "cpu");
        assert_eq!(rows[0].acceptable_lower, "108m");
        assert_eq!(rows[0].recommended_upper, "111m");
        assert_eq!(rows[1].acceptable_upper, "112Mi");
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_quantity(None), "-");
        assert_eq!(format_quantity(Some(&q("2Gi"))), "2Gi");
        assert_eq!(format_list(&ResourceList::new()), "-");
    }
}
