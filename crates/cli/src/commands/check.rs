//! Evaluate a resource spec against the envelopes without touching a cluster

use anyhow::{bail, Context, Result};
use colored::Colorize;
use nanny_lib::{should_overwrite, EstimatorResult, NannyConfig, Quantity, ResourceKind, ResourceList};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{
    color_verdict, format_list, format_quantity, print_info, print_json, print_success,
    print_table, print_warning, OutputFormat,
};

#[derive(Tabled, Serialize)]
struct VerdictRow {
    #[tabled(rename = "List")]
    list: String,
    #[tabled(rename = "Resource")]
    resource: String,
    #[tabled(rename = "Actual")]
    actual: String,
    #[tabled(rename = "Acceptable")]
    acceptable: String,
    #[tabled(rename = "Verdict")]
    verdict: String,
}

#[derive(Serialize)]
struct CheckReport<'a> {
    nodes: u64,
    estimate: &'a EstimatorResult,
    correction: Option<&'a ResourceList>,
}

/// Parse `cpu=300m,memory=200Mi` into a resource list
pub fn parse_resource_list(input: &str) -> Result<ResourceList> {
    let mut list = ResourceList::new();
    for entry in input.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((name, value)) = entry.split_once('=') else {
            bail!("Expected name=quantity, got {:?}", entry);
        };
        let quantity = Quantity::parse(value.trim())
            .with_context(|| format!("Invalid quantity for {}", name.trim()))?;
        if list
            .insert(ResourceKind::from_name(name.trim()), quantity)
            .is_some()
        {
            bail!("Resource {} given more than once", name.trim());
        }
    }
    Ok(list)
}

/// How one declared value relates to the acceptable range
pub fn verdict(estimate: &EstimatorResult, actual: &ResourceList, kind: &ResourceKind) -> &'static str {
    let acceptable = &estimate.acceptable_range;
    match (actual.get(kind), acceptable.lower.get(kind), acceptable.upper.get(kind)) {
        (None, None, None) => "unmanaged",
        (Some(value), Some(low), Some(high)) => {
            if value < low {
                "below"
            } else if value > high {
                "above"
            } else {
                "ok"
            }
        }
        (None, _, _) => "missing",
        (Some(_), _, _) => "unexpected",
    }
}

pub fn check_spec(
    config: &NannyConfig,
    nodes: u64,
    limits: &ResourceList,
    requests: &ResourceList,
    format: OutputFormat,
) -> Result<()> {
    let estimator = config.estimator_settings()?;
    let estimate = estimator.estimate(nodes);
    let correction = should_overwrite(&estimate, limits, requests);

    match format {
        OutputFormat::Json => print_json(&CheckReport {
            nodes,
            estimate: &estimate,
            correction: correction.as_ref(),
        })?,
        OutputFormat::Table => {
            println!("{}", "Resource Check".bold());
            println!("{}", "=".repeat(60));
            println!("Nodes: {}", nodes.to_string().cyan());
            println!();
            print_table(&verdict_rows(&estimate, limits, requests), format);
            println!();
            print_correction(correction.as_ref());
        }
    }

    Ok(())
}

/// Print the outcome of a decision in human-readable form
pub fn print_correction(correction: Option<&ResourceList>) {
    match correction {
        None => print_success("Resources are within the acceptable range, no update needed"),
        Some(list) => {
            print_warning("Resources are out of bounds");
            print_info(&format!(
                "Limits and requests would both be set to: {}",
                format_list(list)
            ));
        }
    }
}

fn verdict_rows(
    estimate: &EstimatorResult,
    limits: &ResourceList,
    requests: &ResourceList,
) -> Vec<VerdictRow> {
    let mut kinds: Vec<&ResourceKind> = limits
        .iter()
        .chain(requests.iter())
        .chain(estimate.acceptable_range.lower.iter())
        .map(|(kind, _)| kind)
        .collect();
    kinds.sort();
    kinds.dedup();

    let mut rows = Vec::new();
    for (name, list) in [("limits", limits), ("requests", requests)] {
        for kind in &kinds {
            rows.push(VerdictRow {
                list: name.to_string(),
                resource: kind.to_string(),
                actual: format_quantity(list.get(kind)),
                acceptable: format!(
                    "{}..{}",
                    format_quantity(estimate.acceptable_range.lower.get(kind)),
                    format_quantity(estimate.acceptable_range.upper.get(kind))
                ),
                verdict: color_verdict(verdict(estimate, list, kind)),
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanny_lib::{Estimator, LinearEstimator, Resource};

    fn q(s: &str) -> Quantity {
        Quantity::parse(s).unwrap()
    }

    #[test]
    fn test_parse_resource_list() {
        let list = parse_resource_list("cpu=300m, memory=200Mi").unwrap();
        assert_eq!(list.get(&ResourceKind::Cpu), Some(&q("0.3")));
        assert_eq!(list.get(&ResourceKind::Memory), Some(&q("200Mi")));

        assert!(parse_resource_list("").unwrap().is_empty());
        assert!(parse_resource_list("cpu").is_err());
        assert!(parse_resource_list("cpu=lots").is_err());
        assert!(parse_resource_list("cpu=1,cpu=2").is_err());
    }

    #[test]
    fn test_verdicts() {
        let resources = vec![Resource::new(ResourceKind::Cpu, q("100m"), q("10m"))];
        // 10 nodes, acceptable 8..12 nodes -> 180m..220m
        let estimate = LinearEstimator::new(resources, 10, 20).estimate(10);

        let verdict_for = |spec: &str, kind: ResourceKind| {
            verdict(&estimate, &parse_resource_list(spec).unwrap(), &kind)
        };
        assert_eq!(verdict_for("cpu=200m", ResourceKind::Cpu), "ok");
        assert_eq!(verdict_for("cpu=100m", ResourceKind::Cpu), "below");
        assert_eq!(verdict_for("cpu=1", ResourceKind::Cpu), "above");
        assert_eq!(verdict_for("", ResourceKind::Cpu), "missing");
        assert_eq!(verdict_for("memory=1Gi", ResourceKind::Memory), "unexpected");
        assert_eq!(verdict_for("", ResourceKind::Memory), "unmanaged");
    }
}
