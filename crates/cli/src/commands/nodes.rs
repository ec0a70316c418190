//! Node benchmark inspection

use std::path::Path;

use anyhow::Result;
use profiler_lib::classifier::assign_tiers;
use profiler_lib::ingest::load_node_profiles;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{format_optional, print_json, print_table, OutputFormat};

/// Row for nodes table
#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Host")]
    hostname: String,
    #[tabled(rename = "Tier")]
    tier: String,
    #[tabled(rename = "GFLOP/s")]
    peak_gflops: String,
    #[tabled(rename = "Mem GB/s")]
    memory_bandwidth: String,
    #[tabled(rename = "Net Mbit/s")]
    network_bandwidth: String,
    #[tabled(rename = "Ridge")]
    ridge_point: String,
    #[tabled(rename = "CPU")]
    cpu: String,
}

#[derive(Serialize)]
struct NodeSummary<'a> {
    #[serde(flatten)]
    node: &'a profiler_lib::NodeProfile,
    tier: Option<profiler_lib::NodeTier>,
    ridge_point: Option<f64>,
}

/// List the node profiles of a measurement directory
pub async fn list_nodes(dir: &Path, format: OutputFormat) -> Result<()> {
    let nodes = load_node_profiles(dir).await?;
    let tiers = assign_tiers(&nodes);

    match format {
        OutputFormat::Json => {
            let summaries: Vec<NodeSummary> = nodes
                .iter()
                .map(|n| NodeSummary {
                    node: n,
                    tier: tiers.get(&n.hostname).copied(),
                    ridge_point: n.ridge_point().ok(),
                })
                .collect();
            print_json(&summaries)?;
        }
        OutputFormat::Table => {
            let rows: Vec<NodeRow> = nodes
                .iter()
                .map(|n| NodeRow {
                    hostname: n.hostname.clone(),
                    tier: tiers
                        .get(&n.hostname)
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    peak_gflops: format_optional(n.peak_gflops, 2),
                    memory_bandwidth: format_optional(n.memory_bandwidth_gbps, 2),
                    network_bandwidth: format_optional(n.network_bandwidth_mbps, 1),
                    ridge_point: format_optional(n.ridge_point().ok(), 3),
                    cpu: match (&n.cpu_model, n.cpu_cores) {
                        (Some(model), Some(cores)) => format!("{} ({} cores)", model, cores),
                        (Some(model), None) => model.clone(),
                        (None, Some(cores)) => format!("{} cores", cores),
                        (None, None) => "-".to_string(),
                    },
                })
                .collect();
            print_table(rows, "No node profiles found");
        }
    }
    Ok(())
}
