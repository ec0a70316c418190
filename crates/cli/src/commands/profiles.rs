//! Profile document inspection

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use profiler_lib::pipeline::read_profile_document;
use profiler_lib::{BoundClass, ToolProfile};
use tabled::Tabled;

use crate::output::{
    color_class, format_alpha, format_bytes, format_optional, print_heading, print_info,
    print_json, print_table, print_warning, OutputFormat,
};

/// Row for tool profiles table
#[derive(Tabled)]
struct ToolRow {
    #[tabled(rename = "Tool")]
    tool: String,
    #[tabled(rename = "Locality")]
    locality: String,
    #[tabled(rename = "Alpha")]
    alpha: String,
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Nodes")]
    nodes: usize,
    #[tabled(rename = "OI")]
    operational_intensity: String,
    #[tabled(rename = "Avg In")]
    avg_input: String,
    #[tabled(rename = "Avg Out")]
    avg_output: String,
}

/// Row for omissions table
#[derive(Tabled)]
struct OmissionRow {
    #[tabled(rename = "Tool")]
    tool: String,
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Reason")]
    reason: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// Alpha shown for a profile: the mean, or one node's value
fn displayed_alpha(profile: &ToolProfile, node: Option<&str>) -> Option<f64> {
    match node {
        Some(host) => profile.alpha_by_node.get(host).copied(),
        None => Some(profile.alpha),
    }
}

/// Profiles matching the filters, with the alpha to display
fn select<'a>(
    profiles: impl IntoIterator<Item = &'a ToolProfile>,
    class: Option<BoundClass>,
    node: Option<&str>,
) -> Vec<(&'a ToolProfile, f64)> {
    profiles
        .into_iter()
        .filter_map(|p| displayed_alpha(p, node).map(|alpha| (p, alpha)))
        .filter(|(_, alpha)| {
            class
                .map(|c| BoundClass::from_alpha(*alpha) == c)
                .unwrap_or(true)
        })
        .collect()
}

/// Show the tool profiles of a document
pub async fn show_profiles(
    path: &Path,
    class: Option<BoundClass>,
    node: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let document = read_profile_document(path).await?;
    let selected = select(document.tools.values(), class, node.as_deref());

    match format {
        OutputFormat::Json => {
            let profiles: Vec<&ToolProfile> = selected.iter().map(|(p, _)| *p).collect();
            print_json(&profiles)?;
        }
        OutputFormat::Table => {
            if let Some(host) = &node {
                print_info(&format!("Showing alpha measured on {}", host.cyan()));
            }
            let rows: Vec<ToolRow> = selected
                .iter()
                .map(|(p, alpha)| ToolRow {
                    tool: p.tool_name.clone(),
                    locality: p.data_locality.to_string(),
                    alpha: format_alpha(*alpha),
                    class: color_class(BoundClass::from_alpha(*alpha)),
                    nodes: p.alpha_by_node.len(),
                    operational_intensity: format_optional(p.operational_intensity, 3),
                    avg_input: format_bytes(p.avg_input_size_bytes),
                    avg_output: format_bytes(p.avg_output_size_bytes),
                })
                .collect();
            print_table(rows, "No matching tool profiles");
        }
    }
    Ok(())
}

/// Show the run metadata of a document
pub async fn show_summary(path: &Path, format: OutputFormat) -> Result<()> {
    let document = read_profile_document(path).await?;
    let meta = &document.metadata;

    match format {
        OutputFormat::Json => print_json(meta)?,
        OutputFormat::Table => {
            print_heading("Profile Summary");
            println!("Runtime:                {}", meta.runtime.cyan());
            println!(
                "Generated:              {}",
                meta.generated_at
                    .format("%Y-%m-%d %H:%M:%S UTC")
                    .to_string()
                    .dimmed()
            );
            println!("Measured nodes:         {}", meta.measured_nodes.join(", "));
            println!("Profiled tools:         {}", meta.total_tools);
            println!();

            println!("{}", "Alpha Distribution".bold());
            println!("{}", "-".repeat(50));
            println!(
                "{:<24}{}",
                format!("{}:", color_class(BoundClass::CpuBound)),
                meta.distribution.cpu_bound
            );
            println!(
                "{:<24}{}",
                format!("{}:", color_class(BoundClass::Mixed)),
                meta.distribution.mixed
            );
            println!(
                "{:<24}{}",
                format!("{}:", color_class(BoundClass::MemoryBound)),
                meta.distribution.memory_bound
            );
            println!();

            if !meta.unmeasured_tools.is_empty() {
                print_warning(&format!(
                    "{} tools without valid measurements: {}",
                    meta.unmeasured_tools.len(),
                    meta.unmeasured_tools.join(", ")
                ));
                println!();
            }

            println!("{}", "Omissions".bold());
            println!("{}", "-".repeat(50));
            let rows: Vec<OmissionRow> = meta
                .omissions
                .iter()
                .map(|o| OmissionRow {
                    tool: o.tool.clone(),
                    node: o.node.clone().unwrap_or_else(|| "-".to_string()),
                    reason: o.reason.to_string(),
                    detail: o.detail.clone(),
                })
                .collect();
            print_table(rows, "No omissions");
        }
    }
    Ok(())
}
