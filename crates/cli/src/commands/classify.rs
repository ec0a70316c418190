//! Single-input alpha scoring

use anyhow::{bail, Result};
use colored::Colorize;
use profiler_lib::classifier::{classify_local_with_steepness, communication_time};
use profiler_lib::{classify_network, mbps_to_bytes_per_sec, BoundClass};
use serde::Serialize;

use crate::output::{color_class, format_alpha, format_bytes, print_heading, print_json, OutputFormat};

#[derive(Debug, Serialize)]
struct LocalResult {
    mode: &'static str,
    operational_intensity: f64,
    ridge_point: f64,
    steepness: f64,
    alpha: f64,
    classification: BoundClass,
}

#[derive(Debug, Serialize)]
struct NetworkResult {
    mode: &'static str,
    t_exec_seconds: f64,
    input_bytes: u64,
    output_bytes: u64,
    bandwidth_bytes_per_sec: f64,
    latency_secs: f64,
    t_comm_seconds: f64,
    alpha: f64,
    classification: BoundClass,
}

/// Roofline alpha of one (OI, ridge point) pair
pub fn classify_local_cmd(oi: f64, ridge: f64, steepness: f64, format: OutputFormat) -> Result<()> {
    let alpha = classify_local_with_steepness(oi, ridge, steepness)?;
    let result = LocalResult {
        mode: "local",
        operational_intensity: oi,
        ridge_point: ridge,
        steepness,
        alpha,
        classification: BoundClass::from_alpha(alpha),
    };

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_heading("Roofline Classification");
            println!("Operational intensity:  {} FLOPs/byte", result.operational_intensity);
            println!("Ridge point:            {} FLOPs/byte", result.ridge_point);
            println!("Steepness:              {}", result.steepness);
            println!();
            println!("{} {}", "Alpha:".bold(), format_alpha(result.alpha).bold());
            println!("Classification:         {}", color_class(result.classification));
        }
    }
    Ok(())
}

/// Communication-ratio alpha of one measured invocation
pub fn classify_network_cmd(
    t_exec: f64,
    input_bytes: u64,
    output_bytes: u64,
    bandwidth_mbps: Option<f64>,
    bandwidth_bytes: Option<f64>,
    latency: f64,
    format: OutputFormat,
) -> Result<()> {
    let bandwidth = match (bandwidth_mbps, bandwidth_bytes) {
        (Some(mbps), None) => mbps_to_bytes_per_sec(mbps),
        (None, Some(bytes)) => bytes,
        _ => bail!("Exactly one of --bandwidth-mbps or --bandwidth-bytes is required"),
    };

    let d_in = input_bytes as f64;
    let d_out = output_bytes as f64;
    let alpha = classify_network(t_exec, d_in, d_out, bandwidth, latency)?;
    let result = NetworkResult {
        mode: "network",
        t_exec_seconds: t_exec,
        input_bytes,
        output_bytes,
        bandwidth_bytes_per_sec: bandwidth,
        latency_secs: latency,
        t_comm_seconds: communication_time(d_in, d_out, bandwidth, latency)?,
        alpha,
        classification: BoundClass::from_alpha(alpha),
    };

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_heading("Communication-Ratio Classification");
            println!("Execution time:         {}s", result.t_exec_seconds);
            println!(
                "Payload:                {} in / {} out",
                format_bytes(result.input_bytes),
                format_bytes(result.output_bytes)
            );
            println!("Bandwidth:              {} bytes/s", result.bandwidth_bytes_per_sec);
            println!("Latency:                {}s", result.latency_secs);
            println!("Transfer time:          {:.6}s", result.t_comm_seconds);
            println!();
            println!("{} {}", "Alpha:".bold(), format_alpha(result.alpha).bold());
            println!("Classification:         {}", color_class(result.classification));
        }
    }
    Ok(())
}
