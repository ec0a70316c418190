//! Tool Profiler - batch alpha estimation
//!
//! Reads node benchmarks and tool execution times from a measurement
//! directory and writes one `profile_<runtime>.yaml` per runtime.

use anyhow::Result;
use profiler_lib::ProfileRun;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting tool-profiler");

    let config = config::ProfilerConfig::load()?;
    info!(
        node_name = %config.node_name,
        input_dir = %config.input_dir.display(),
        output_dir = %config.output_dir.display(),
        "Profiler configured"
    );

    let run = ProfileRun::new(config.run_config());
    let summary = run.execute().await?;

    for runtime in &summary.runtimes {
        info!(
            runtime = %runtime.runtime,
            path = %runtime.path.display(),
            total_tools = runtime.total_tools,
            unmeasured_tools = runtime.unmeasured_tools,
            omissions = runtime.omissions,
            "Runtime profiled"
        );
    }
    info!(nodes = summary.nodes, runtimes = summary.runtimes.len(), "Done");

    Ok(())
}
