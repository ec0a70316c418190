//! Tool Alpha Profiler CLI
//!
//! A command-line tool for scoring single measurements and inspecting node
//! benchmarks and generated tool profiles.

mod commands;
mod config;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{classify, nodes, profiles};
use profiler_lib::classifier::SIGMOID_STEEPNESS;
use profiler_lib::BoundClass;
use tracing::Level;

/// Tool Alpha Profiler CLI
#[derive(Parser)]
#[command(name = "alpha")]
#[command(author, version, about = "CLI for the Tool Alpha Profiler", long_about = None)]
pub struct Cli {
    /// Output format (can also be set via ALPHA_FORMAT env var)
    #[arg(long, short, global = true, env = "ALPHA_FORMAT")]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute alpha for a single measurement
    #[command(subcommand)]
    Classify(ClassifyCommands),

    /// Show node profiles from a measurement directory
    Nodes {
        /// Directory holding node_*.yaml files
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// Show tool profiles from a profile document
    Show {
        /// Path to profile_<runtime>.yaml
        path: PathBuf,

        /// Filter by classification (cpu_bound, mixed, memory_bound)
        #[arg(long)]
        class: Option<BoundClass>,

        /// Show the alpha measured on this node instead of the mean
        #[arg(long)]
        node: Option<String>,
    },

    /// Show alpha distribution and omissions of a profile document
    Summary {
        /// Path to profile_<runtime>.yaml
        path: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ClassifyCommands {
    /// Roofline alpha from operational intensity and ridge point
    #[command(allow_negative_numbers = true)]
    Local {
        /// Operational intensity in FLOPs/byte
        #[arg(long)]
        oi: f64,

        /// Node ridge point in FLOPs/byte
        #[arg(long)]
        ridge: f64,

        /// Sigmoid steepness
        #[arg(long, default_value_t = SIGMOID_STEEPNESS)]
        steepness: f64,
    },

    /// Communication-ratio alpha from execution time and payload sizes
    #[command(allow_negative_numbers = true)]
    Network {
        /// Measured execution time in seconds
        #[arg(long)]
        t_exec: f64,

        /// Input payload in bytes
        #[arg(long, default_value_t = 0)]
        input_bytes: u64,

        /// Output payload in bytes
        #[arg(long, default_value_t = 0)]
        output_bytes: u64,

        /// Link bandwidth in Mbit/s
        #[arg(long, conflicts_with = "bandwidth_bytes", required_unless_present = "bandwidth_bytes")]
        bandwidth_mbps: Option<f64>,

        /// Link bandwidth in bytes/s
        #[arg(long)]
        bandwidth_bytes: Option<f64>,

        /// Fixed latency in seconds
        #[arg(long, default_value_t = 0.0)]
        latency: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr so JSON output stays clean
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let format = config::resolve_format(cli.format);

    // Execute command
    match cli.command {
        Commands::Classify(classify_cmd) => match classify_cmd {
            ClassifyCommands::Local {
                oi,
                ridge,
                steepness,
            } => {
                classify::classify_local_cmd(oi, ridge, steepness, format)?;
            }
            ClassifyCommands::Network {
                t_exec,
                input_bytes,
                output_bytes,
                bandwidth_mbps,
                bandwidth_bytes,
                latency,
            } => {
                classify::classify_network_cmd(
                    t_exec,
                    input_bytes,
                    output_bytes,
                    bandwidth_mbps,
                    bandwidth_bytes,
                    latency,
                    format,
                )?;
            }
        },
        Commands::Nodes { dir } => {
            nodes::list_nodes(&dir, format).await?;
        }
        Commands::Show { path, class, node } => {
            profiles::show_profiles(&path, class, node, format).await?;
        }
        Commands::Summary { path } => {
            profiles::show_summary(&path, format).await?;
        }
    }

    Ok(())
}
