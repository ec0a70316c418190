//! Profiler configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use profiler_lib::{ClassifierConfig, RunConfig};
use serde::Deserialize;

/// Base name of the optional config file (`.toml`, `.yaml` or `.json`)
const CONFIG_FILE: &str = "alpha-profiler";

/// Profiler configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProfilerConfig {
    /// Directory holding node and execution-time files
    #[serde(default = "default_dir")]
    pub input_dir: PathBuf,

    /// Directory receiving `profile_<runtime>.yaml`
    #[serde(default = "default_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_oi_file")]
    pub oi_file: PathBuf,

    /// Used for nodes benchmarked without a network figure
    #[serde(default = "default_network_bandwidth")]
    pub default_network_bandwidth_mbps: f64,

    #[serde(default)]
    pub network_latency_secs: f64,

    #[serde(default = "default_steepness")]
    pub sigmoid_steepness: f64,

    /// Prometheus textfile destination
    #[serde(default)]
    pub metrics_path: Option<PathBuf>,

    #[serde(default = "default_node_name")]
    pub node_name: String,
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_oi_file() -> PathBuf {
    PathBuf::from("tool_oi_measurements.json")
}

fn default_network_bandwidth() -> f64 {
    100.0
}

fn default_steepness() -> f64 {
    profiler_lib::classifier::SIGMOID_STEEPNESS
}

fn default_node_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            input_dir: default_dir(),
            output_dir: default_dir(),
            oi_file: default_oi_file(),
            default_network_bandwidth_mbps: default_network_bandwidth(),
            network_latency_secs: 0.0,
            sigmoid_steepness: default_steepness(),
            metrics_path: None,
            node_name: default_node_name(),
        }
    }
}

impl ProfilerConfig {
    /// Load configuration from the optional config file and `ALPHA_*`
    /// environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix("ALPHA"))
            .build()
            .context("Failed to read profiler configuration")?;

        let parsed: Self = config
            .try_deserialize()
            .context("Invalid profiler configuration")?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> Result<()> {
        if !(self.default_network_bandwidth_mbps.is_finite() && self.default_network_bandwidth_mbps > 0.0) {
            anyhow::bail!(
                "default_network_bandwidth_mbps must be positive, got {}",
                self.default_network_bandwidth_mbps
            );
        }
        if !(self.network_latency_secs.is_finite() && self.network_latency_secs >= 0.0) {
            anyhow::bail!(
                "network_latency_secs must be non-negative, got {}",
                self.network_latency_secs
            );
        }
        if !(self.sigmoid_steepness.is_finite() && self.sigmoid_steepness > 0.0) {
            anyhow::bail!("sigmoid_steepness must be positive, got {}", self.sigmoid_steepness);
        }
        Ok(())
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            oi_file: self.oi_file.clone(),
            classifier: ClassifierConfig {
                steepness: self.sigmoid_steepness,
                network_latency_secs: self.network_latency_secs,
                default_network_bandwidth_mbps: self.default_network_bandwidth_mbps,
            },
            metrics_path: self.metrics_path.clone(),
            node_name: self.node_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProfilerConfig::default();
        assert_eq!(config.input_dir, PathBuf::from("."));
        assert_eq!(config.default_network_bandwidth_mbps, 100.0);
        assert_eq!(config.sigmoid_steepness, 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ProfilerConfig = config::Config::builder()
            .add_source(config::File::from_str(
                "input_dir = \"/data/run\"\nnetwork_latency_secs = 0.002\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.input_dir, PathBuf::from("/data/run"));
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.network_latency_secs, 0.002);

        let run = config.run_config();
        assert_eq!(run.classifier.network_latency_secs, 0.002);
        assert_eq!(run.classifier.default_network_bandwidth_mbps, 100.0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = ProfilerConfig {
            default_network_bandwidth_mbps: 0.0,
            ..ProfilerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ProfilerConfig {
            sigmoid_steepness: -1.0,
            ..ProfilerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
