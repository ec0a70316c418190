//! Core data models for tool profiling

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::BoundClass;
use crate::error::{OmissionReason, ProfileError};

/// Bits per byte, used when converting link rates
const BITS_PER_BYTE: f64 = 8.0;

/// Where a tool's data lives relative to the node executing it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataLocality {
    LocalData,
    NetworkData,
}

impl DataLocality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalData => "local_data",
            Self::NetworkData => "network_data",
        }
    }
}

impl std::fmt::Display for DataLocality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hardware capabilities of one benchmarked host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeProfile {
    pub hostname: String,
    /// Peak floating point rate in GFLOP/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_gflops: Option<f64>,
    /// Sustained memory bandwidth in GB/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_bandwidth_gbps: Option<f64>,
    /// Network throughput in Mbit/s
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_bandwidth_mbps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_read_iops: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_write_iops: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u32>,
}

impl NodeProfile {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            peak_gflops: None,
            memory_bandwidth_gbps: None,
            network_bandwidth_mbps: None,
            storage_read_iops: None,
            storage_write_iops: None,
            os: None,
            machine: None,
            cpu_model: None,
            cpu_cores: None,
        }
    }

    /// Ridge point in FLOPs per byte.
    ///
    /// GFLOP/s divided by GB/s cancels the 1e9 factors, so the ratio of the
    /// two stored fields is already in FLOPs/byte.
    pub fn ridge_point(&self) -> Result<f64, ProfileError> {
        let peak = self.capability(self.peak_gflops, "peak_gflops")?;
        let bandwidth = self.capability(self.memory_bandwidth_gbps, "memory_bandwidth_gbps")?;
        Ok(peak / bandwidth)
    }

    /// Peak compute rate in FLOP/s
    pub fn peak_flops(&self) -> Result<f64, ProfileError> {
        Ok(self.capability(self.peak_gflops, "peak_gflops")? * 1e9)
    }

    /// Memory bandwidth in bytes/s
    pub fn memory_bandwidth_bytes(&self) -> Result<f64, ProfileError> {
        Ok(self.capability(self.memory_bandwidth_gbps, "memory_bandwidth_gbps")? * 1e9)
    }

    /// Whether both roofline capabilities are present and usable
    pub fn has_roofline(&self) -> bool {
        self.ridge_point().is_ok()
    }

    /// Network bandwidth in bytes/s, using `default_mbps` when the node was
    /// benchmarked without a network figure.
    ///
    /// A value that is present is returned as-is even when non-positive, so
    /// the estimator can reject it.
    pub fn network_bandwidth_bytes(&self, default_mbps: f64) -> f64 {
        mbps_to_bytes_per_sec(self.network_bandwidth_mbps.unwrap_or(default_mbps))
    }

    fn capability(&self, value: Option<f64>, field: &'static str) -> Result<f64, ProfileError> {
        match value {
            Some(v) if v.is_finite() && v > 0.0 => Ok(v),
            _ => Err(ProfileError::MissingCapability {
                node: self.hostname.clone(),
                field,
            }),
        }
    }
}

/// Convert a link rate in Mbit/s to bytes/s
pub fn mbps_to_bytes_per_sec(mbps: f64) -> f64 {
    mbps * 1_000_000.0 / BITS_PER_BYTE
}

/// One measured invocation of a tool on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecutionRecord {
    pub tool_name: String,
    pub node: String,
    pub t_exec_seconds: f64,
    pub input_bytes: i64,
    pub output_bytes: i64,
    pub data_locality: DataLocality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measurements: Vec<f64>,
}

impl ToolExecutionRecord {
    pub fn new(
        tool_name: impl Into<String>,
        node: impl Into<String>,
        t_exec_seconds: f64,
        input_bytes: i64,
        output_bytes: i64,
        data_locality: DataLocality,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            node: node.into(),
            t_exec_seconds,
            input_bytes,
            output_bytes,
            data_locality,
            server: None,
            runs: None,
            measurements: Vec::new(),
        }
    }
}

/// Node tier derived from relative compute capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeTier {
    Device,
    Edge,
    Cloud,
}

impl NodeTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::Edge => "edge",
            Self::Cloud => "cloud",
        }
    }
}

impl std::fmt::Display for NodeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated profile of one tool across all measured nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolProfile {
    pub tool_name: String,
    pub description: String,
    pub data_locality: DataLocality,
    /// Unweighted mean of `alpha_by_node`
    pub alpha: f64,
    pub classification: BoundClass,
    pub alpha_by_node: BTreeMap<String, f64>,
    pub t_exec_by_node: BTreeMap<String, f64>,
    pub avg_input_size_bytes: u64,
    pub avg_output_size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operational_intensity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_comp: Option<BTreeMap<NodeTier, f64>>,
}

/// A (tool, node) pairing, or a whole tool, left out of the profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Omission {
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    pub reason: OmissionReason,
    pub detail: String,
}

impl Omission {
    pub fn from_error(tool: impl Into<String>, node: Option<String>, err: &ProfileError) -> Self {
        Self {
            tool: tool.into(),
            node,
            reason: err.kind(),
            detail: err.to_string(),
        }
    }
}

/// Count of tools per classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlphaDistribution {
    pub cpu_bound: usize,
    pub mixed: usize,
    pub memory_bound: usize,
}

impl AlphaDistribution {
    pub fn from_profiles<'a>(profiles: impl IntoIterator<Item = &'a ToolProfile>) -> Self {
        let mut dist = Self::default();
        for profile in profiles {
            match profile.classification {
                BoundClass::CpuBound => dist.cpu_bound += 1,
                BoundClass::Mixed => dist.mixed += 1,
                BoundClass::MemoryBound => dist.memory_bound += 1,
            }
        }
        dist
    }

    pub fn total(&self) -> usize {
        self.cpu_bound + self.mixed + self.memory_bound
    }
}

/// Run-level information stored next to the profiles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    pub runtime: String,
    pub measured_nodes: Vec<String>,
    pub total_tools: usize,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub unmeasured_tools: Vec<String>,
    #[serde(default)]
    pub omissions: Vec<Omission>,
    #[serde(default)]
    pub distribution: AlphaDistribution,
}

/// The persisted `profile_<runtime>.yaml` artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDocument {
    pub tools: BTreeMap<String, ToolProfile>,
    pub metadata: ProfileMetadata,
}
