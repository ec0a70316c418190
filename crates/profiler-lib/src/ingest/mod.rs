//! Measurement ingestion
//!
//! Validates and normalises node benchmark files and tool execution records
//! into a [`MeasurementSet`] ready for classification. Invalid inputs are
//! recorded as omissions and never zeroed.

mod loader;

pub use loader::{
    discover_exec_files, load_exec_records, load_node_profiles, load_oi_measurements,
    parse_exec_file_name, ExecFile, LoadedRecords, EXEC_FILE_MARKER, NODE_FILE_PREFIX,
};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::ToolCatalog;
use crate::error::ProfileError;
use crate::models::{DataLocality, NodeProfile, Omission, ToolExecutionRecord};

/// GiB/s to GB/s
const GIB_TO_GB: f64 = 1.073_741_824;

/// MiB/s to GB/s
const MIB_TO_GB: f64 = 1.048_576 / 1000.0;

/// Node benchmark file as written by the benchmark scripts.
///
/// Memory bandwidth may be reported in GB/s, GiB/s or MiB/s depending on
/// which benchmark produced the file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NodeSpecFile {
    pub hostname: String,
    #[serde(default)]
    pub peak_gflops: Option<f64>,
    #[serde(default)]
    pub memory_bandwidth_gbps: Option<f64>,
    #[serde(default)]
    pub memory_bandwidth_gibps: Option<f64>,
    #[serde(default)]
    pub memory_bandwidth_mibps: Option<f64>,
    #[serde(default)]
    pub network_bandwidth_mbps: Option<f64>,
    #[serde(default)]
    pub storage_read_iops: Option<f64>,
    #[serde(default)]
    pub storage_write_iops: Option<f64>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub machine: Option<String>,
    #[serde(default)]
    pub cpu_model: Option<String>,
    #[serde(default)]
    pub cpu_cores: Option<u32>,
}

impl NodeSpecFile {
    /// Normalise units and produce the immutable node profile
    pub fn into_profile(self) -> NodeProfile {
        let memory_bandwidth_gbps = self
            .memory_bandwidth_gbps
            .or_else(|| self.memory_bandwidth_gibps.map(|v| v * GIB_TO_GB))
            .or_else(|| self.memory_bandwidth_mibps.map(|v| v * MIB_TO_GB));

        NodeProfile {
            hostname: self.hostname,
            peak_gflops: self.peak_gflops,
            memory_bandwidth_gbps,
            network_bandwidth_mbps: self.network_bandwidth_mbps,
            storage_read_iops: self.storage_read_iops,
            storage_write_iops: self.storage_write_iops,
            os: self.os,
            machine: self.machine,
            cpu_model: self.cpu_model,
            cpu_cores: self.cpu_cores,
        }
    }
}

/// Execution record as stored in `<runtime>_tool_exec_time_<host>.json`.
///
/// The HTTP harness reports times in milliseconds (`t_exec_ms`,
/// `measurements_ms`); they are converted to seconds on resolve.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawExecutionRecord {
    pub tool_name: String,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(alias = "t_exec", default)]
    pub t_exec_seconds: Option<f64>,
    #[serde(default)]
    pub t_exec_ms: Option<f64>,
    #[serde(alias = "input_size", default)]
    pub input_bytes: i64,
    #[serde(alias = "output_size", default)]
    pub output_bytes: i64,
    #[serde(default)]
    pub data_locality: Option<DataLocality>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub runs: Option<u32>,
    #[serde(default)]
    pub measurements: Vec<f64>,
    #[serde(default)]
    pub measurements_ms: Vec<f64>,
}

impl RawExecutionRecord {
    /// Fill in the node (from the file name) and locality (from the catalog)
    /// when the record does not carry them, and normalise times to seconds.
    ///
    /// A record without any execution time is rejected.
    pub fn resolve(
        self,
        fallback_node: &str,
        catalog: &ToolCatalog,
    ) -> Result<ToolExecutionRecord, ProfileError> {
        let node = self.node.unwrap_or_else(|| fallback_node.to_string());
        let t_exec_seconds = match (self.t_exec_seconds, self.t_exec_ms) {
            (Some(secs), _) => secs,
            (None, Some(ms)) => ms / 1000.0,
            (None, None) => {
                return Err(ProfileError::InvalidMeasurement {
                    tool: self.tool_name,
                    node,
                    reason: "missing execution time".to_string(),
                })
            }
        };
        let measurements = if self.measurements.is_empty() {
            self.measurements_ms.iter().map(|ms| ms / 1000.0).collect()
        } else {
            self.measurements
        };
        let data_locality = self
            .data_locality
            .unwrap_or_else(|| catalog.data_locality(&self.tool_name));

        Ok(ToolExecutionRecord {
            node,
            data_locality,
            tool_name: self.tool_name,
            t_exec_seconds,
            input_bytes: self.input_bytes,
            output_bytes: self.output_bytes,
            server: self.server,
            runs: self.runs,
            measurements,
        })
    }
}

/// Entry of `tool_oi_measurements.json`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OiMeasurement {
    pub tool_name: String,
    pub operational_intensity: f64,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub runs: Option<u32>,
}

/// Reject records that cannot be normalised
pub fn validate_record(record: &ToolExecutionRecord) -> Result<(), ProfileError> {
    let invalid = |reason: String| ProfileError::InvalidMeasurement {
        tool: record.tool_name.clone(),
        node: record.node.clone(),
        reason,
    };

    if !(record.t_exec_seconds.is_finite() && record.t_exec_seconds > 0.0) {
        return Err(invalid(format!(
            "execution time must be positive, got {}",
            record.t_exec_seconds
        )));
    }
    if record.input_bytes < 0 {
        return Err(invalid(format!("negative input size {}", record.input_bytes)));
    }
    if record.output_bytes < 0 {
        return Err(invalid(format!("negative output size {}", record.output_bytes)));
    }
    Ok(())
}

/// Validated inputs for one profiling pass
#[derive(Debug, Clone, Default)]
pub struct MeasurementSet {
    nodes: BTreeMap<String, NodeProfile>,
    /// tool -> node -> record
    records: BTreeMap<String, BTreeMap<String, ToolExecutionRecord>>,
    /// every tool name seen in the input, valid or not
    seen_tools: Vec<String>,
    operational_intensity: BTreeMap<String, f64>,
    omissions: Vec<Omission>,
}

impl MeasurementSet {
    pub fn new(nodes: impl IntoIterator<Item = NodeProfile>) -> Self {
        let nodes: BTreeMap<String, NodeProfile> = nodes
            .into_iter()
            .map(|n| (n.hostname.clone(), n))
            .collect();
        Self {
            nodes,
            ..Self::default()
        }
    }

    /// Attach operational intensities; non-positive values are ignored so
    /// the tool falls back to communication scoring.
    pub fn with_operational_intensity(
        mut self,
        measurements: impl IntoIterator<Item = OiMeasurement>,
    ) -> Self {
        for m in measurements {
            if m.operational_intensity.is_finite() && m.operational_intensity > 0.0 {
                self.operational_intensity
                    .insert(m.tool_name, m.operational_intensity);
            } else {
                warn!(
                    tool = %m.tool_name,
                    operational_intensity = m.operational_intensity,
                    "Ignoring non-positive operational intensity"
                );
            }
        }
        self
    }

    /// Validate and add one record.
    ///
    /// A rejected record is kept as an omission and the error is returned
    /// for the caller's logging. A second record for the same (tool, node)
    /// replaces the first.
    pub fn add_record(&mut self, record: ToolExecutionRecord) -> Result<(), ProfileError> {
        if !self.seen_tools.contains(&record.tool_name) {
            self.seen_tools.push(record.tool_name.clone());
        }

        let result = if !self.nodes.contains_key(&record.node) {
            Err(ProfileError::UnknownNode {
                tool: record.tool_name.clone(),
                node: record.node.clone(),
            })
        } else {
            validate_record(&record)
        };

        if let Err(err) = result {
            self.omissions.push(Omission::from_error(
                record.tool_name.clone(),
                Some(record.node.clone()),
                &err,
            ));
            return Err(err);
        }

        let previous = self
            .records
            .entry(record.tool_name.clone())
            .or_default()
            .insert(record.node.clone(), record);
        if let Some(prev) = previous {
            debug!(tool = %prev.tool_name, node = %prev.node, "Replacing duplicate record");
        }
        Ok(())
    }

    /// Record a measurement rejected before it could be parsed into a
    /// [`ToolExecutionRecord`]. The tool still counts as seen.
    pub fn add_rejection(&mut self, err: ProfileError) {
        let (tool, node) = match &err {
            ProfileError::InvalidMeasurement { tool, node, .. }
            | ProfileError::UnknownNode { tool, node } => (tool.clone(), Some(node.clone())),
            ProfileError::NoValidMeasurements { tool } => (tool.clone(), None),
            ProfileError::MissingCapability { node, .. } => (String::new(), Some(node.clone())),
            _ => (String::new(), None),
        };
        if !tool.is_empty() && !self.seen_tools.contains(&tool) {
            self.seen_tools.push(tool.clone());
        }
        self.omissions.push(Omission::from_error(tool, node, &err));
    }

    /// Add many records, returning the rejections
    pub fn add_records(
        &mut self,
        records: impl IntoIterator<Item = ToolExecutionRecord>,
    ) -> Vec<ProfileError> {
        records
            .into_iter()
            .filter_map(|r| self.add_record(r).err())
            .collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeProfile> {
        self.nodes.values()
    }

    pub fn node(&self, hostname: &str) -> Option<&NodeProfile> {
        self.nodes.get(hostname)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Ridge point of a node, or why it cannot be computed
    pub fn ridge_point(&self, hostname: &str) -> Result<f64, ProfileError> {
        match self.nodes.get(hostname) {
            Some(node) => node.ridge_point(),
            None => Err(ProfileError::MissingCapability {
                node: hostname.to_string(),
                field: "hostname",
            }),
        }
    }

    /// Nodes excluded from roofline scoring
    pub fn capability_gaps(&self) -> Vec<ProfileError> {
        self.nodes
            .values()
            .filter_map(|n| n.ridge_point().err())
            .collect()
    }

    /// Nodes that will be scored with the default network bandwidth
    pub fn nodes_without_network_bandwidth(&self) -> Vec<&str> {
        self.nodes
            .values()
            .filter(|n| n.network_bandwidth_mbps.is_none())
            .map(|n| n.hostname.as_str())
            .collect()
    }

    /// Every tool with at least one valid record, in name order
    pub fn measured_tools(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Every tool name that appeared in the input, in first-seen order
    pub fn seen_tools(&self) -> &[String] {
        &self.seen_tools
    }

    /// Valid records of a tool, ordered by node
    pub fn records_for(&self, tool: &str) -> impl Iterator<Item = &ToolExecutionRecord> {
        self.records.get(tool).into_iter().flat_map(|m| m.values())
    }

    /// Hosts that contributed at least one valid record
    pub fn measured_nodes(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self
            .records
            .values()
            .flat_map(|m| m.keys().cloned())
            .collect();
        hosts.sort();
        hosts.dedup();
        hosts
    }

    pub fn operational_intensity(&self, tool: &str) -> Option<f64> {
        self.operational_intensity.get(tool).copied()
    }

    pub fn omissions(&self) -> &[Omission] {
        &self.omissions
    }
}
