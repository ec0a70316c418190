//! Alpha classifiers
//!
//! Two independent scorings map a (tool, node) measurement onto alpha in
//! [0, 1]:
//! - Roofline: sigmoid of operational intensity against the node ridge point
//! - Communication ratio: execution time against estimated transfer time

mod network;
mod roofline;

pub use network::{classify_network, communication_time, NetworkInputs};
pub use roofline::{
    assign_tiers, classify_local, classify_local_with_steepness, estimate_p_comp,
    operational_intensity_from_counters, sigmoid, tier_specs, TierSpec, CACHE_LINE_BYTES,
};

use serde::{Deserialize, Serialize};

/// Steepness of the roofline sigmoid
pub const SIGMOID_STEEPNESS: f64 = 2.0;

/// Alpha above this is CPU-bound
pub const CPU_BOUND_THRESHOLD: f64 = 0.7;

/// Alpha below this is memory/IO-bound
pub const MEMORY_BOUND_THRESHOLD: f64 = 0.3;

/// Largest f64 strictly below 1.0
pub(crate) const ALPHA_CEILING: f64 = 1.0 - f64::EPSILON / 2.0;

/// Downstream classification of an alpha value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundClass {
    CpuBound,
    Mixed,
    MemoryBound,
}

impl BoundClass {
    /// Classify with the fixed policy thresholds
    pub fn from_alpha(alpha: f64) -> Self {
        if alpha > CPU_BOUND_THRESHOLD {
            Self::CpuBound
        } else if alpha < MEMORY_BOUND_THRESHOLD {
            Self::MemoryBound
        } else {
            Self::Mixed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CpuBound => "cpu_bound",
            Self::Mixed => "mixed",
            Self::MemoryBound => "memory_bound",
        }
    }
}

impl std::fmt::Display for BoundClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BoundClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "cpu_bound" | "cpu" => Ok(Self::CpuBound),
            "mixed" => Ok(Self::Mixed),
            "memory_bound" | "memory" | "io_bound" => Ok(Self::MemoryBound),
            other => Err(format!("unknown classification: {}", other)),
        }
    }
}

/// Tunables for the classifiers
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Roofline sigmoid steepness (default: 2.0)
    pub steepness: f64,
    /// Fixed latency added to every transfer estimate, in seconds
    pub network_latency_secs: f64,
    /// Bandwidth assumed for nodes benchmarked without a network figure
    pub default_network_bandwidth_mbps: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            steepness: SIGMOID_STEEPNESS,
            network_latency_secs: 0.0,
            default_network_bandwidth_mbps: 100.0,
        }
    }
}
