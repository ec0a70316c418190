//! Domain errors for alpha computation
//!
//! Every variant is local to a single (tool, node) pairing or a single node.
//! Callers record them as omissions and keep going; nothing here aborts a
//! whole profiling run.

use serde::{Deserialize, Serialize};

/// Errors raised while validating measurements or evaluating the formulas.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileError {
    #[error("node {node} is missing capability `{field}`")]
    MissingCapability { node: String, field: &'static str },

    #[error("invalid measurement for {tool} on {node}: {reason}")]
    InvalidMeasurement {
        tool: String,
        node: String,
        reason: String,
    },

    #[error("operational intensity and ridge point must be positive (oi={oi}, ridge={ridge})")]
    InvalidOperationalIntensity { oi: f64, ridge: f64 },

    #[error("sigmoid steepness must be positive and finite, got {0}")]
    InvalidSteepness(f64),

    #[error("bandwidth must be positive, got {0} bytes/s")]
    InvalidBandwidth(f64),

    #[error("execution time must be positive, got {0}s")]
    InvalidExecutionTime(f64),

    #[error("record for {tool} references unknown node {node}")]
    UnknownNode { tool: String, node: String },

    #[error("tool {tool} has no valid node measurements")]
    NoValidMeasurements { tool: String },
}

impl ProfileError {
    /// Attach the (tool, node) pairing to a measurement error raised by a
    /// context-free formula.
    pub fn for_pairing(self, tool: &str, node: &str) -> Self {
        match self {
            Self::InvalidMeasurement { reason, .. } => Self::InvalidMeasurement {
                tool: tool.to_string(),
                node: node.to_string(),
                reason,
            },
            other => other,
        }
    }

    /// Short machine-readable reason, used as a metric label and in the
    /// omissions list of the output document.
    pub fn kind(&self) -> OmissionReason {
        match self {
            Self::MissingCapability { .. } => OmissionReason::MissingCapability,
            Self::InvalidMeasurement { .. } => OmissionReason::InvalidMeasurement,
            Self::InvalidOperationalIntensity { .. } => {
                OmissionReason::InvalidOperationalIntensity
            }
            Self::InvalidSteepness(_) => OmissionReason::InvalidSteepness,
            Self::InvalidBandwidth(_) => OmissionReason::InvalidBandwidth,
            Self::InvalidExecutionTime(_) => OmissionReason::InvalidExecutionTime,
            Self::UnknownNode { .. } => OmissionReason::UnknownNode,
            Self::NoValidMeasurements { .. } => OmissionReason::NoValidMeasurements,
        }
    }
}

/// Serializable counterpart of [`ProfileError`] kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OmissionReason {
    MissingCapability,
    InvalidMeasurement,
    InvalidOperationalIntensity,
    InvalidSteepness,
    InvalidBandwidth,
    InvalidExecutionTime,
    UnknownNode,
    NoValidMeasurements,
}

impl OmissionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingCapability => "missing_capability",
            Self::InvalidMeasurement => "invalid_measurement",
            Self::InvalidOperationalIntensity => "invalid_operational_intensity",
            Self::InvalidSteepness => "invalid_steepness",
            Self::InvalidBandwidth => "invalid_bandwidth",
            Self::InvalidExecutionTime => "invalid_execution_time",
            Self::UnknownNode => "unknown_node",
            Self::NoValidMeasurements => "no_valid_measurements",
        }
    }
}

impl std::fmt::Display for OmissionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ProfileError::MissingCapability {
            node: "edge-1".to_string(),
            field: "memory_bandwidth_gbps",
        };
        assert_eq!(
            err.to_string(),
            "node edge-1 is missing capability `memory_bandwidth_gbps`"
        );
        assert_eq!(
            ProfileError::InvalidBandwidth(0.0).to_string(),
            "bandwidth must be positive, got 0 bytes/s"
        );
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            ProfileError::InvalidExecutionTime(-1.0).kind(),
            OmissionReason::InvalidExecutionTime
        );
        assert_eq!(
            ProfileError::NoValidMeasurements { tool: "fetch".into() }
                .kind()
                .as_str(),
            "no_valid_measurements"
        );
    }

    #[test]
    fn test_reason_serializes_snake_case() {
        let json = serde_json::to_string(&OmissionReason::UnknownNode).unwrap();
        assert_eq!(json, "\"unknown_node\"");
    }
}
