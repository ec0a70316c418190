//! Communication-ratio estimation
//!
//! For network-facing tools alpha compares the measured execution time with
//! the time it would take to move the same payload over the node's link.

use super::ALPHA_CEILING;
use crate::error::ProfileError;

/// Inputs to [`classify_network`], bundled for callers that build them
/// from records
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkInputs {
    /// Measured execution time in seconds
    pub t_exec: f64,
    /// Input payload in bytes
    pub d_in: f64,
    /// Output payload in bytes
    pub d_out: f64,
    /// Link bandwidth in bytes/s
    pub bandwidth: f64,
    /// Fixed latency in seconds
    pub latency: f64,
}

impl NetworkInputs {
    pub fn classify(&self) -> Result<f64, ProfileError> {
        classify_network(self.t_exec, self.d_in, self.d_out, self.bandwidth, self.latency)
    }
}

/// Reference transfer time `(d_in + d_out) / bandwidth + latency`
pub fn communication_time(
    d_in: f64,
    d_out: f64,
    bandwidth: f64,
    latency: f64,
) -> Result<f64, ProfileError> {
    if !(bandwidth.is_finite() && bandwidth > 0.0) {
        return Err(ProfileError::InvalidBandwidth(bandwidth));
    }
    if !(d_in >= 0.0 && d_out >= 0.0 && latency >= 0.0)
        || !(d_in.is_finite() && d_out.is_finite() && latency.is_finite())
    {
        return Err(ProfileError::InvalidMeasurement {
            tool: String::new(),
            node: String::new(),
            reason: format!(
                "payload and latency must be non-negative (d_in={}, d_out={}, latency={})",
                d_in, d_out, latency
            ),
        });
    }
    Ok((d_in + d_out) / bandwidth + latency)
}

/// Communication-ratio alpha `t_exec / (t_exec + t_comm)`.
///
/// Exactly 1.0 only when there is nothing to transfer and no latency;
/// otherwise inside (0, 1), even when the times are far apart in magnitude.
pub fn classify_network(
    t_exec: f64,
    d_in: f64,
    d_out: f64,
    bandwidth: f64,
    latency: f64,
) -> Result<f64, ProfileError> {
    if !(t_exec.is_finite() && t_exec > 0.0) {
        return Err(ProfileError::InvalidExecutionTime(t_exec));
    }
    let t_comm = communication_time(d_in, d_out, bandwidth, latency)?;

    if d_in + d_out == 0.0 && latency == 0.0 {
        return Ok(1.0);
    }

    // t_exec near f64::MAX must not overflow the denominator
    let alpha = 1.0 / (1.0 + t_comm / t_exec);
    Ok(alpha.clamp(f64::MIN_POSITIVE, ALPHA_CEILING))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mixed_scenario() {
        let t_comm = communication_time(256.0, 10240.0, 1_000_000.0, 0.0).unwrap();
        assert_relative_eq!(t_comm, 0.010496, epsilon = 1e-12);

        let alpha = classify_network(0.012, 256.0, 10240.0, 1_000_000.0, 0.0).unwrap();
        assert_relative_eq!(alpha, 0.012 / 0.022496, epsilon = 1e-12);
        assert!((0.3..=0.7).contains(&alpha));
    }

    #[test]
    fn test_zero_communication_is_one() {
        assert_eq!(classify_network(0.5, 0.0, 0.0, 1e6, 0.0).unwrap(), 1.0);
    }

    #[test]
    fn test_latency_only_below_one() {
        let alpha = classify_network(0.5, 0.0, 0.0, 1e6, 0.5).unwrap();
        assert_relative_eq!(alpha, 0.5);
    }

    #[test]
    fn test_tiny_transfer_still_below_one() {
        let alpha = classify_network(1.0, 1.0, 0.0, 1e300, 0.0).unwrap();
        assert!(alpha < 1.0);
    }

    #[test]
    fn test_extreme_magnitudes_stay_open() {
        let huge_exec = classify_network(f64::MAX, 1e6, 1e6, 1.0, 0.0).unwrap();
        assert!(huge_exec > 0.0 && huge_exec < 1.0);

        let huge_transfer = classify_network(f64::MIN_POSITIVE, 1e300, 1e300, 1e-300, 0.0).unwrap();
        assert!(huge_transfer > 0.0);
    }

    #[test]
    fn test_invalid_bandwidth() {
        assert_eq!(
            classify_network(0.1, 10.0, 10.0, 0.0, 0.0),
            Err(ProfileError::InvalidBandwidth(0.0))
        );
        assert!(matches!(
            classify_network(0.1, 10.0, 10.0, -5.0, 0.0),
            Err(ProfileError::InvalidBandwidth(_))
        ));
    }

    #[test]
    fn test_invalid_execution_time() {
        assert_eq!(
            classify_network(0.0, 10.0, 10.0, 1e6, 0.0),
            Err(ProfileError::InvalidExecutionTime(0.0))
        );
        assert!(matches!(
            classify_network(-1.0, 10.0, 10.0, 1e6, 0.0),
            Err(ProfileError::InvalidExecutionTime(_))
        ));
    }

    #[test]
    fn test_negative_payload_rejected() {
        assert!(matches!(
            classify_network(0.1, -1.0, 10.0, 1e6, 0.0),
            Err(ProfileError::InvalidMeasurement { .. })
        ));
        assert!(matches!(
            classify_network(0.1, 1.0, 10.0, 1e6, -0.1),
            Err(ProfileError::InvalidMeasurement { .. })
        ));
    }

    #[test]
    fn test_inputs_struct() {
        let inputs = NetworkInputs {
            t_exec: 0.012,
            d_in: 256.0,
            d_out: 10240.0,
            bandwidth: 1_000_000.0,
            latency: 0.0,
        };
        assert_eq!(
            inputs.classify().unwrap(),
            classify_network(0.012, 256.0, 10240.0, 1_000_000.0, 0.0).unwrap()
        );
    }
}
