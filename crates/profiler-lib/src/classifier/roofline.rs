//! Roofline classification
//!
//! Scores how compute-bound a tool is on a node by comparing its
//! operational intensity with the node ridge point on a log scale:
//! `alpha = sigmoid(k * (ln(OI) - ln(R)))`.

use std::collections::BTreeMap;

use super::{ALPHA_CEILING, SIGMOID_STEEPNESS};
use crate::error::ProfileError;
use crate::models::{NodeProfile, NodeTier};

/// Bytes moved per cache miss when deriving OI from hardware counters
pub const CACHE_LINE_BYTES: u64 = 64;

/// Logistic function, stable for large |x|
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Roofline alpha with the default steepness
pub fn classify_local(oi: f64, ridge_point: f64) -> Result<f64, ProfileError> {
    classify_local_with_steepness(oi, ridge_point, SIGMOID_STEEPNESS)
}

/// Roofline alpha with an explicit steepness.
///
/// The result is kept strictly inside (0, 1) even when the sigmoid
/// saturates in floating point. Steepness must be finite and positive so
/// alpha rises with OI.
pub fn classify_local_with_steepness(
    oi: f64,
    ridge_point: f64,
    steepness: f64,
) -> Result<f64, ProfileError> {
    if !(oi.is_finite() && oi > 0.0 && ridge_point.is_finite() && ridge_point > 0.0) {
        return Err(ProfileError::InvalidOperationalIntensity {
            oi,
            ridge: ridge_point,
        });
    }
    if !(steepness.is_finite() && steepness > 0.0) {
        return Err(ProfileError::InvalidSteepness(steepness));
    }

    let x = steepness * (oi.ln() - ridge_point.ln());
    Ok(sigmoid(x).clamp(f64::MIN_POSITIVE, ALPHA_CEILING))
}

/// Operational intensity from `perf` counters: instructions per byte of
/// cache-line traffic.
pub fn operational_intensity_from_counters(
    instructions: u64,
    cache_misses: u64,
) -> Result<f64, ProfileError> {
    let memory_bytes = cache_misses.saturating_mul(CACHE_LINE_BYTES);
    if instructions == 0 || memory_bytes == 0 {
        return Err(ProfileError::InvalidOperationalIntensity {
            oi: 0.0,
            ridge: 0.0,
        });
    }
    Ok(instructions as f64 / memory_bytes as f64)
}

/// Assign device/edge/cloud tiers by ascending peak compute.
///
/// Nodes without a usable compute figure get no tier.
pub fn assign_tiers(nodes: &[NodeProfile]) -> BTreeMap<String, NodeTier> {
    let mut ranked: Vec<(&str, f64)> = nodes
        .iter()
        .filter_map(|n| {
            n.peak_gflops
                .filter(|g| g.is_finite() && *g > 0.0)
                .map(|g| (n.hostname.as_str(), g))
        })
        .collect();
    ranked.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    let last = ranked.len().saturating_sub(1);
    ranked
        .iter()
        .enumerate()
        .map(|(i, (host, _))| {
            let tier = if i == 0 {
                NodeTier::Device
            } else if i == last && ranked.len() >= 3 {
                NodeTier::Cloud
            } else {
                NodeTier::Edge
            };
            (host.to_string(), tier)
        })
        .collect()
}

/// Averaged roofline capabilities of one tier
#[derive(Debug, Clone, PartialEq)]
pub struct TierSpec {
    /// FLOP/s
    pub peak_flops: f64,
    /// bytes/s
    pub memory_bandwidth: f64,
    /// FLOPs/byte
    pub ridge_point: f64,
}

/// Average the roofline capabilities of each tier.
///
/// Only nodes with both capabilities contribute.
pub fn tier_specs(nodes: &[NodeProfile]) -> BTreeMap<NodeTier, TierSpec> {
    let tiers = assign_tiers(nodes);
    let mut grouped: BTreeMap<NodeTier, Vec<(f64, f64, f64)>> = BTreeMap::new();

    for node in nodes {
        let Some(tier) = tiers.get(&node.hostname) else {
            continue;
        };
        let (Ok(flops), Ok(bw), Ok(ridge)) = (
            node.peak_flops(),
            node.memory_bandwidth_bytes(),
            node.ridge_point(),
        ) else {
            continue;
        };
        grouped.entry(*tier).or_default().push((flops, bw, ridge));
    }

    grouped
        .into_iter()
        .map(|(tier, specs)| {
            let n = specs.len() as f64;
            let spec = TierSpec {
                peak_flops: specs.iter().map(|s| s.0).sum::<f64>() / n,
                memory_bandwidth: specs.iter().map(|s| s.1).sum::<f64>() / n,
                ridge_point: specs.iter().map(|s| s.2).sum::<f64>() / n,
            };
            (tier, spec)
        })
        .collect()
}

/// Relative execution cost of a tool on each tier, min-max normalised to
/// [0, 1] (0 = cheapest tier).
///
/// Cost on a tier is `alpha / peak_flops + (1 - alpha) / memory_bandwidth`.
/// Returns `None` when no tier can be scored; every tier gets 0.5 when all
/// costs are equal.
pub fn estimate_p_comp(
    oi: f64,
    tiers: &BTreeMap<NodeTier, TierSpec>,
    steepness: f64,
) -> Option<BTreeMap<NodeTier, f64>> {
    let costs: BTreeMap<NodeTier, f64> = tiers
        .iter()
        .filter_map(|(tier, spec)| {
            let alpha = classify_local_with_steepness(oi, spec.ridge_point, steepness).ok()?;
            let cost = alpha / spec.peak_flops + (1.0 - alpha) / spec.memory_bandwidth;
            Some((*tier, cost))
        })
        .collect();

    if costs.is_empty() {
        return None;
    }

    let min = costs.values().copied().fold(f64::INFINITY, f64::min);
    let max = costs.values().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    Some(
        costs
            .into_iter()
            .map(|(tier, cost)| {
                let normalized = if span > 0.0 { (cost - min) / span } else { 0.5 };
                (tier, normalized)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn node(host: &str, gflops: Option<f64>, gbps: Option<f64>) -> NodeProfile {
        let mut n = NodeProfile::new(host);
        n.peak_gflops = gflops;
        n.memory_bandwidth_gbps = gbps;
        n
    }

    #[test]
    fn test_sigmoid_midpoint() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert_relative_eq!(sigmoid(2.0) + sigmoid(-2.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sigmoid_extremes_finite() {
        assert!(sigmoid(-1000.0) >= 0.0);
        assert!(sigmoid(1000.0) <= 1.0);
        assert!(!sigmoid(-1000.0).is_nan());
    }

    #[test]
    fn test_equal_intensity_is_half() {
        assert_eq!(classify_local(10.0, 10.0).unwrap(), 0.5);
        assert_eq!(classify_local(0.037, 0.037).unwrap(), 0.5);
    }

    #[test]
    fn test_cpu_bound_scenario() {
        // sigmoid(2 ln 10) = 1 / (1 + 10^-2)
        let alpha = classify_local(100.0, 10.0).unwrap();
        assert_relative_eq!(alpha, 1.0 / 1.01, epsilon = 1e-12);
        assert!(alpha > 0.7);
    }

    #[test]
    fn test_memory_bound_scenario() {
        let alpha = classify_local(1.0, 10.0).unwrap();
        assert_relative_eq!(alpha, 1.0 / 101.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_non_positive() {
        assert!(matches!(
            classify_local(0.0, 10.0),
            Err(ProfileError::InvalidOperationalIntensity { .. })
        ));
        assert!(matches!(
            classify_local(5.0, -1.0),
            Err(ProfileError::InvalidOperationalIntensity { .. })
        ));
        assert!(classify_local(f64::NAN, 1.0).is_err());
        assert!(classify_local(1.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_saturation_stays_open() {
        let high = classify_local(1e300, 1e-300).unwrap();
        assert!(high < 1.0);
        let low = classify_local(1e-300, 1e300).unwrap();
        assert!(low > 0.0);
    }

    #[test]
    fn test_custom_steepness() {
        let gentle = classify_local_with_steepness(100.0, 10.0, 0.5).unwrap();
        let steep = classify_local_with_steepness(100.0, 10.0, 4.0).unwrap();
        assert!(gentle < steep);
    }

    #[test]
    fn test_rejects_invalid_steepness() {
        for k in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 0.0, -2.0] {
            assert!(
                matches!(
                    classify_local_with_steepness(4.0, 2.0, k),
                    Err(ProfileError::InvalidSteepness(_))
                ),
                "steepness {k} accepted"
            );
        }
        assert_eq!(
            ProfileError::InvalidSteepness(-2.0).kind(),
            crate::error::OmissionReason::InvalidSteepness
        );
    }

    #[test]
    fn test_p_comp_invalid_steepness() {
        let nodes = vec![node("solo", Some(10.0), Some(10.0))];
        let specs = tier_specs(&nodes);
        assert!(estimate_p_comp(1.0, &specs, f64::NAN).is_none());
    }

    #[test]
    fn test_oi_from_counters() {
        let oi = operational_intensity_from_counters(6_400, 10).unwrap();
        assert_relative_eq!(oi, 10.0);
        assert!(operational_intensity_from_counters(1_000, 0).is_err());
    }

    #[test]
    fn test_assign_tiers_three_or_more() {
        let nodes = vec![
            node("cloud", Some(500.0), Some(50.0)),
            node("rpi", Some(5.0), Some(4.0)),
            node("nuc-a", Some(80.0), Some(20.0)),
            node("nuc-b", Some(90.0), Some(20.0)),
            node("unknown", None, Some(10.0)),
        ];
        let tiers = assign_tiers(&nodes);
        assert_eq!(tiers.get("rpi"), Some(&NodeTier::Device));
        assert_eq!(tiers.get("nuc-a"), Some(&NodeTier::Edge));
        assert_eq!(tiers.get("nuc-b"), Some(&NodeTier::Edge));
        assert_eq!(tiers.get("cloud"), Some(&NodeTier::Cloud));
        assert!(!tiers.contains_key("unknown"));
    }

    #[test]
    fn test_assign_tiers_small_clusters() {
        let two = vec![node("a", Some(10.0), None), node("b", Some(1.0), None)];
        let tiers = assign_tiers(&two);
        assert_eq!(tiers.get("b"), Some(&NodeTier::Device));
        assert_eq!(tiers.get("a"), Some(&NodeTier::Edge));

        let one = vec![node("solo", Some(10.0), None)];
        assert_eq!(assign_tiers(&one).get("solo"), Some(&NodeTier::Device));
    }

    #[test]
    fn test_tier_specs_average() {
        let nodes = vec![
            node("rpi", Some(5.0), Some(5.0)),
            node("nuc-a", Some(80.0), Some(20.0)),
            node("nuc-b", Some(120.0), Some(20.0)),
            node("cloud", Some(500.0), Some(50.0)),
        ];
        let specs = tier_specs(&nodes);
        let edge = specs.get(&NodeTier::Edge).unwrap();
        assert_relative_eq!(edge.peak_flops, 100e9);
        assert_relative_eq!(edge.memory_bandwidth, 20e9);
        assert_relative_eq!(edge.ridge_point, 5.0);
        assert_relative_eq!(specs.get(&NodeTier::Device).unwrap().ridge_point, 1.0);
    }

    #[test]
    fn test_p_comp_normalized() {
        let nodes = vec![
            node("rpi", Some(5.0), Some(4.0)),
            node("nuc", Some(80.0), Some(20.0)),
            node("cloud", Some(500.0), Some(50.0)),
        ];
        let specs = tier_specs(&nodes);
        let p_comp = estimate_p_comp(8.5, &specs, SIGMOID_STEEPNESS).unwrap();

        assert_eq!(p_comp.len(), 3);
        assert_relative_eq!(*p_comp.get(&NodeTier::Device).unwrap(), 1.0);
        assert_relative_eq!(*p_comp.get(&NodeTier::Cloud).unwrap(), 0.0);
        let edge = *p_comp.get(&NodeTier::Edge).unwrap();
        assert!((0.0..=1.0).contains(&edge));
    }

    #[test]
    fn test_p_comp_single_tier_is_half() {
        let nodes = vec![node("solo", Some(10.0), Some(10.0))];
        let specs = tier_specs(&nodes);
        let p_comp = estimate_p_comp(1.0, &specs, SIGMOID_STEEPNESS).unwrap();
        assert_eq!(p_comp.get(&NodeTier::Device), Some(&0.5));
    }

    #[test]
    fn test_p_comp_invalid_oi() {
        let nodes = vec![node("solo", Some(10.0), Some(10.0))];
        let specs = tier_specs(&nodes);
        assert!(estimate_p_comp(0.0, &specs, SIGMOID_STEEPNESS).is_none());
        assert!(estimate_p_comp(1.0, &BTreeMap::new(), SIGMOID_STEEPNESS).is_none());
    }
}
