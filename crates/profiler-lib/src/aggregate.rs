//! Aggregation of per-node alphas into tool profiles
//!
//! Each valid (tool, node) record is scored on the path its data locality
//! selects, then the per-node scores are folded into one [`ToolProfile`]
//! with an unweighted mean.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;

use crate::catalog::ToolCatalog;
use crate::classifier::{
    classify_local_with_steepness, classify_network, estimate_p_comp, tier_specs, BoundClass,
    ClassifierConfig, TierSpec,
};
use crate::error::ProfileError;
use crate::ingest::MeasurementSet;
use crate::models::{
    AlphaDistribution, DataLocality, NodeProfile, NodeTier, Omission, ProfileDocument,
    ProfileMetadata, ToolExecutionRecord, ToolProfile,
};

/// Alpha and payload figures of one tool on one node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeScore {
    pub node: String,
    pub alpha: f64,
    pub t_exec: f64,
    pub input_bytes: u64,
    pub output_bytes: u64,
}

/// Fold per-node scores into a profile.
///
/// A later score for the same node replaces an earlier one. Fails with
/// `NoValidMeasurements` when there is nothing to aggregate.
pub fn build_profile(
    tool_name: &str,
    description: &str,
    data_locality: DataLocality,
    per_node: &[NodeScore],
) -> Result<ToolProfile, ProfileError> {
    let mut by_node: BTreeMap<&str, &NodeScore> = BTreeMap::new();
    for score in per_node {
        if !(score.alpha.is_finite() && (0.0..=1.0).contains(&score.alpha)) {
            return Err(ProfileError::InvalidMeasurement {
                tool: tool_name.to_string(),
                node: score.node.clone(),
                reason: format!("alpha {} outside [0, 1]", score.alpha),
            });
        }
        by_node.insert(score.node.as_str(), score);
    }

    if by_node.is_empty() {
        return Err(ProfileError::NoValidMeasurements {
            tool: tool_name.to_string(),
        });
    }

    let n = by_node.len() as f64;
    let alpha = by_node.values().map(|s| s.alpha).sum::<f64>() / n;
    let avg_input = by_node.values().map(|s| s.input_bytes as f64).sum::<f64>() / n;
    let avg_output = by_node.values().map(|s| s.output_bytes as f64).sum::<f64>() / n;

    Ok(ToolProfile {
        tool_name: tool_name.to_string(),
        description: description.to_string(),
        data_locality,
        alpha,
        classification: BoundClass::from_alpha(alpha),
        alpha_by_node: by_node
            .iter()
            .map(|(node, s)| (node.to_string(), s.alpha))
            .collect(),
        t_exec_by_node: by_node
            .iter()
            .map(|(node, s)| (node.to_string(), s.t_exec))
            .collect(),
        avg_input_size_bytes: avg_input as u64,
        avg_output_size_bytes: avg_output as u64,
        operational_intensity: None,
        p_comp: None,
    })
}

/// Turns a [`MeasurementSet`] into a [`ProfileDocument`]
pub struct ProfileBuilder {
    config: ClassifierConfig,
    catalog: ToolCatalog,
}

impl ProfileBuilder {
    pub fn new(config: ClassifierConfig, catalog: ToolCatalog) -> Self {
        Self { config, catalog }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Score one record on the path selected by `locality`
    pub fn score(
        &self,
        node: &NodeProfile,
        record: &ToolExecutionRecord,
        locality: DataLocality,
        operational_intensity: Option<f64>,
    ) -> Result<NodeScore, ProfileError> {
        let alpha = match (locality, operational_intensity) {
            (DataLocality::LocalData, Some(oi)) => {
                let ridge = node.ridge_point()?;
                classify_local_with_steepness(oi, ridge, self.config.steepness)?
            }
            _ => {
                let bandwidth =
                    node.network_bandwidth_bytes(self.config.default_network_bandwidth_mbps);
                classify_network(
                    record.t_exec_seconds,
                    record.input_bytes as f64,
                    record.output_bytes as f64,
                    bandwidth,
                    self.config.network_latency_secs,
                )
                .map_err(|e| e.for_pairing(&record.tool_name, &record.node))?
            }
        };

        Ok(NodeScore {
            node: record.node.clone(),
            alpha,
            t_exec: record.t_exec_seconds,
            input_bytes: record.input_bytes.max(0) as u64,
            output_bytes: record.output_bytes.max(0) as u64,
        })
    }

    /// Profile every measured tool of one runtime
    pub fn build(&self, set: &MeasurementSet, runtime: &str) -> ProfileDocument {
        let nodes: Vec<NodeProfile> = set.nodes().cloned().collect();
        let tiers = tier_specs(&nodes);
        let mut omissions: Vec<Omission> = set.omissions().to_vec();
        let mut tools = BTreeMap::new();

        for tool in set.measured_tools() {
            match self.build_tool(set, tool, &tiers, &mut omissions) {
                Ok(profile) => {
                    tools.insert(tool.to_string(), profile);
                }
                Err(err) => omissions.push(Omission::from_error(tool, None, &err)),
            }
        }

        let measured_nodes: BTreeSet<String> = tools
            .values()
            .flat_map(|p: &ToolProfile| p.alpha_by_node.keys().cloned())
            .collect();

        let mut unmeasured: BTreeSet<String> = self
            .catalog
            .tools()
            .iter()
            .map(|t| t.name.to_string())
            .collect();
        unmeasured.extend(set.seen_tools().iter().cloned());
        unmeasured.retain(|t| !tools.contains_key(t));

        let distribution = AlphaDistribution::from_profiles(tools.values());

        ProfileDocument {
            metadata: ProfileMetadata {
                runtime: runtime.to_string(),
                measured_nodes: measured_nodes.into_iter().collect(),
                total_tools: tools.len(),
                generated_at: Utc::now(),
                unmeasured_tools: unmeasured.into_iter().collect(),
                omissions,
                distribution,
            },
            tools,
        }
    }

    fn build_tool(
        &self,
        set: &MeasurementSet,
        tool: &str,
        tiers: &BTreeMap<NodeTier, TierSpec>,
        omissions: &mut Vec<Omission>,
    ) -> Result<ToolProfile, ProfileError> {
        let records: Vec<&ToolExecutionRecord> = set.records_for(tool).collect();
        let locality = records
            .first()
            .map(|r| r.data_locality)
            .unwrap_or_else(|| self.catalog.data_locality(tool));
        let oi = set.operational_intensity(tool);

        let mut scores = Vec::with_capacity(records.len());
        for record in records {
            let scored = match set.node(&record.node) {
                Some(node) => self.score(node, record, locality, oi),
                None => Err(ProfileError::UnknownNode {
                    tool: tool.to_string(),
                    node: record.node.clone(),
                }),
            };
            match scored {
                Ok(score) => scores.push(score),
                Err(err) => omissions.push(Omission::from_error(tool, Some(record.node.clone()), &err)),
            }
        }

        let mut profile = build_profile(tool, self.catalog.description(tool), locality, &scores)?;
        profile.operational_intensity = oi;
        profile.p_comp = oi.and_then(|oi| estimate_p_comp(oi, tiers, self.config.steepness));
        Ok(profile)
    }
}

impl Default for ProfileBuilder {
    fn default() -> Self {
        Self::new(ClassifierConfig::default(), ToolCatalog::builtin())
    }
}
