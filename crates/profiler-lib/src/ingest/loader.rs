//! Filesystem loading of benchmark and measurement files
//!
//! Layout of an input directory:
//! - `node_<hostname>.yaml` per benchmarked node
//! - `<runtime>_tool_exec_time_<hostname>.json` per (runtime, node)
//! - `tool_oi_measurements.json`, optional

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::{NodeSpecFile, OiMeasurement, RawExecutionRecord};
use crate::catalog::ToolCatalog;
use crate::error::ProfileError;
use crate::models::{NodeProfile, ToolExecutionRecord};

/// Prefix of node benchmark files
pub const NODE_FILE_PREFIX: &str = "node_";

/// Separator between runtime label and hostname in execution files
pub const EXEC_FILE_MARKER: &str = "_tool_exec_time_";

/// One execution-time file discovered on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecFile {
    pub runtime: String,
    pub hostname: String,
    pub path: PathBuf,
}

/// Records read from execution files, with the entries that could not be
/// turned into a record
#[derive(Debug, Clone, Default)]
pub struct LoadedRecords {
    pub records: Vec<ToolExecutionRecord>,
    pub rejected: Vec<ProfileError>,
}

impl LoadedRecords {
    pub fn extend(&mut self, other: LoadedRecords) {
        self.records.extend(other.records);
        self.rejected.extend(other.rejected);
    }
}

impl From<Vec<ToolExecutionRecord>> for LoadedRecords {
    fn from(records: Vec<ToolExecutionRecord>) -> Self {
        Self {
            records,
            rejected: Vec::new(),
        }
    }
}

/// Split `<runtime>_tool_exec_time_<hostname>.json` into its parts
pub fn parse_exec_file_name(file_name: &str) -> Option<(String, String)> {
    let stem = file_name.strip_suffix(".json")?;
    let (runtime, hostname) = stem.split_once(EXEC_FILE_MARKER)?;
    if runtime.is_empty() || hostname.is_empty() {
        return None;
    }
    Some((runtime.to_string(), hostname.to_string()))
}

async fn list_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read directory {}", dir.display()))?;

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            files.push((name.to_string(), entry.path()));
        }
    }
    files.sort();
    Ok(files)
}

async fn read_node_file(path: PathBuf) -> Result<NodeProfile> {
    let content = fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let spec: NodeSpecFile = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse node file {}", path.display()))?;
    Ok(spec.into_profile())
}

/// Load every `node_*.yaml` in `dir`, reading files concurrently.
///
/// Files that fail to parse are skipped with a warning; the result is
/// ordered by hostname.
pub async fn load_node_profiles(dir: &Path) -> Result<Vec<NodeProfile>> {
    let mut tasks = JoinSet::new();
    for (name, path) in list_files(dir).await? {
        let is_yaml = name.ends_with(".yaml") || name.ends_with(".yml");
        if name.starts_with(NODE_FILE_PREFIX) && is_yaml {
            tasks.spawn(read_node_file(path));
        }
    }

    let mut nodes = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined.context("Node loading task panicked")? {
            Ok(node) => {
                debug!(node = %node.hostname, "Loaded node profile");
                nodes.push(node);
            }
            Err(e) => warn!(error = %format!("{:#}", e), "Skipping unreadable node file"),
        }
    }
    nodes.sort_by(|a, b| a.hostname.cmp(&b.hostname));
    Ok(nodes)
}

/// Group execution-time files by runtime label
pub async fn discover_exec_files(dir: &Path) -> Result<BTreeMap<String, Vec<ExecFile>>> {
    let mut grouped: BTreeMap<String, Vec<ExecFile>> = BTreeMap::new();
    for (name, path) in list_files(dir).await? {
        if let Some((runtime, hostname)) = parse_exec_file_name(&name) {
            grouped.entry(runtime.clone()).or_default().push(ExecFile {
                runtime,
                hostname,
                path,
            });
        }
    }
    Ok(grouped)
}

/// Load one execution-time file, resolving missing node and locality fields.
///
/// Each entry is converted on its own: an entry of the wrong shape becomes
/// an `InvalidMeasurement` rejection for its (tool, node) pairing. Entries
/// without a tool name cannot be attributed and are skipped with a warning.
/// Only an unreadable file or a file that is not a JSON array is an error.
pub async fn load_exec_records(file: &ExecFile, catalog: &ToolCatalog) -> Result<LoadedRecords> {
    let content = fs::read_to_string(&file.path)
        .await
        .with_context(|| format!("Failed to read {}", file.path.display()))?;
    let entries: Vec<serde_json::Value> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse execution file {}", file.path.display()))?;

    let mut loaded = LoadedRecords::default();
    for (index, entry) in entries.into_iter().enumerate() {
        let tool = entry.get("tool_name").and_then(|v| v.as_str()).map(str::to_string);
        let Some(tool) = tool else {
            warn!(
                path = %file.path.display(),
                index,
                "Skipping execution record without tool_name"
            );
            continue;
        };
        let node = entry
            .get("node")
            .and_then(|v| v.as_str())
            .unwrap_or(file.hostname.as_str())
            .to_string();

        let resolved = serde_json::from_value::<RawExecutionRecord>(entry)
            .map_err(|e| ProfileError::InvalidMeasurement {
                tool,
                node,
                reason: format!("malformed record: {}", e),
            })
            .and_then(|raw| raw.resolve(&file.hostname, catalog));
        match resolved {
            Ok(record) => loaded.records.push(record),
            Err(err) => loaded.rejected.push(err),
        }
    }
    Ok(loaded)
}

/// Load operational intensities; a missing file yields an empty list
pub async fn load_oi_measurements(path: &Path) -> Result<Vec<OiMeasurement>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "No operational intensity file");
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse operational intensity file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataLocality;
    use tempfile::TempDir;

    #[test]
    fn test_parse_exec_file_name() {
        assert_eq!(
            parse_exec_file_name("native_tool_exec_time_device-rpi.json"),
            Some(("native".to_string(), "device-rpi".to_string()))
        );
        assert_eq!(
            parse_exec_file_name("wasm_tool_exec_time_edge_nuc.json"),
            Some(("wasm".to_string(), "edge_nuc".to_string()))
        );
        assert_eq!(parse_exec_file_name("native_tool_exec_time_.json"), None);
        assert_eq!(parse_exec_file_name("tool_oi_measurements.json"), None);
        assert_eq!(parse_exec_file_name("native_tool_exec_time_rpi.yaml"), None);
    }

    #[tokio::test]
    async fn test_load_node_profiles() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("node_device-rpi.yaml"),
            "hostname: device-rpi\npeak_gflops: 8.0\nmemory_bandwidth_gibps: 3.5\nnetwork_bandwidth_mbps: 94.2\n",
        )
        .await
        .unwrap();
        fs::write(
            dir.path().join("node_cloud.yaml"),
            "hostname: cloud\npeak_gflops: 900.0\nmemory_bandwidth_gbps: 80.0\n",
        )
        .await
        .unwrap();
        fs::write(dir.path().join("node_broken.yaml"), "hostname: [")
            .await
            .unwrap();
        fs::write(dir.path().join("notes.yaml"), "hostname: ignored\n")
            .await
            .unwrap();

        let nodes = load_node_profiles(dir.path()).await.unwrap();
        let hosts: Vec<_> = nodes.iter().map(|n| n.hostname.as_str()).collect();
        assert_eq!(hosts, vec!["cloud", "device-rpi"]);
        assert!(nodes[1].memory_bandwidth_gbps.unwrap() > 3.5);
    }

    #[tokio::test]
    async fn test_discover_and_load_exec_files() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("native_tool_exec_time_device-rpi.json"),
            r#"[{"tool_name": "fetch", "t_exec": 0.2, "input_size": 300, "output_size": 9000}]"#,
        )
        .await
        .unwrap();
        fs::write(dir.path().join("wasm_tool_exec_time_device-rpi.json"), "[]")
            .await
            .unwrap();
        fs::write(dir.path().join("tool_oi_measurements.json"), "[]")
            .await
            .unwrap();

        let grouped = discover_exec_files(dir.path()).await.unwrap();
        assert_eq!(grouped.keys().collect::<Vec<_>>(), vec!["native", "wasm"]);

        let file = &grouped["native"][0];
        let loaded = load_exec_records(file, &ToolCatalog::builtin()).await.unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert!(loaded.rejected.is_empty());
        assert_eq!(loaded.records[0].node, "device-rpi");
        assert_eq!(loaded.records[0].data_locality, DataLocality::NetworkData);
    }

    fn exec_file(dir: &TempDir, name: &str) -> ExecFile {
        let (runtime, hostname) = parse_exec_file_name(name).unwrap();
        ExecFile {
            runtime,
            hostname,
            path: dir.path().join(name),
        }
    }

    #[tokio::test]
    async fn test_load_exec_records_rejects_malformed_file() {
        let dir = TempDir::new().unwrap();
        let file = exec_file(&dir, "native_tool_exec_time_rpi.json");
        fs::write(&file.path, "{not json").await.unwrap();
        assert!(load_exec_records(&file, &ToolCatalog::builtin()).await.is_err());

        fs::write(&file.path, r#"{"tool_name": "fetch"}"#).await.unwrap();
        assert!(load_exec_records(&file, &ToolCatalog::builtin()).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_record_rejected_alone() {
        let dir = TempDir::new().unwrap();
        let file = exec_file(&dir, "native_tool_exec_time_rpi.json");
        fs::write(
            &file.path,
            r#"[
                {"tool_name": "fetch", "t_exec": 0.2, "input_size": 300, "output_size": 9000},
                {"tool_name": "summarize", "t_exec": null, "input_size": 10},
                {"tool_name": "git_status", "t_exec": 0.1, "input_size": 1.5},
                {"t_exec": 0.3}
            ]"#,
        )
        .await
        .unwrap();

        let loaded = load_exec_records(&file, &ToolCatalog::builtin()).await.unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].tool_name, "fetch");

        let rejected: Vec<_> = loaded
            .rejected
            .iter()
            .map(|e| match e {
                ProfileError::InvalidMeasurement { tool, node, .. } => (tool.as_str(), node.as_str()),
                other => panic!("unexpected rejection {other:?}"),
            })
            .collect();
        assert_eq!(rejected, vec![("summarize", "rpi"), ("git_status", "rpi")]);
    }

    #[tokio::test]
    async fn test_load_http_exec_file() {
        let dir = TempDir::new().unwrap();
        let file = exec_file(&dir, "http_tool_exec_time_rpi.json");
        fs::write(
            &file.path,
            r#"[{"tool_name": "fetch", "server": "fetch", "t_exec_ms": 12.0, "input_size": 256,
                 "output_size": 10240, "runs": 3, "measurements_ms": [11.0, 12.0, 13.0],
                 "transport": "http"}]"#,
        )
        .await
        .unwrap();

        let loaded = load_exec_records(&file, &ToolCatalog::builtin()).await.unwrap();
        assert_eq!(file.runtime, "http");
        assert_eq!(loaded.records.len(), 1);
        assert!((loaded.records[0].t_exec_seconds - 0.012).abs() < 1e-15);
        assert_eq!(loaded.records[0].measurements.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_oi_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let oi = load_oi_measurements(&dir.path().join("tool_oi_measurements.json"))
            .await
            .unwrap();
        assert!(oi.is_empty());
    }

    #[tokio::test]
    async fn test_load_oi_measurements() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tool_oi_measurements.json");
        fs::write(
            &path,
            r#"[{"tool_name": "resize_image", "server": "image_resize", "operational_intensity": 8.5, "runs": 3}]"#,
        )
        .await
        .unwrap();
        let oi = load_oi_measurements(&path).await.unwrap();
        assert_eq!(oi.len(), 1);
        assert_eq!(oi[0].operational_intensity, 8.5);
    }
}
