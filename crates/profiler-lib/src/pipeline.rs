//! Batch profiling run over a measurement directory
//!
//! Loads node profiles, execution records grouped by runtime and optional
//! operational intensities, then writes one `profile_<runtime>.yaml` per
//! runtime.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use tokio::fs;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::aggregate::ProfileBuilder;
use crate::catalog::ToolCatalog;
use crate::classifier::ClassifierConfig;
use crate::error::{OmissionReason, ProfileError};
use crate::ingest::{
    discover_exec_files, load_exec_records, load_node_profiles, load_oi_measurements, ExecFile,
    LoadedRecords, MeasurementSet, OiMeasurement,
};
use crate::models::{AlphaDistribution, NodeProfile, ProfileDocument};
use crate::observability::{ProfilerMetrics, StructuredLogger};

const PROFILER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output file name for a runtime label
pub fn profile_file_name(runtime: &str) -> String {
    format!("profile_{}.yaml", runtime)
}

/// Read a previously written profile document
pub async fn read_profile_document(path: &Path) -> Result<ProfileDocument> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse profile document {}", path.display()))
}

/// Serialize a profile document as YAML, creating parent directories
pub async fn write_profile_document(path: &Path, document: &ProfileDocument) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let yaml = serde_yaml::to_string(document).context("Failed to serialize profile document")?;
    fs::write(path, yaml)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Settings of one batch run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Resolved against `input_dir` when relative
    pub oi_file: PathBuf,
    pub classifier: ClassifierConfig,
    pub metrics_path: Option<PathBuf>,
    /// Label of the host running the profiler, for logs
    pub node_name: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            oi_file: PathBuf::from("tool_oi_measurements.json"),
            classifier: ClassifierConfig::default(),
            metrics_path: None,
            node_name: "unknown".to_string(),
        }
    }
}

impl RunConfig {
    fn oi_path(&self) -> PathBuf {
        if self.oi_file.is_absolute() {
            self.oi_file.clone()
        } else {
            self.input_dir.join(&self.oi_file)
        }
    }
}

/// Outcome of one runtime
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeSummary {
    pub runtime: String,
    pub path: PathBuf,
    pub total_tools: usize,
    pub unmeasured_tools: usize,
    pub omissions: usize,
    pub distribution: AlphaDistribution,
}

/// Outcome of a whole run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub nodes: usize,
    pub runtimes: Vec<RuntimeSummary>,
}

/// Drives one batch run
pub struct ProfileRun {
    config: RunConfig,
    catalog: ToolCatalog,
    builder: ProfileBuilder,
    logger: StructuredLogger,
    metrics: Option<ProfilerMetrics>,
}

impl ProfileRun {
    pub fn new(config: RunConfig) -> Self {
        let catalog = ToolCatalog::builtin();
        let metrics = match ProfilerMetrics::new() {
            Ok(m) => Some(m),
            Err(e) => {
                warn!(error = %e, "Metrics unavailable for this run");
                None
            }
        };
        Self {
            builder: ProfileBuilder::new(config.classifier.clone(), catalog),
            logger: StructuredLogger::new(&config.node_name),
            catalog,
            config,
            metrics,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub async fn execute(&self) -> Result<RunSummary> {
        let started = Instant::now();
        self.logger.log_run_started(
            PROFILER_VERSION,
            &self.config.input_dir.display().to_string(),
            &self.config.output_dir.display().to_string(),
        );

        let result = self.run().await;
        let runtimes = result.as_ref().map(|s| s.runtimes.len()).unwrap_or(0);
        self.logger
            .log_run_finished(runtimes, started.elapsed().as_secs_f64(), result.is_ok());

        let summary = result?;
        self.write_metrics().await?;
        Ok(summary)
    }

    async fn run(&self) -> Result<RunSummary> {
        let nodes = load_node_profiles(&self.config.input_dir).await?;
        if nodes.is_empty() {
            bail!(
                "No node profiles found in {}",
                self.config.input_dir.display()
            );
        }
        self.report_nodes(&nodes);

        let oi = load_oi_measurements(&self.config.oi_path()).await?;
        let exec_files = discover_exec_files(&self.config.input_dir).await?;
        if exec_files.is_empty() {
            warn!(
                input_dir = %self.config.input_dir.display(),
                "No execution-time files found"
            );
        }

        let mut runtimes = Vec::with_capacity(exec_files.len());
        for (runtime, files) in exec_files {
            let started = Instant::now();
            let Some(records) = self.load_runtime_records(&runtime, files).await? else {
                warn!(runtime = %runtime, "Skipping runtime, no readable execution files");
                continue;
            };
            let document = self.profile_runtime(&nodes, &runtime, records, &oi);

            let path = self.config.output_dir.join(profile_file_name(&runtime));
            write_profile_document(&path, &document).await?;
            self.logger.log_profile_written(
                &runtime,
                &path.display().to_string(),
                document.metadata.total_tools,
                &document.metadata.distribution,
            );
            if let Some(metrics) = &self.metrics {
                metrics.observe_profiling_duration(started.elapsed().as_secs_f64());
            }

            runtimes.push(RuntimeSummary {
                runtime,
                path,
                total_tools: document.metadata.total_tools,
                unmeasured_tools: document.metadata.unmeasured_tools.len(),
                omissions: document.metadata.omissions.len(),
                distribution: document.metadata.distribution,
            });
        }

        Ok(RunSummary {
            nodes: nodes.len(),
            runtimes,
        })
    }

    fn report_nodes(&self, nodes: &[NodeProfile]) {
        if let Some(metrics) = &self.metrics {
            metrics.set_nodes_loaded(nodes.len());
        }
        for node in nodes {
            self.logger.log_node_loaded(
                &node.hostname,
                node.peak_gflops,
                node.memory_bandwidth_gbps,
                node.ridge_point().ok(),
            );
            if let Err(ProfileError::MissingCapability { field, .. }) = node.ridge_point() {
                self.logger.log_capability_missing(
                    &node.hostname,
                    field,
                    "excluded from roofline scoring",
                );
            }
            if node.network_bandwidth_mbps.is_none() {
                self.logger.log_capability_missing(
                    &node.hostname,
                    "network_bandwidth_mbps",
                    "using default network bandwidth",
                );
            }
        }
    }

    /// Load every execution file of a runtime. Unreadable files are skipped
    /// with a warning; `None` when none of them could be read.
    async fn load_runtime_records(
        &self,
        runtime: &str,
        files: Vec<ExecFile>,
    ) -> Result<Option<LoadedRecords>> {
        let mut tasks = JoinSet::new();
        for (index, file) in files.into_iter().enumerate() {
            let catalog = self.catalog;
            tasks.spawn(async move {
                let result = load_exec_records(&file, &catalog).await;
                (index, file, result)
            });
        }

        let mut loaded = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (index, file, result) = joined.context("Record loading task panicked")?;
            match result {
                Ok(records) => loaded.push((index, records)),
                Err(e) => warn!(
                    runtime = %runtime,
                    node = %file.hostname,
                    error = %format!("{:#}", e),
                    "Skipping unreadable execution file"
                ),
            }
        }
        if loaded.is_empty() {
            return Ok(None);
        }

        // keep file order so duplicate resolution is deterministic
        loaded.sort_by_key(|(index, _)| *index);
        let mut merged = LoadedRecords::default();
        for (_, records) in loaded {
            merged.extend(records);
        }
        Ok(Some(merged))
    }

    /// Ingest, classify and aggregate the records of one runtime
    pub fn profile_runtime(
        &self,
        nodes: &[NodeProfile],
        runtime: &str,
        records: impl Into<LoadedRecords>,
        oi: &[OiMeasurement],
    ) -> ProfileDocument {
        let LoadedRecords { records, rejected } = records.into();
        let mut set =
            MeasurementSet::new(nodes.iter().cloned()).with_operational_intensity(oi.iter().cloned());
        let malformed = rejected.len();
        for err in rejected {
            set.add_rejection(err);
        }
        let invalid = set.add_records(records);
        debug!(
            runtime = %runtime,
            rejected = invalid.len() + malformed,
            "Records ingested"
        );

        let document = self.builder.build(&set, runtime);

        for omission in &document.metadata.omissions {
            if omission.reason != OmissionReason::NoValidMeasurements {
                self.logger.log_measurement_dropped(runtime, omission);
            }
            if let Some(metrics) = &self.metrics {
                metrics.inc_dropped(omission.reason);
            }
        }
        for profile in document.tools.values() {
            self.logger.log_tool_profiled(runtime, profile);
        }
        for tool in &document.metadata.unmeasured_tools {
            if set.seen_tools().contains(tool) {
                self.logger.log_tool_unmeasured(runtime, tool);
            } else {
                debug!(runtime = %runtime, tool = %tool, "Catalog tool not measured");
            }
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_profiles(
                runtime,
                document.tools.values(),
                document.metadata.unmeasured_tools.len(),
            );
        }

        info!(
            runtime = %runtime,
            total_tools = document.metadata.total_tools,
            cpu_bound = document.metadata.distribution.cpu_bound,
            mixed = document.metadata.distribution.mixed,
            memory_bound = document.metadata.distribution.memory_bound,
            "Alpha distribution"
        );
        document
    }

    async fn write_metrics(&self) -> Result<()> {
        let Some(path) = &self.config.metrics_path else {
            return Ok(());
        };
        let Some(metrics) = &self.metrics else {
            warn!(path = %path.display(), "Skipping metrics file, metrics unavailable");
            return Ok(());
        };
        let text = metrics
            .encode_text()
            .context("Failed to encode metrics")?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, text)
            .await
            .with_context(|| format!("Failed to write metrics to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataLocality, ToolExecutionRecord};
    use tempfile::TempDir;

    fn node(host: &str, gflops: f64, gbps: f64, mbps: f64) -> NodeProfile {
        let mut n = NodeProfile::new(host);
        n.peak_gflops = Some(gflops);
        n.memory_bandwidth_gbps = Some(gbps);
        n.network_bandwidth_mbps = Some(mbps);
        n
    }

    #[test]
    fn test_profile_file_name() {
        assert_eq!(profile_file_name("native"), "profile_native.yaml");
    }

    #[test]
    fn test_oi_path_resolution() {
        let config = RunConfig {
            input_dir: PathBuf::from("/data/run"),
            ..RunConfig::default()
        };
        assert_eq!(
            config.oi_path(),
            PathBuf::from("/data/run/tool_oi_measurements.json")
        );

        let absolute = RunConfig {
            oi_file: PathBuf::from("/elsewhere/oi.json"),
            ..config
        };
        assert_eq!(absolute.oi_path(), PathBuf::from("/elsewhere/oi.json"));
    }

    #[test]
    fn test_profile_runtime() {
        let run = ProfileRun::new(RunConfig::default());
        let nodes = vec![node("rpi", 8.0, 4.0, 8.0), node("cloud", 800.0, 40.0, 1000.0)];
        let records = vec![
            ToolExecutionRecord::new("fetch", "rpi", 0.012, 256, 10240, DataLocality::NetworkData),
            ToolExecutionRecord::new("fetch", "cloud", 0.004, 256, 10240, DataLocality::NetworkData),
            ToolExecutionRecord::new("fetch", "ghost", 0.004, 256, 10240, DataLocality::NetworkData),
        ];

        let doc = run.profile_runtime(&nodes, "native", records, &[]);
        assert_eq!(doc.metadata.runtime, "native");
        assert_eq!(doc.tools["fetch"].alpha_by_node.len(), 2);
        assert_eq!(doc.metadata.omissions.len(), 1);
        assert_eq!(doc.metadata.omissions[0].reason, OmissionReason::UnknownNode);
    }

    #[tokio::test]
    async fn test_execute_without_nodes_fails() {
        let dir = TempDir::new().unwrap();
        let run = ProfileRun::new(RunConfig {
            input_dir: dir.path().to_path_buf(),
            output_dir: dir.path().to_path_buf(),
            ..RunConfig::default()
        });
        let err = run.execute().await.unwrap_err();
        assert!(err.to_string().contains("No node profiles"));
    }

    #[tokio::test]
    async fn test_execute_writes_profiles_and_metrics() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(
            input.path().join("node_rpi.yaml"),
            "hostname: rpi\npeak_gflops: 8.0\nmemory_bandwidth_gbps: 4.0\nnetwork_bandwidth_mbps: 8.0\n",
        )
        .await
        .unwrap();
        fs::write(
            input.path().join("native_tool_exec_time_rpi.json"),
            r#"[{"tool_name": "fetch", "t_exec": 0.012, "input_size": 256, "output_size": 10240},
                {"tool_name": "read_file", "t_exec": 0.004, "input_size": 100, "output_size": 4096}]"#,
        )
        .await
        .unwrap();
        fs::write(
            input.path().join("tool_oi_measurements.json"),
            r#"[{"tool_name": "read_file", "operational_intensity": 2.0}]"#,
        )
        .await
        .unwrap();

        let metrics_path = output.path().join("metrics/profiler.prom");
        let run = ProfileRun::new(RunConfig {
            input_dir: input.path().to_path_buf(),
            output_dir: output.path().to_path_buf(),
            metrics_path: Some(metrics_path.clone()),
            ..RunConfig::default()
        });
        let summary = run.execute().await.unwrap();

        assert_eq!(summary.nodes, 1);
        assert_eq!(summary.runtimes.len(), 1);
        assert_eq!(summary.runtimes[0].total_tools, 2);

        let doc = read_profile_document(&output.path().join("profile_native.yaml"))
            .await
            .unwrap();
        assert_eq!(doc.tools["read_file"].alpha, 0.5);
        assert_eq!(doc.tools["read_file"].data_locality, DataLocality::LocalData);
        assert_eq!(doc.tools["fetch"].data_locality, DataLocality::NetworkData);

        let metrics = fs::read_to_string(&metrics_path).await.unwrap();
        assert!(metrics.contains("tool_profiler_tool_alpha"));
    }

    #[tokio::test]
    async fn test_execute_keeps_going_past_bad_inputs() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        fs::write(
            input.path().join("node_rpi.yaml"),
            "hostname: rpi\npeak_gflops: 8.0\nmemory_bandwidth_gbps: 4.0\nnetwork_bandwidth_mbps: 8.0\n",
        )
        .await
        .unwrap();
        fs::write(
            input.path().join("native_tool_exec_time_rpi.json"),
            r#"[{"tool_name": "fetch", "t_exec": 0.012, "input_size": 256, "output_size": 10240},
                {"tool_name": "summarize", "t_exec": null},
                {"tool_name": "git_status", "t_exec": 0.1, "input_size": 2.5}]"#,
        )
        .await
        .unwrap();
        fs::write(
            input.path().join("http_tool_exec_time_rpi.json"),
            r#"[{"tool_name": "fetch", "t_exec_ms": 12.0, "input_size": 256, "output_size": 10240,
                 "runs": 2, "measurements_ms": [11.0, 13.0], "transport": "http"}]"#,
        )
        .await
        .unwrap();
        fs::write(input.path().join("wasm_tool_exec_time_rpi.json"), "{truncated")
            .await
            .unwrap();

        let run = ProfileRun::new(RunConfig {
            input_dir: input.path().to_path_buf(),
            output_dir: output.path().to_path_buf(),
            ..RunConfig::default()
        });
        let summary = run.execute().await.unwrap();
        let runtimes: Vec<_> = summary.runtimes.iter().map(|r| r.runtime.as_str()).collect();
        assert_eq!(runtimes, vec!["http", "native"]);
        assert!(!output.path().join("profile_wasm.yaml").exists());

        let native = read_profile_document(&output.path().join("profile_native.yaml"))
            .await
            .unwrap();
        assert_eq!(native.metadata.total_tools, 1);
        let dropped: Vec<_> = native
            .metadata
            .omissions
            .iter()
            .filter(|o| o.reason == OmissionReason::InvalidMeasurement)
            .map(|o| o.tool.as_str())
            .collect();
        assert_eq!(dropped, vec!["summarize", "git_status"]);
        assert!(native.metadata.unmeasured_tools.contains(&"summarize".to_string()));

        let http = read_profile_document(&output.path().join("profile_http.yaml"))
            .await
            .unwrap();
        assert_eq!(
            http.tools["fetch"].t_exec_by_node["rpi"],
            native.tools["fetch"].t_exec_by_node["rpi"]
        );
    }
}
