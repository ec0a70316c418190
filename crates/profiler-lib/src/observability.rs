//! Observability infrastructure for profiling runs
//!
//! Provides:
//! - Prometheus metrics (nodes loaded, per-tool alpha, dropped measurements, run duration)
//! - Structured JSON logging with tracing

use prometheus::{
    CounterVec, Encoder, GaugeVec, Histogram, HistogramOpts, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::error::OmissionReason;
use crate::models::{AlphaDistribution, Omission, ToolProfile};

/// Histogram buckets for per-runtime profiling duration (in seconds)
const DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ProfilerMetricsInner> = OnceLock::new();

struct ProfilerMetricsInner {
    registry: Registry,
    nodes_loaded: IntGauge,
    tools_profiled: IntGaugeVec,
    tools_unmeasured: IntGaugeVec,
    tool_alpha: GaugeVec,
    measurements_dropped: CounterVec,
    profiling_duration_seconds: Histogram,
}

impl ProfilerMetricsInner {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let nodes_loaded = IntGauge::new(
            "tool_profiler_nodes_loaded",
            "Number of node profiles loaded for the run",
        )?;
        let tools_profiled = IntGaugeVec::new(
            Opts::new(
                "tool_profiler_tools_profiled",
                "Number of tools with a profile",
            ),
            &["runtime"],
        )?;
        let tools_unmeasured = IntGaugeVec::new(
            Opts::new(
                "tool_profiler_tools_unmeasured",
                "Number of tools without any valid measurement",
            ),
            &["runtime"],
        )?;
        let tool_alpha = GaugeVec::new(
            Opts::new("tool_profiler_tool_alpha", "Aggregated alpha per tool"),
            &["tool", "runtime"],
        )?;
        let measurements_dropped = CounterVec::new(
            Opts::new(
                "tool_profiler_measurements_dropped_total",
                "Measurements left out of aggregation, by reason",
            ),
            &["reason"],
        )?;
        let profiling_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "tool_profiler_profiling_duration_seconds",
                "Time spent profiling one runtime",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
        )?;

        registry.register(Box::new(nodes_loaded.clone()))?;
        registry.register(Box::new(tools_profiled.clone()))?;
        registry.register(Box::new(tools_unmeasured.clone()))?;
        registry.register(Box::new(tool_alpha.clone()))?;
        registry.register(Box::new(measurements_dropped.clone()))?;
        registry.register(Box::new(profiling_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            nodes_loaded,
            tools_profiled,
            tools_unmeasured,
            tool_alpha,
            measurements_dropped,
            profiling_duration_seconds,
        })
    }
}

/// Profiler metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone, Copy)]
pub struct ProfilerMetrics {
    inner: &'static ProfilerMetricsInner,
}

impl ProfilerMetrics {
    /// Get a handle, registering the metrics on first call
    pub fn new() -> prometheus::Result<Self> {
        if let Some(inner) = GLOBAL_METRICS.get() {
            return Ok(Self { inner });
        }
        let created = ProfilerMetricsInner::new()?;
        // a concurrent first call may have won; its instance is kept
        let _ = GLOBAL_METRICS.set(created);
        match GLOBAL_METRICS.get() {
            Some(inner) => Ok(Self { inner }),
            None => Err(prometheus::Error::Msg("metrics registry unavailable".into())),
        }
    }

    pub fn set_nodes_loaded(&self, count: usize) {
        self.inner.nodes_loaded.set(count as i64);
    }

    /// Publish the per-tool alphas and counts of one runtime
    pub fn record_profiles<'a>(
        &self,
        runtime: &str,
        profiles: impl IntoIterator<Item = &'a ToolProfile>,
        unmeasured: usize,
    ) {
        let mut profiled = 0i64;
        for profile in profiles {
            self.inner
                .tool_alpha
                .with_label_values(&[profile.tool_name.as_str(), runtime])
                .set(profile.alpha);
            profiled += 1;
        }
        self.inner
            .tools_profiled
            .with_label_values(&[runtime])
            .set(profiled);
        self.inner
            .tools_unmeasured
            .with_label_values(&[runtime])
            .set(unmeasured as i64);
    }

    pub fn inc_dropped(&self, reason: OmissionReason) {
        self.inner
            .measurements_dropped
            .with_label_values(&[reason.as_str()])
            .inc();
    }

    pub fn observe_profiling_duration(&self, duration_secs: f64) {
        self.inner.profiling_duration_seconds.observe(duration_secs);
    }

    /// Text exposition format, suitable for a node-exporter textfile
    pub fn encode_text(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.inner.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Structured logger for profiling events
///
/// Every event carries an `event` field and the label of the host running
/// the profiler.
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
        }
    }

    pub fn log_run_started(&self, version: &str, input_dir: &str, output_dir: &str) {
        info!(
            event = "run_started",
            node = %self.node_name,
            profiler_version = %version,
            input_dir = %input_dir,
            output_dir = %output_dir,
            "Profiling run started"
        );
    }

    pub fn log_node_loaded(
        &self,
        hostname: &str,
        peak_gflops: Option<f64>,
        memory_bandwidth_gbps: Option<f64>,
        ridge_point: Option<f64>,
    ) {
        info!(
            event = "node_loaded",
            node = %self.node_name,
            hostname = %hostname,
            peak_gflops = ?peak_gflops,
            memory_bandwidth_gbps = ?memory_bandwidth_gbps,
            ridge_point = ?ridge_point,
            "Loaded node profile"
        );
    }

    /// Log a node that cannot take part in roofline scoring, or that falls
    /// back to the default network bandwidth
    pub fn log_capability_missing(&self, hostname: &str, field: &str, consequence: &str) {
        warn!(
            event = "capability_missing",
            node = %self.node_name,
            hostname = %hostname,
            field = %field,
            consequence = %consequence,
            "Node is missing a capability"
        );
    }

    pub fn log_measurement_dropped(&self, runtime: &str, omission: &Omission) {
        warn!(
            event = "measurement_dropped",
            node = %self.node_name,
            runtime = %runtime,
            tool = %omission.tool,
            hostname = ?omission.node,
            reason = %omission.reason,
            detail = %omission.detail,
            "Measurement left out of aggregation"
        );
    }

    pub fn log_tool_profiled(&self, runtime: &str, profile: &ToolProfile) {
        info!(
            event = "tool_profiled",
            node = %self.node_name,
            runtime = %runtime,
            tool = %profile.tool_name,
            data_locality = %profile.data_locality,
            alpha = profile.alpha,
            classification = %profile.classification,
            nodes = profile.alpha_by_node.len(),
            "Tool profiled"
        );
    }

    pub fn log_tool_unmeasured(&self, runtime: &str, tool: &str) {
        warn!(
            event = "tool_unmeasured",
            node = %self.node_name,
            runtime = %runtime,
            tool = %tool,
            "Tool has no valid measurements"
        );
    }

    pub fn log_profile_written(
        &self,
        runtime: &str,
        path: &str,
        total_tools: usize,
        distribution: &AlphaDistribution,
    ) {
        info!(
            event = "profile_written",
            node = %self.node_name,
            runtime = %runtime,
            path = %path,
            total_tools = total_tools,
            cpu_bound = distribution.cpu_bound,
            mixed = distribution.mixed,
            memory_bound = distribution.memory_bound,
            "Profile document written"
        );
    }

    pub fn log_run_finished(&self, runtimes: usize, duration_secs: f64, success: bool) {
        if success {
            info!(
                event = "run_finished",
                node = %self.node_name,
                runtimes = runtimes,
                duration_secs = duration_secs,
                "Profiling run finished"
            );
        } else {
            warn!(
                event = "run_finished",
                node = %self.node_name,
                runtimes = runtimes,
                duration_secs = duration_secs,
                "Profiling run finished with errors"
            );
        }
    }
}
