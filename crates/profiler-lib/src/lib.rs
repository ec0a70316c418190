//! Profiler library for tool alpha estimation
//!
//! This crate provides the core functionality for:
//! - Ingesting node benchmarks and tool execution records
//! - Roofline and communication-ratio alpha classification
//! - Aggregating per-node alphas into tool profiles
//! - Batch runs that write `profile_<runtime>.yaml` documents
//! - Metrics and structured logging

pub mod aggregate;
pub mod catalog;
pub mod classifier;
pub mod error;
pub mod ingest;
pub mod models;
pub mod observability;
pub mod pipeline;

pub use aggregate::{build_profile, NodeScore, ProfileBuilder};
pub use catalog::{ToolCatalog, ToolDescriptor};
pub use classifier::{classify_local, classify_network, BoundClass, ClassifierConfig};
pub use error::{OmissionReason, ProfileError};
pub use models::*;
pub use observability::{ProfilerMetrics, StructuredLogger};
pub use pipeline::{ProfileRun, RunConfig, RunSummary};
