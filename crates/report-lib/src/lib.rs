//! Kubernetes pod resource reporting
//!
//! This crate provides the core functionality for:
//! - Kubernetes quantity parsing
//! - Pod sources (live cluster or saved pod list)
//! - Single-pass namespace and node aggregation
//! - Efficiency, provisioning and node balance statistics
//! - Rule-based recommendations
//! - Spreadsheet report generation through a pluggable sink

pub mod aggregate;
pub mod models;
pub mod observability;
pub mod quantity;
pub mod recommend;
pub mod report;
pub mod sink;
pub mod source;
pub mod stats;
pub mod validate;
pub mod xlsx;

pub use aggregate::{aggregate, compute_cluster_totals, Aggregation, ClusterTotals, DetailRow};
pub use models::*;
pub use observability::ReportLogger;
pub use recommend::{generate_recommendations, Recommendation, RecommendationInputs};
pub use report::{generate_report, write_workbook, ReportError, ReportSummary};
pub use sink::{MemorySink, ReportSink, SinkError};
pub use source::{FilePodSource, KubePodSource, PodSource, SourceError};
pub use stats::ClusterInsights;
pub use validate::ValidationError;
pub use xlsx::XlsxSink;
