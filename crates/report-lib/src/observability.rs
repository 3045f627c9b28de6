//! Structured logging for report runs
//!
//! Every event carries an `event` field and the report scope so JSON log
//! output can be filtered per run.

use crate::sink::SinkError;
use std::fmt::Display;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Structured logger for report pipeline events
#[derive(Debug, Clone)]
pub struct ReportLogger {
    scope: String,
}

impl ReportLogger {
    /// `scope` names what the report covers, e.g. a namespace or "all namespaces"
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn log_startup(&self, version: &str) {
        info!(
            event = "report_started",
            scope = %self.scope,
            version = %version,
            "Resource report started"
        );
    }

    /// Log the start of a pod listing against `source` (cluster or file)
    pub fn log_fetch_started(&self, source: &str, timeout: Option<Duration>) {
        info!(
            event = "fetch_started",
            scope = %self.scope,
            source = %source,
            timeout_secs = timeout.map(|t| t.as_secs()),
            "Fetching pods"
        );
    }

    pub fn log_pods_fetched(&self, count: usize, elapsed: Duration) {
        info!(
            event = "pods_fetched",
            scope = %self.scope,
            pods = count,
            elapsed_ms = elapsed.as_millis() as u64,
            "Fetched pods"
        );
    }

    pub fn log_fetch_failed(&self, err: &dyn Display) {
        error!(
            event = "fetch_failed",
            scope = %self.scope,
            error = %err,
            "Failed to fetch pods"
        );
    }

    pub fn log_aggregation_complete(
        &self,
        pods: usize,
        containers: usize,
        namespaces: usize,
        nodes: usize,
    ) {
        info!(
            event = "aggregation_complete",
            scope = %self.scope,
            pods = pods,
            containers = containers,
            namespaces = namespaces,
            nodes = nodes,
            "Completed processing"
        );
    }

    /// Log a data-quality warning; these never stop the report
    pub fn log_data_warning(&self, message: &str) {
        warn!(
            event = "resource_warning",
            scope = %self.scope,
            warning = %message,
            "Resource validation warning"
        );
    }

    pub fn log_sheet_written(&self, sheet: &str, rows: usize) {
        debug!(
            event = "sheet_written",
            scope = %self.scope,
            sheet = %sheet,
            rows = rows,
            "Sheet written"
        );
    }

    pub fn log_sheet_skipped(&self, sheet: &str, reason: &str) {
        warn!(
            event = "sheet_skipped",
            scope = %self.scope,
            sheet = %sheet,
            reason = %reason,
            "Sheet skipped"
        );
    }

    /// Log a formatting or cell operation the sink rejected
    pub fn log_operation_skipped(&self, sheet: &str, operation: &str, err: &SinkError) {
        warn!(
            event = "sink_operation_skipped",
            scope = %self.scope,
            sheet = %sheet,
            operation = %operation,
            error = %err,
            "Report sink operation failed, continuing"
        );
    }

    pub fn log_report_written(&self, path: &Path, sheets: usize, elapsed: Duration) {
        info!(
            event = "report_written",
            scope = %self.scope,
            path = %path.display(),
            sheets = sheets,
            elapsed_ms = elapsed.as_millis() as u64,
            "Report written"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_logger_creation() {
        let logger = ReportLogger::new("all namespaces");
        assert_eq!(logger.scope(), "all namespaces");
    }

    #[test]
    fn test_logging_without_subscriber_is_harmless() {
        let logger = ReportLogger::new("kube-system");
        logger.log_startup("0.1.0");
        logger.log_fetch_started("cluster", Some(Duration::from_secs(30)));
        logger.log_pods_fetched(3, Duration::from_millis(12));
        logger.log_data_warning("Namespace 'a' has no resource limits");
        logger.log_operation_skipped(
            "Resources",
            "set_column_width",
            &SinkError::DuplicateSheet("x".into()),
        );
    }
}
