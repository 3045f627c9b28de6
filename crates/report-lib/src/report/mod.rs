//! Report pipeline
//!
//! Runs the cluster pre-pass and aggregation over a pod list, derives the
//! insights, then writes the five report sheets to a [`ReportSink`].
//!
//! Only sheet creation is fatal here. Styles, widths, panes, charts and
//! individual cells that the sink rejects are logged and skipped so that a
//! formatting problem never voids otherwise valid data.

mod insights;
mod sheets;


use crate::aggregate::{aggregate, NodeTotals, ResourceTotals};
use crate::models::PodRecord;
use crate::observability::ReportLogger;
use crate::recommend::{generate_recommendations, RecommendationInputs};
use crate::sink::{
    Cell, ChartSpec, Col, ReportSink, Row, SheetId, SinkError, StyleHandle, StyleSpec,
};
use crate::stats::{resource_warnings, ClusterInsights, EfficiencyBand};
use crate::xlsx::XlsxSink;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

pub const RESOURCES_SHEET: &str = "Resources";
pub const NAMESPACES_SHEET: &str = "Namespaces";
pub const NODES_SHEET: &str = "Nodes";
pub const CHART_SHEET: &str = "Chart";
pub const INSIGHTS_SHEET: &str = "Insights";

/// Fatal report failures
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to create sheet '{sheet}': {source}")]
    Sheet {
        sheet: String,
        #[source]
        source: SinkError,
    },

    #[error("failed to save report to {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: SinkError,
    },
}

/// Namespace bucket as reported
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceSummary {
    pub name: String,
    #[serde(flatten)]
    pub totals: ResourceTotals,
}

/// Node bucket as reported
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSummary {
    pub name: String,
    #[serde(flatten)]
    pub totals: NodeTotals,
}

/// What a report run produced, for console and JSON output
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub pod_count: usize,
    pub container_count: usize,
    /// Lexically sorted
    pub namespaces: Vec<NamespaceSummary>,
    /// Lexically sorted
    pub nodes: Vec<NodeSummary>,
    pub insights: ClusterInsights,
    pub recommendations: Vec<String>,
    pub warnings: Vec<String>,
    pub sheets: Vec<String>,
    /// Sink operations that failed and were skipped
    pub skipped_operations: usize,
}

/// Styles shared by the sheet builders; `None` when the sink refused one
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Styles {
    pub bold: Option<StyleHandle>,
    pub title: Option<StyleHandle>,
    pub section: Option<StyleHandle>,
    pub number: Option<StyleHandle>,
    pub bold_number: Option<StyleHandle>,
}

const ONE_DECIMAL: &str = "0.0";

impl Styles {
    fn define(writer: &mut SheetWriter<'_>) -> Self {
        Self {
            bold: writer.style(&StyleSpec::bold()),
            title: writer.style(&StyleSpec::bold().with_font_size(16)),
            section: writer.style(&StyleSpec::bold().with_font_size(12)),
            number: writer.style(&StyleSpec::default().with_num_format(ONE_DECIMAL)),
            bold_number: writer.style(&StyleSpec::bold().with_num_format(ONE_DECIMAL)),
        }
    }
}

/// Sink front-end that separates fatal from cosmetic failures
pub(crate) struct SheetWriter<'a> {
    sink: &'a mut dyn ReportSink,
    logger: &'a ReportLogger,
    sheet_names: HashMap<SheetId, String>,
    created: Vec<String>,
    skipped: usize,
}

impl<'a> SheetWriter<'a> {
    fn new(sink: &'a mut dyn ReportSink, logger: &'a ReportLogger) -> Self {
        Self {
            sink,
            logger,
            sheet_names: HashMap::new(),
            created: Vec::new(),
            skipped: 0,
        }
    }

    pub fn logger(&self) -> &ReportLogger {
        self.logger
    }

    pub fn add_sheet(&mut self, name: &str) -> Result<SheetId, ReportError> {
        let id = self
            .sink
            .add_sheet(name)
            .map_err(|source| ReportError::Sheet {
                sheet: name.to_string(),
                source,
            })?;
        self.sheet_names.insert(id, name.to_string());
        self.created.push(name.to_string());
        Ok(id)
    }

    fn skip_on_error<T>(
        &mut self,
        sheet: Option<SheetId>,
        operation: &str,
        result: Result<T, SinkError>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.skipped += 1;
                let sheet = sheet
                    .and_then(|id| self.sheet_names.get(&id))
                    .map_or("-", String::as_str);
                self.logger.log_operation_skipped(sheet, operation, &err);
                None
            }
        }
    }

    pub fn style(&mut self, spec: &StyleSpec) -> Option<StyleHandle> {
        let result = self.sink.define_style(spec);
        self.skip_on_error(None, "define_style", result)
    }

    /// Fill style for an efficiency cell
    pub fn band_style(&mut self, percent: f64) -> Option<StyleHandle> {
        let rgb = EfficiencyBand::from_percent(percent).fill_rgb();
        self.style(&StyleSpec::default().with_fill(rgb))
    }

    pub fn cell(
        &mut self,
        sheet: SheetId,
        row: Row,
        col: Col,
        cell: impl Into<Cell>,
        style: Option<StyleHandle>,
    ) {
        let cell = cell.into();
        let result = self.sink.write_cell(sheet, row, col, &cell, style);
        self.skip_on_error(Some(sheet), "write_cell", result);
    }

    /// Write consecutive cells starting at column A
    pub fn row(&mut self, sheet: SheetId, row: Row, cells: Vec<Cell>, style: Option<StyleHandle>) {
        for (col, cell) in (0..).zip(cells) {
            self.cell(sheet, row, col, cell, style);
        }
    }

    /// Set widths for columns A, B, C, ... in order
    pub fn column_widths(&mut self, sheet: SheetId, widths: &[f64]) {
        for (col, width) in (0..).zip(widths.iter().copied()) {
            let result = self.sink.set_column_width(sheet, col, width);
            self.skip_on_error(Some(sheet), "set_column_width", result);
        }
    }

    pub fn autofilter(&mut self, sheet: SheetId, row: Row, first_col: Col, last_col: Col) {
        let result = self.sink.set_autofilter(sheet, row, first_col, last_col);
        self.skip_on_error(Some(sheet), "set_autofilter", result);
    }

    pub fn freeze_rows(&mut self, sheet: SheetId, rows: Row) {
        let result = self.sink.freeze_rows(sheet, rows);
        self.skip_on_error(Some(sheet), "freeze_rows", result);
    }

    pub fn chart(&mut self, sheet: SheetId, row: Row, col: Col, chart: &ChartSpec) {
        let result = self.sink.insert_chart(sheet, row, col, chart);
        self.skip_on_error(Some(sheet), "insert_chart", result);
    }
}

/// Row index `offset + index`, saturating
pub(crate) fn row_at(offset: Row, index: usize) -> Row {
    offset.saturating_add(Row::try_from(index).unwrap_or(Row::MAX))
}

/// Build every report sheet from `pods` into `sink`
///
/// Pods are consumed in input order; only Running and Pending pods are
/// counted. On success the sink holds the complete workbook.
pub fn generate_report(
    sink: &mut dyn ReportSink,
    pods: &[PodRecord],
    logger: &ReportLogger,
) -> Result<ReportSummary, ReportError> {
    let agg = aggregate(pods);
    logger.log_aggregation_complete(
        agg.pod_count,
        agg.container_count,
        agg.namespaces.len(),
        agg.nodes.len(),
    );

    let warnings = resource_warnings(&agg);
    for warning in &warnings {
        logger.log_data_warning(warning);
    }

    let insights = ClusterInsights::from_aggregation(&agg);
    let recommendations = generate_recommendations(&RecommendationInputs::from(&insights));

    let mut writer = SheetWriter::new(sink, logger);
    let styles = Styles::define(&mut writer);

    sheets::write_resources(&mut writer, &agg, &styles)?;
    sheets::write_namespaces(&mut writer, &agg, &styles)?;
    sheets::write_nodes(&mut writer, &agg, &styles)?;
    sheets::write_charts(&mut writer, &agg)?;
    insights::write_insights(&mut writer, &insights, &recommendations, &styles)?;

    let summary = ReportSummary {
        pod_count: agg.pod_count,
        container_count: agg.container_count,
        namespaces: agg
            .sorted_namespaces()
            .into_iter()
            .map(|(name, totals)| NamespaceSummary { name, totals })
            .collect(),
        nodes: agg
            .sorted_nodes()
            .into_iter()
            .map(|(name, totals)| NodeSummary { name, totals })
            .collect(),
        insights,
        recommendations: recommendations.iter().map(ToString::to_string).collect(),
        warnings,
        sheets: writer.created,
        skipped_operations: writer.skipped,
    };
    Ok(summary)
}

/// Generate the report into a new workbook and save it at `path`
///
/// Nothing is written to disk unless every fatal step succeeded.
pub fn write_workbook(
    path: &Path,
    pods: &[PodRecord],
    logger: &ReportLogger,
) -> Result<ReportSummary, ReportError> {
    let start = Instant::now();
    let mut sink = XlsxSink::new();
    let summary = generate_report(&mut sink, pods, logger)?;

    sink.save(path).map_err(|source| ReportError::Save {
        path: path.to_path_buf(),
        source,
    })?;
    logger.log_report_written(path, summary.sheets.len(), start.elapsed());
    Ok(summary)
}
