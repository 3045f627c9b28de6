//! Resources, Namespaces, Nodes and Chart sheets

use super::{
    row_at, ReportError, SheetWriter, Styles, CHART_SHEET, NAMESPACES_SHEET, NODES_SHEET,
    RESOURCES_SHEET,
};
use crate::aggregate::{format_efficiency, format_share, Aggregation, DetailRow};
use crate::sink::{Cell, CellRef, ChartSeriesSpec, ChartSpec, Col, ColumnRange, Row, SheetId};

pub(crate) const RESOURCE_HEADERS: [&str; 17] = [
    "Namespace",
    "Pod",
    "Node",
    "Container",
    "Status",
    "Request CPU (m)",
    "Request CPU",
    "Request Memory (Mi)",
    "Request Memory",
    "Limit CPU (m)",
    "Limit CPU",
    "Limit Memory (Mi)",
    "Limit Memory",
    "CPU Efficiency %",
    "Memory Efficiency %",
    "CPU % of Cluster",
    "Memory % of Cluster",
];

const RESOURCE_WIDTHS: [f64; 17] = [
    15.0, 25.0, 15.0, 20.0, 10.0, 12.0, 15.0, 18.0, 15.0, 12.0, 15.0, 18.0, 15.0, 16.0, 18.0,
    16.0, 18.0,
];

pub(crate) const NAMESPACE_HEADERS: [&str; 5] = [
    "Namespace",
    "Request CPU (cores)",
    "Limit CPU (cores)",
    "Request Memory (Mi)",
    "Limit Memory (Mi)",
];

const NAMESPACE_WIDTHS: [f64; 5] = [20.0, 18.0, 16.0, 20.0, 18.0];

pub(crate) const NODE_HEADERS: [&str; 6] = [
    "Node IP",
    "Pod Count",
    "Request CPU (cores)",
    "Limit CPU (cores)",
    "Request Memory (Mi)",
    "Limit Memory (Mi)",
];

const NODE_WIDTHS: [f64; 6] = [20.0, 12.0, 18.0, 16.0, 20.0, 18.0];

pub(crate) const CLUSTER_TOTAL_LABEL: &str = "CLUSTER TOTAL";

/// Row 1 holds subtotals, row 2 the headers
const RESOURCE_HEADER_ROW: Row = 1;
const RESOURCE_FIRST_DATA_ROW: Row = 2;

// Resources sheet columns that carry extra formatting
const REQUEST_CPU_MILLIS_COL: Col = 5;
const REQUEST_MEMORY_MIB_COL: Col = 7;
const LIMIT_CPU_MILLIS_COL: Col = 9;
const LIMIT_MEMORY_MIB_COL: Col = 11;
const CPU_EFFICIENCY_COL: Col = 13;
const MEMORY_EFFICIENCY_COL: Col = 14;
const CPU_SHARE_COL: Col = 15;
const MEMORY_SHARE_COL: Col = 16;

pub(crate) const CHART_WIDTH: u32 = 2000;
const CHART_BASE_HEIGHT: u32 = 600;
const CHART_HEIGHT_PER_NAMESPACE: u32 = 60;
const CHART_HEIGHT_SCALE: u32 = 3;
pub(crate) const CHART_MAX_HEIGHT: u32 = 3600;
/// Approximate row height in pixels, used to place the second chart
const CHART_ROW_PIXELS: u32 = 15;

pub(crate) const CPU_CHART_TITLE: &str = "CPU Resources by Namespace (cores)";
pub(crate) const MEMORY_CHART_TITLE: &str = "Memory Resources by Namespace (Mi)";

/// Total height shared by the two charts for `namespaces` categories
pub(crate) fn chart_area_height(namespaces: usize) -> u32 {
    let per_namespace = u32::try_from(namespaces)
        .unwrap_or(u32::MAX)
        .saturating_mul(CHART_HEIGHT_PER_NAMESPACE);
    CHART_BASE_HEIGHT
        .saturating_add(per_namespace)
        .saturating_mul(CHART_HEIGHT_SCALE)
        .min(CHART_MAX_HEIGHT)
}

/// Excel column letter for a zero-based index below 26
fn column_letter(col: Col) -> char {
    char::from(b'A' + col as u8)
}

fn subtotal_formula(col: Col, last_row: Row, divisor: Option<u32>) -> String {
    let letter = column_letter(col);
    let formula = format!("SUBTOTAL(109,{letter}3:{letter}{last_row})");
    match divisor {
        Some(d) => format!("{formula}/{d}"),
        None => formula,
    }
}

fn write_detail_row(
    writer: &mut SheetWriter<'_>,
    sheet: SheetId,
    row: Row,
    detail: &DetailRow,
    styles: &Styles,
) {
    let text = [
        detail.namespace.as_str(),
        detail.pod.as_str(),
        detail.node.as_str(),
        detail.container.as_str(),
        detail.status.as_str(),
    ];
    for (col, value) in (0..).zip(text) {
        writer.cell(sheet, row, col, value, None);
    }

    writer.cell(sheet, row, REQUEST_CPU_MILLIS_COL, detail.request_cpu_millis, None);
    writer.cell(sheet, row, 6, detail.request_cpu_display.as_str(), None);
    writer.cell(
        sheet,
        row,
        REQUEST_MEMORY_MIB_COL,
        detail.request_memory_mib,
        styles.number,
    );
    writer.cell(sheet, row, 8, detail.request_memory_display.as_str(), None);
    writer.cell(sheet, row, LIMIT_CPU_MILLIS_COL, detail.limit_cpu_millis, None);
    writer.cell(sheet, row, 10, detail.limit_cpu_display.as_str(), None);
    writer.cell(
        sheet,
        row,
        LIMIT_MEMORY_MIB_COL,
        detail.limit_memory_mib,
        styles.number,
    );
    writer.cell(sheet, row, 12, detail.limit_memory_display.as_str(), None);

    // Efficiency cells stay empty when undefined
    for (col, efficiency) in [
        (CPU_EFFICIENCY_COL, detail.cpu_efficiency),
        (MEMORY_EFFICIENCY_COL, detail.memory_efficiency),
    ] {
        if let Some(pct) = efficiency {
            let style = writer.band_style(pct);
            writer.cell(sheet, row, col, format_efficiency(Some(pct)), style);
        }
    }
    for (col, share) in [
        (CPU_SHARE_COL, detail.cpu_cluster_share),
        (MEMORY_SHARE_COL, detail.memory_cluster_share),
    ] {
        if share.is_some() {
            writer.cell(sheet, row, col, format_share(share), None);
        }
    }
}

/// Per-container detail sheet
pub(crate) fn write_resources(
    writer: &mut SheetWriter<'_>,
    agg: &Aggregation,
    styles: &Styles,
) -> Result<(), ReportError> {
    let sheet = writer.add_sheet(RESOURCES_SHEET)?;

    let headers = RESOURCE_HEADERS.iter().map(|h| Cell::text(*h)).collect();
    writer.row(sheet, RESOURCE_HEADER_ROW, headers, styles.bold);
    writer.autofilter(
        sheet,
        RESOURCE_HEADER_ROW,
        0,
        (RESOURCE_HEADERS.len() - 1) as Col,
    );

    for (i, detail) in agg.rows.iter().enumerate() {
        let row = row_at(RESOURCE_FIRST_DATA_ROW, i);
        write_detail_row(writer, sheet, row, detail, styles);
    }

    if !agg.rows.is_empty() {
        // One-based number of the last data row
        let last_row = row_at(RESOURCE_FIRST_DATA_ROW, agg.rows.len());
        for (col, divisor) in [
            (REQUEST_CPU_MILLIS_COL, Some(1000)),
            (REQUEST_MEMORY_MIB_COL, None),
            (LIMIT_CPU_MILLIS_COL, Some(1000)),
            (LIMIT_MEMORY_MIB_COL, None),
        ] {
            let formula = subtotal_formula(col, last_row, divisor);
            writer.cell(sheet, 0, col, Cell::Formula(formula), styles.bold);
        }
    }

    writer.column_widths(sheet, &RESOURCE_WIDTHS);
    writer.freeze_rows(sheet, RESOURCE_FIRST_DATA_ROW);
    writer
        .logger()
        .log_sheet_written(RESOURCES_SHEET, agg.rows.len());
    Ok(())
}

/// Namespace rollup with a cluster total row
pub(crate) fn write_namespaces(
    writer: &mut SheetWriter<'_>,
    agg: &Aggregation,
    styles: &Styles,
) -> Result<(), ReportError> {
    let sheet = writer.add_sheet(NAMESPACES_SHEET)?;

    let headers = NAMESPACE_HEADERS.iter().map(|h| Cell::text(*h)).collect();
    writer.row(sheet, 0, headers, styles.bold);

    let namespaces = agg.sorted_namespaces();
    for (i, (name, totals)) in namespaces.iter().enumerate() {
        let row = row_at(1, i);
        writer.cell(sheet, row, 0, name.as_str(), None);
        writer.cell(sheet, row, 1, totals.request_cpu_cores(), None);
        writer.cell(sheet, row, 2, totals.limit_cpu_cores(), None);
        writer.cell(sheet, row, 3, totals.request_memory_mib(), styles.number);
        writer.cell(sheet, row, 4, totals.limit_memory_mib(), styles.number);
    }

    let total = agg.cluster_resources();
    let row = row_at(1, namespaces.len());
    writer.cell(sheet, row, 0, CLUSTER_TOTAL_LABEL, styles.bold);
    writer.cell(sheet, row, 1, total.request_cpu_cores(), styles.bold);
    writer.cell(sheet, row, 2, total.limit_cpu_cores(), styles.bold);
    writer.cell(sheet, row, 3, total.request_memory_mib(), styles.bold_number);
    writer.cell(sheet, row, 4, total.limit_memory_mib(), styles.bold_number);

    writer.column_widths(sheet, &NAMESPACE_WIDTHS);
    writer
        .logger()
        .log_sheet_written(NAMESPACES_SHEET, namespaces.len() + 1);
    Ok(())
}

/// Node rollup
pub(crate) fn write_nodes(
    writer: &mut SheetWriter<'_>,
    agg: &Aggregation,
    styles: &Styles,
) -> Result<(), ReportError> {
    let sheet = writer.add_sheet(NODES_SHEET)?;

    let headers = NODE_HEADERS.iter().map(|h| Cell::text(*h)).collect();
    writer.row(sheet, 0, headers, styles.bold);

    let nodes = agg.sorted_nodes();
    for (i, (name, totals)) in nodes.iter().enumerate() {
        let row = row_at(1, i);
        let resources = &totals.resources;
        writer.cell(sheet, row, 0, name.as_str(), None);
        writer.cell(sheet, row, 1, totals.pod_count, None);
        writer.cell(sheet, row, 2, resources.request_cpu_cores(), None);
        writer.cell(sheet, row, 3, resources.limit_cpu_cores(), None);
        writer.cell(sheet, row, 4, resources.request_memory_mib(), styles.number);
        writer.cell(sheet, row, 5, resources.limit_memory_mib(), styles.number);
    }

    writer.column_widths(sheet, &NODE_WIDTHS);
    writer.logger().log_sheet_written(NODES_SHEET, nodes.len());
    Ok(())
}

fn namespace_chart(
    title: &str,
    request_col: Col,
    limit_col: Col,
    last_row: Row,
    height: u32,
) -> ChartSpec {
    let column = |col| ColumnRange {
        sheet: NAMESPACES_SHEET.to_string(),
        col,
        first_row: 1,
        last_row,
    };
    let series = |col| ChartSeriesSpec {
        name: CellRef {
            sheet: NAMESPACES_SHEET.to_string(),
            row: 0,
            col,
        },
        values: column(col),
    };

    ChartSpec {
        title: title.to_string(),
        categories: column(0),
        series: vec![series(request_col), series(limit_col)],
        width: CHART_WIDTH,
        height,
    }
}

/// Stacked CPU and memory charts over the Namespaces sheet
///
/// Skipped with a warning when there is no namespace to plot.
pub(crate) fn write_charts(
    writer: &mut SheetWriter<'_>,
    agg: &Aggregation,
) -> Result<(), ReportError> {
    let count = agg.namespaces.len();
    if count == 0 {
        writer
            .logger()
            .log_sheet_skipped(CHART_SHEET, "no namespace data available for charts");
        return Ok(());
    }

    let sheet = writer.add_sheet(CHART_SHEET)?;
    let last_row = row_at(0, count);
    let chart_height = chart_area_height(count) / 2;

    let cpu = namespace_chart(CPU_CHART_TITLE, 1, 2, last_row, chart_height);
    writer.chart(sheet, 0, 0, &cpu);

    let memory_row = chart_height / CHART_ROW_PIXELS + 4;
    let memory = namespace_chart(MEMORY_CHART_TITLE, 3, 4, last_row, chart_height);
    writer.chart(sheet, memory_row, 0, &memory);

    writer.logger().log_sheet_written(CHART_SHEET, 2);
    Ok(())
}
