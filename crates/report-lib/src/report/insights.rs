//! Insights sheet: efficiency analysis, node distribution and recommendations

use super::{ReportError, SheetWriter, Styles, INSIGHTS_SHEET};
use crate::recommend::Recommendation;
use crate::sink::{Cell, Row, SheetId};
use crate::stats::{ClusterInsights, EfficiencyRating};

pub(crate) const INSIGHTS_TITLE: &str = "KUBERNETES RESOURCE INSIGHTS";
pub(crate) const EFFICIENCY_SECTION: &str = "RESOURCE EFFICIENCY ANALYSIS";
pub(crate) const NODE_SECTION: &str = "NODE DISTRIBUTION ANALYSIS";
pub(crate) const RECOMMENDATIONS_SECTION: &str = "OPTIMIZATION RECOMMENDATIONS";

const NOT_AVAILABLE: &str = "n/a";
const NO_LIMITS: &str = "No limits set";
const BULLET: &str = "•";

const INSIGHTS_WIDTHS: [f64; 3] = [25.0, 20.0, 30.0];

/// Zero-based row of the first section header
pub(crate) const FIRST_SECTION_ROW: Row = 3;

/// Rows between a section header and its first line
const SECTION_GAP: Row = 2;

/// Rows left empty after a section's last line
const SECTION_TRAILER: Row = 2;

fn efficiency_line(label: &str, value: Option<f64>) -> [Cell; 3] {
    match value {
        Some(pct) => [
            Cell::text(label),
            Cell::text(format!("{:.1}%", pct)),
            Cell::text(EfficiencyRating::from_percent(pct).label()),
        ],
        None => [
            Cell::text(label),
            Cell::text(NOT_AVAILABLE),
            Cell::text(NO_LIMITS),
        ],
    }
}

fn efficiency_lines(insights: &ClusterInsights) -> Vec<[Cell; 3]> {
    let p = &insights.provisioning;
    vec![
        efficiency_line("Cluster CPU Efficiency", insights.efficiency.cpu),
        efficiency_line("Cluster Memory Efficiency", insights.efficiency.memory),
        [
            Cell::text("Over-provisioned Namespaces"),
            p.over_provisioned.into(),
            Cell::text("< 50% efficiency"),
        ],
        [
            Cell::text("Well-balanced Namespaces"),
            p.balanced.into(),
            Cell::text("50-80% efficiency"),
        ],
        [
            Cell::text("Under-provisioned Namespaces"),
            p.under_provisioned.into(),
            Cell::text("> 80% efficiency"),
        ],
        [
            Cell::text("Potential CPU Savings"),
            Cell::text(format!("{:.1} cores", insights.potential_cpu_savings_cores)),
            Cell::text("If limits = requests"),
        ],
        [
            Cell::text("Potential Memory Savings"),
            Cell::text(format!("{:.1} Gi", insights.potential_memory_savings_gib)),
            Cell::text("If limits = requests"),
        ],
    ]
}

fn node_lines(insights: &ClusterInsights) -> Vec<[Cell; 3]> {
    let b = &insights.balance;
    vec![
        [Cell::text("Total Nodes"), b.node_count.into(), Cell::Blank],
        [
            Cell::text("Average Pods per Node"),
            Cell::text(format!("{:.1}", b.mean)),
            Cell::Blank,
        ],
        [
            Cell::text("Pod Distribution StdDev"),
            Cell::text(format!("{:.1}", b.std_dev)),
            Cell::text("Lower = better balance"),
        ],
        [
            Cell::text("Most Loaded Node"),
            Cell::text(format!("{} pods", b.max)),
            Cell::Blank,
        ],
        [
            Cell::text("Least Loaded Node"),
            Cell::text(format!("{} pods", b.min)),
            Cell::Blank,
        ],
        [
            Cell::text("Load Balance Score"),
            Cell::text(format!("{:.0}", b.score)),
            Cell::text("0-100 (100 = perfect)"),
        ],
    ]
}

/// Write a section header and its lines; returns the row after the trailer
fn write_section(
    writer: &mut SheetWriter<'_>,
    sheet: SheetId,
    start: Row,
    title: &str,
    lines: Vec<[Cell; 3]>,
    styles: &Styles,
) -> Row {
    writer.cell(sheet, start, 0, title, styles.section);
    let mut row = start + SECTION_GAP;
    for line in lines {
        for (col, cell) in (0..).zip(line) {
            if cell != Cell::Blank {
                writer.cell(sheet, row, col, cell, None);
            }
        }
        row += 1;
    }
    row + SECTION_TRAILER
}

pub(crate) fn write_insights(
    writer: &mut SheetWriter<'_>,
    insights: &ClusterInsights,
    recommendations: &[Recommendation],
    styles: &Styles,
) -> Result<(), ReportError> {
    let sheet = writer.add_sheet(INSIGHTS_SHEET)?;

    writer.cell(sheet, 0, 0, INSIGHTS_TITLE, styles.title);

    let row = write_section(
        writer,
        sheet,
        FIRST_SECTION_ROW,
        EFFICIENCY_SECTION,
        efficiency_lines(insights),
        styles,
    );
    let row = write_section(
        writer,
        sheet,
        row,
        NODE_SECTION,
        node_lines(insights),
        styles,
    );

    writer.cell(sheet, row, 0, RECOMMENDATIONS_SECTION, styles.section);
    let mut row = row + SECTION_GAP;
    for rec in recommendations {
        writer.cell(sheet, row, 0, BULLET, None);
        writer.cell(sheet, row, 1, rec.message(), None);
        row += 1;
    }

    writer.column_widths(sheet, &INSIGHTS_WIDTHS);
    writer.logger().log_sheet_written(INSIGHTS_SHEET, row as usize);
    Ok(())
}
