//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use report_lib::quantity::{format_bytes, format_cpu};
use report_lib::stats::EfficiencyRating;
use report_lib::ReportSummary;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// Output format for the run summary
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Tabled)]
struct NamespaceRow {
    #[tabled(rename = "Namespace")]
    name: String,
    #[tabled(rename = "CPU Request")]
    request_cpu: String,
    #[tabled(rename = "CPU Limit")]
    limit_cpu: String,
    #[tabled(rename = "Memory Request")]
    request_memory: String,
    #[tabled(rename = "Memory Limit")]
    limit_memory: String,
}

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Node")]
    name: String,
    #[tabled(rename = "Pods")]
    pods: usize,
    #[tabled(rename = "CPU Request")]
    request_cpu: String,
    #[tabled(rename = "Memory Request")]
    request_memory: String,
}

/// Print what the run produced
pub fn print_summary(summary: &ReportSummary, path: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
        OutputFormat::Table => print_tables(summary, path),
    }
    Ok(())
}

fn print_tables(summary: &ReportSummary, path: &Path) {
    print_success(&format!("Report written to {}", path.display().to_string().cyan()));
    println!(
        "{} pods, {} containers, {} namespaces, {} nodes",
        summary.pod_count,
        summary.container_count,
        summary.namespaces.len(),
        summary.nodes.len()
    );
    println!();

    if summary.namespaces.is_empty() {
        println!("{}", "No active pods found".yellow());
    } else {
        let rows: Vec<NamespaceRow> = summary
            .namespaces
            .iter()
            .map(|ns| NamespaceRow {
                name: ns.name.clone(),
                request_cpu: format_cpu(ns.totals.request_cpu_millis),
                limit_cpu: format_cpu(ns.totals.limit_cpu_millis),
                request_memory: format_bytes(ns.totals.request_memory_bytes),
                limit_memory: format_bytes(ns.totals.limit_memory_bytes),
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::rounded()));

        let rows: Vec<NodeRow> = summary
            .nodes
            .iter()
            .map(|node| NodeRow {
                name: node.name.clone(),
                pods: node.totals.pod_count,
                request_cpu: format_cpu(node.totals.resources.request_cpu_millis),
                request_memory: format_bytes(node.totals.resources.request_memory_bytes),
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::rounded()));
    }
    println!();

    println!("{}", "Insights".bold());
    println!("{}", "=".repeat(50));
    let insights = &summary.insights;
    println!(
        "CPU Efficiency:         {}",
        color_efficiency(insights.efficiency.cpu)
    );
    println!(
        "Memory Efficiency:      {}",
        color_efficiency(insights.efficiency.memory)
    );
    println!(
        "Load Balance Score:     {:.0}",
        insights.balance.score
    );
    println!();

    for warning in &summary.warnings {
        print_warning(warning);
    }
    for recommendation in &summary.recommendations {
        print_info(recommendation);
    }
    if summary.skipped_operations > 0 {
        print_warning(&format!(
            "{} formatting operations were skipped, see the log for details",
            summary.skipped_operations
        ));
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Color an efficiency figure by its rating
pub fn color_efficiency(efficiency: Option<f64>) -> String {
    let Some(pct) = efficiency else {
        return "n/a (no limits set)".dimmed().to_string();
    };
    let rating = EfficiencyRating::from_percent(pct);
    let formatted = format!("{:.1}% ({})", pct, rating.label());
    match rating {
        EfficiencyRating::WellBalanced => formatted.green().to_string(),
        EfficiencyRating::UnderProvisioned | EfficiencyRating::OverProvisioned => {
            formatted.yellow().to_string()
        }
        EfficiencyRating::SeverelyOverProvisioned => formatted.red().to_string(),
    }
}
