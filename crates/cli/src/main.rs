//! Kubernetes Resource Report CLI
//!
//! Lists the active pods of a cluster (or reads a saved pod list), then
//! writes a spreadsheet of per-container requests and limits with
//! namespace and node rollups, charts and sizing recommendations.

mod client;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use output::{LogFormat, OutputFormat};
use report_lib::validate::{
    namespace_display, output_filename, validate_namespace, validate_path,
};
use report_lib::{FilePodSource, KubePodSource, PodSource, ReportLogger};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Kubernetes Resource Report
#[derive(Parser)]
#[command(name = "kube-report")]
#[command(author, version, about = "Kubernetes Resource Report: pod requests and limits as a spreadsheet", long_about = None)]
pub struct Cli {
    /// Namespace to report on (all namespaces if not specified)
    #[arg(long, short, env = "K8S_NAMESPACE")]
    pub namespace: Option<String>,

    /// Path to kubeconfig file (inferred from KUBECONFIG or the cluster if not specified)
    #[arg(long)]
    pub kubeconfig: Option<String>,

    /// Output file (default: resource_YYYY-MM-DD.xlsx)
    #[arg(long, short)]
    pub output: Option<String>,

    /// Settings file (default: ~/.config/kube-report/config.toml)
    #[arg(long)]
    pub config: Option<String>,

    /// Read pods from a `kubectl get pods -o json` file instead of the cluster
    #[arg(long)]
    pub pods_file: Option<String>,

    /// Summary output format
    #[arg(long, short, default_value = "table")]
    pub format: OutputFormat,

    /// Log line format
    #[arg(long, default_value = "text")]
    pub log_format: LogFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

/// Validate every user-supplied path before anything is read or written
fn validate_paths(paths: &[Option<&str>]) -> Result<()> {
    for path in paths.iter().flatten() {
        validate_path(path)?;
    }
    Ok(())
}

/// Explicit output path, or the dated default name inside `output_dir`
fn resolve_output(output: Option<&str>, output_dir: Option<&Path>) -> PathBuf {
    let path = output_filename(output);
    match (output.filter(|o| !o.is_empty()), output_dir) {
        (None, Some(dir)) => dir.join(path),
        _ => path,
    }
}

async fn run(cli: Cli) -> Result<()> {
    validate_paths(&[
        cli.output.as_deref(),
        cli.config.as_deref(),
        cli.pods_file.as_deref(),
        cli.kubeconfig.as_deref(),
    ])?;

    let settings = config::Settings::load(cli.config.as_deref().map(Path::new))?;
    debug!(?settings, "Settings loaded");

    let namespace = cli
        .namespace
        .clone()
        .or_else(|| settings.default_namespace.clone())
        .unwrap_or_default();
    validate_namespace(&namespace)?;

    let output = resolve_output(cli.output.as_deref(), settings.output_dir.as_deref());
    validate_path(&output.to_string_lossy())?;

    let logger = ReportLogger::new(namespace_display(&namespace));
    logger.log_startup(VERSION);

    let source: Box<dyn PodSource> = match cli.pods_file.as_deref() {
        Some(path) => {
            logger.log_fetch_started(path, None);
            Box::new(FilePodSource::new(path))
        }
        None => {
            let kubeconfig = config::kubeconfig_path(cli.kubeconfig.as_deref());
            let client = client::build_client(kubeconfig.as_deref()).await?;
            logger.log_fetch_started("cluster", Some(settings.fetch_timeout()));
            Box::new(
                KubePodSource::new(client, Some(namespace.clone()))
                    .with_timeout(settings.fetch_timeout()),
            )
        }
    };

    let start = Instant::now();
    let mut pods = match source.list_pods().await {
        Ok(pods) => pods,
        Err(err) => {
            logger.log_fetch_failed(&err);
            return Err(err).context("Failed to fetch pods");
        }
    };
    if !namespace.is_empty() {
        pods.retain(|pod| pod.namespace == namespace);
    }
    logger.log_pods_fetched(pods.len(), start.elapsed());

    let summary = report_lib::write_workbook(&output, &pods, &logger)
        .context("Failed to generate report")?;

    output::print_summary(&summary, &output, cli.format)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    if let Err(err) = run(cli).await {
        output::print_error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_output_uses_output_dir_for_default_name() {
        let path = resolve_output(None, Some(Path::new("reports")));
        assert!(path.starts_with("reports"));
        assert!(path.to_string_lossy().ends_with(".xlsx"));
    }

    #[test]
    fn test_resolve_output_explicit_path_wins() {
        let path = resolve_output(Some("./custom.xlsx"), Some(Path::new("reports")));
        assert_eq!(path, PathBuf::from("custom.xlsx"));
    }

    #[test]
    fn test_validate_paths_rejects_traversal() {
        assert!(validate_paths(&[Some("ok.xlsx"), None]).is_ok());
        assert!(validate_paths(&[None, Some("../secret.json")]).is_err());
    }

    #[test]
    fn test_kubeconfig_is_only_taken_from_the_flag() {
        let cli = Cli::try_parse_from(["kube-report"]).unwrap();
        assert!(cli.kubeconfig.is_none());
        assert!(validate_paths(&[cli.kubeconfig.as_deref()]).is_ok());

        let cli = Cli::try_parse_from(["kube-report", "--kubeconfig", "/etc/kubernetes/admin.conf"])
            .unwrap();
        assert!(validate_paths(&[cli.kubeconfig.as_deref()]).is_err());
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "kube-report",
            "-n",
            "prod",
            "-o",
            "out.xlsx",
            "--format",
            "json",
            "--log-format",
            "json",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.namespace.as_deref(), Some("prod"));
        assert_eq!(cli.output.as_deref(), Some("out.xlsx"));
        assert!(matches!(cli.format, OutputFormat::Json));
        assert!(matches!(cli.log_format, LogFormat::Json));
        assert!(cli.verbose);
    }
}
