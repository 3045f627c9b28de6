//! Settings for the CLI

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix for settings
pub const ENV_PREFIX: &str = "KUBE_REPORT";

/// Report settings, layered file < environment < flags
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    /// Bound on the pod listing call
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Namespace used when `--namespace` is not given
    #[serde(default)]
    pub default_namespace: Option<String>,

    /// Directory for the dated default report file
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_fetch_timeout() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout(),
            default_namespace: None,
            output_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from the given file (or the default location) and
    /// `KUBE_REPORT_*` environment variables
    ///
    /// An explicit file must exist; the default one is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let file = match explicit {
            Some(path) => Some(config::File::from(path).required(true)),
            None => default_settings_path()
                .map(|path| config::File::from(path).required(false)),
        };

        let mut builder = config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(file);
        }
        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to load settings")?;

        settings
            .try_deserialize()
            .context("Failed to parse settings")
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// `~/.config/kube-report/config.toml`, when a home directory exists
fn default_settings_path() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(".config").join("kube-report").join("config.toml"))
}

/// Get kubeconfig path
///
/// `None` means no explicit file was requested and the client should be
/// inferred from the environment.
pub fn kubeconfig_path(override_path: Option<&str>) -> Option<PathBuf> {
    override_path
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_explicit_settings_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "fetch_timeout_secs = 5").unwrap();
        writeln!(file, "default_namespace = \"staging\"").unwrap();
        writeln!(file, "output_dir = \"reports\"").unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.fetch_timeout(), Duration::from_secs(5));
        assert_eq!(settings.default_namespace.as_deref(), Some("staging"));
        assert_eq!(settings.output_dir, Some(PathBuf::from("reports")));
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(Settings::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.fetch_timeout_secs, 30);
        assert!(settings.default_namespace.is_none());
        assert!(settings.output_dir.is_none());
    }

    #[test]
    fn test_kubeconfig_path() {
        assert_eq!(
            kubeconfig_path(Some("/tmp/kubeconfig")),
            Some(PathBuf::from("/tmp/kubeconfig"))
        );
        assert_eq!(kubeconfig_path(Some("")), None);
        assert_eq!(kubeconfig_path(None), None);
    }
}
