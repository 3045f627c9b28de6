//! Input validation for the command surface
//!
//! Namespaces follow Kubernetes DNS label rules. File paths must not climb
//! out of their directory or point into system directories.

use chrono::{Local, NaiveDate};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Maximum length of a DNS label
pub const MAX_NAMESPACE_LEN: usize = 63;

/// Directories a report may never read from or write into
pub const SYSTEM_DIRECTORIES: [&str; 4] = ["/etc", "/sys", "/proc", "/dev"];

/// Shown when no namespace filter is set
pub const ALL_NAMESPACES: &str = "all namespaces";

static NAMESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("namespace too long (max 63 characters): {0}")]
    NamespaceTooLong(String),

    #[error("invalid namespace format: {0}")]
    InvalidNamespace(String),

    #[error("path traversal detected: {0}")]
    PathTraversal(String),

    #[error("access to system directories not allowed: {0}")]
    SystemDirectory(String),

    #[error("invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },
}

/// Validate a namespace filter; empty means all namespaces
pub fn validate_namespace(namespace: &str) -> Result<(), ValidationError> {
    if namespace.is_empty() {
        return Ok(());
    }
    if namespace.len() > MAX_NAMESPACE_LEN {
        return Err(ValidationError::NamespaceTooLong(namespace.to_string()));
    }
    if !NAMESPACE_REGEX.is_match(namespace) {
        return Err(ValidationError::InvalidNamespace(namespace.to_string()));
    }
    Ok(())
}

/// Validate a user-supplied file path; empty is accepted
///
/// Relative paths are resolved against the working directory before the
/// system directory check.
pub fn validate_path(path: &str) -> Result<(), ValidationError> {
    if path.is_empty() {
        return Ok(());
    }

    let candidate = Path::new(path);
    if candidate
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(ValidationError::PathTraversal(path.to_string()));
    }

    let absolute = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| ValidationError::InvalidPath {
                path: path.to_string(),
                reason: e.to_string(),
            })?
            .join(candidate)
    };

    if SYSTEM_DIRECTORIES
        .iter()
        .any(|dir| absolute.starts_with(dir))
    {
        return Err(ValidationError::SystemDirectory(path.to_string()));
    }
    Ok(())
}

/// Drop `.` components and redundant separators
fn clean(path: &str) -> PathBuf {
    Path::new(path)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Report file name for a given date: `resource_YYYY-MM-DD.xlsx`
pub fn default_output_filename(date: NaiveDate) -> PathBuf {
    PathBuf::from(format!("resource_{}.xlsx", date.format("%Y-%m-%d")))
}

/// The requested output path, or today's default name
pub fn output_filename(output: Option<&str>) -> PathBuf {
    match output.filter(|o| !o.is_empty()) {
        Some(path) => clean(path),
        None => default_output_filename(Local::now().date_naive()),
    }
}

/// Human description of a namespace filter
pub fn namespace_display(namespace: &str) -> &str {
    if namespace.is_empty() {
        ALL_NAMESPACES
    } else {
        namespace
    }
}
