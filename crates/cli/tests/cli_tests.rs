//! CLI integration tests

use std::process::{Command, Output};

const POD_LIST: &str = r#"{
  "apiVersion": "v1",
  "kind": "List",
  "items": [
    {
      "metadata": {"name": "web-1", "namespace": "prod"},
      "spec": {
        "containers": [
          {
            "name": "app",
            "resources": {
              "requests": {"cpu": "250m", "memory": "128Mi"},
              "limits": {"cpu": "500m", "memory": "256Mi"}
            }
          }
        ]
      },
      "status": {"phase": "Running", "hostIP": "10.0.0.1"}
    },
    {
      "metadata": {"name": "worker-1", "namespace": "batch"},
      "spec": {
        "containers": [
          {
            "name": "job",
            "resources": {"requests": {"cpu": "1", "memory": "1Gi"}}
          }
        ]
      },
      "status": {"phase": "Pending", "hostIP": "10.0.0.2"}
    },
    {
      "metadata": {"name": "done-1", "namespace": "batch"},
      "spec": {"containers": [{"name": "job"}]},
      "status": {"phase": "Succeeded", "hostIP": "10.0.0.2"}
    }
  ]
}"#;

fn run_cli(args: &[&str]) -> Output {
    Command::new("cargo")
        .args(["run", "-p", "kube-report-cli", "--"])
        .args(args)
        .env_remove("K8S_NAMESPACE")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = run_cli(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Kubernetes Resource Report"),
        "Should show app name"
    );
    assert!(stdout.contains("--namespace"), "Should show namespace option");
    assert!(stdout.contains("--output"), "Should show output option");
    assert!(stdout.contains("--pods-file"), "Should show pods file option");
    assert!(stdout.contains("--kubeconfig"), "Should show kubeconfig option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = run_cli(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("kube-report"), "Should show binary name");
}

/// Test that an invalid namespace is rejected before any cluster access
#[test]
fn test_invalid_namespace_fails() {
    let output = run_cli(&["--namespace", "Bad_Namespace", "--pods-file", "pods.json"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Invalid namespace should fail");
    assert!(
        stderr.contains("invalid namespace format"),
        "Should explain the namespace error"
    );
}

/// Test that path traversal in the output path is rejected
#[test]
fn test_output_path_traversal_fails() {
    let output = run_cli(&["--output", "../report.xlsx", "--pods-file", "pods.json"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Traversal should fail");
    assert!(
        stderr.contains("path traversal detected"),
        "Should explain the path error"
    );
}

/// Test that an unreadable pod list aborts without writing a report
#[test]
fn test_missing_pods_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let pods = dir.path().join("missing.json");
    let report = dir.path().join("report.xlsx");

    let output = run_cli(&[
        "--pods-file",
        pods.to_str().unwrap(),
        "--output",
        report.to_str().unwrap(),
    ]);

    assert!(!output.status.success(), "Missing pod list should fail");
    assert!(!report.exists(), "No report should be written");
}

/// Test a full report run from a saved pod list
#[test]
fn test_report_from_pods_file() {
    let dir = tempfile::tempdir().unwrap();
    let pods = dir.path().join("pods.json");
    let report = dir.path().join("report.xlsx");
    std::fs::write(&pods, POD_LIST).unwrap();

    let output = run_cli(&[
        "--pods-file",
        pods.to_str().unwrap(),
        "--output",
        report.to_str().unwrap(),
        "--format",
        "json",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Report run should succeed");
    assert!(report.exists(), "Report file should be written");

    let summary: serde_json::Value = serde_json::from_str(&stdout).expect("JSON summary");
    assert_eq!(summary["pod_count"], 2);
    assert_eq!(summary["container_count"], 2);

    let namespaces: Vec<&str> = summary["namespaces"]
        .as_array()
        .unwrap()
        .iter()
        .map(|ns| ns["name"].as_str().unwrap())
        .collect();
    assert_eq!(namespaces, vec!["batch", "prod"]);

    let sheets = summary["sheets"].as_array().unwrap();
    assert_eq!(sheets.len(), 5);
}

/// Test that a KUBECONFIG under a system directory does not trip path validation
#[test]
fn test_kubeconfig_env_is_not_validated() {
    let dir = tempfile::tempdir().unwrap();
    let pods = dir.path().join("pods.json");
    let report = dir.path().join("report.xlsx");
    std::fs::write(&pods, POD_LIST).unwrap();

    let output = Command::new("cargo")
        .args(["run", "-p", "kube-report-cli", "--"])
        .args([
            "--pods-file",
            pods.to_str().unwrap(),
            "--output",
            report.to_str().unwrap(),
        ])
        .env("KUBECONFIG", "/etc/kubernetes/admin.conf")
        .env_remove("K8S_NAMESPACE")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(output.status.success(), "Run should succeed: {stderr}");
    assert!(
        !stderr.contains("system directories"),
        "KUBECONFIG should not be path-validated"
    );
    assert!(report.exists(), "Report file should be written");
}

/// Test that the namespace filter also applies to a saved pod list
#[test]
fn test_namespace_filter_with_pods_file() {
    let dir = tempfile::tempdir().unwrap();
    let pods = dir.path().join("pods.json");
    let report = dir.path().join("prod.xlsx");
    std::fs::write(&pods, POD_LIST).unwrap();

    let output = run_cli(&[
        "--namespace",
        "prod",
        "--pods-file",
        pods.to_str().unwrap(),
        "--output",
        report.to_str().unwrap(),
        "--format",
        "json",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Filtered run should succeed");
    let summary: serde_json::Value = serde_json::from_str(&stdout).expect("JSON summary");
    assert_eq!(summary["pod_count"], 1);
    assert_eq!(summary["namespaces"].as_array().unwrap().len(), 1);
}
