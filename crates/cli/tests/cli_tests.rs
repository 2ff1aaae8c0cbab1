//! CLI integration tests

use std::io::Write;
use std::process::Command;

fn nannyctl() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_nannyctl"));
    command.env_remove("NANNY_CONFIG_FILE");
    command
}

fn config_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        r#"
namespace = "kube-system"
deployment = "metrics-server"
container = "metrics-server"
recommendation_offset = 10
acceptance_offset = 20

[[resources]]
name = "cpu"
base = "100m"
extra_per_node = "1m"

[[resources]]
name = "memory"
base = "100Mi"
extra_per_node = "1Mi"
"#
    )
    .unwrap();
    file
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = nannyctl()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Pod Nanny"), "Should show app name");
    assert!(stdout.contains("estimate"), "Should show estimate command");
    assert!(stdout.contains("check"), "Should show check command");
    assert!(stdout.contains("status"), "Should show status command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = nannyctl()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("nannyctl"), "Should show binary name");
}

#[test]
fn test_check_help() {
    let output = nannyctl()
        .args(["check", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--nodes"), "Should show nodes option");
    assert!(stdout.contains("--limits"), "Should show limits option");
    assert!(stdout.contains("--requests"), "Should show requests option");
}

#[test]
fn test_estimate_json() {
    let config = config_file();
    let output = nannyctl()
        .args(["--format", "json", "estimate", "--nodes", "10", "--config"])
        .arg(config.path())
        .output()
        .expect("Failed to execute command");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["recommended_range"]["lower"]["cpu"], "109m");
    assert_eq!(json["recommended_range"]["upper"]["memory"], "111Mi");
    assert_eq!(json["acceptable_range"]["lower"]["cpu"], "108m");
    assert_eq!(json["acceptable_range"]["upper"]["memory"], "112Mi");
}

#[test]
fn test_check_reports_correction() {
    let config = config_file();
    let output = nannyctl()
        .args([
            "--format",
            "json",
            "check",
            "--nodes",
            "10",
            "--limits",
            "cpu=500m,memory=110Mi",
            "--requests",
            "cpu=110m,memory=110Mi",
            "--config",
        ])
        .arg(config.path())
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    // cpu limit is above the acceptable upper bound, so every resource takes the recommended upper
    assert_eq!(json["correction"]["cpu"], "111m");
    assert_eq!(json["correction"]["memory"], "111Mi");
}

#[test]
fn test_check_within_bounds() {
    let config = config_file();
    let output = nannyctl()
        .args([
            "--format",
            "json",
            "check",
            "--nodes",
            "10",
            "--limits",
            "cpu=110m,memory=110Mi",
            "--requests",
            "cpu=110m,memory=110Mi",
            "--config",
        ])
        .arg(config.path())
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json["correction"].is_null());
}

#[test]
fn test_check_rejects_malformed_list() {
    let config = config_file();
    let output = nannyctl()
        .args(["check", "--nodes", "3", "--limits", "cpu", "--config"])
        .arg(config.path())
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
}
