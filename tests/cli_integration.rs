//! CLI integration tests
//!
//! These tests run the fsload binary and check:
//! - Command parsing and help output
//! - Exit codes for bad directories
//! - JSON report output of a short run
//! - The stand-alone sweep

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to get the path to the fsload binary
fn fsload_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_fsload"))
}

fn fsload(args: &[&str]) -> Output {
    Command::new(fsload_bin())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute fsload")
}

#[test]
fn test_cli_help() {
    let output = fsload(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("fsload"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("sweep"));
}

#[test]
fn test_cli_version() {
    let output = fsload(&["--version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_run_help_lists_actor_flags() {
    let output = fsload(&["run", "--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in [
        "--creators",
        "--deleters",
        "--metadata-mutators",
        "--readers",
        "--writers",
        "--jitter",
    ] {
        assert!(stdout.contains(flag), "missing {} in help", flag);
    }
}

#[test]
fn test_run_missing_directory_fails() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("missing");

    let output = fsload(&["run", "-d", missing.to_str().unwrap(), "--runtime", "1"]);

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_run_non_empty_directory_fails() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("precious"), "data").unwrap();

    let output = fsload(&[
        "run",
        "-d",
        temp_dir.path().to_str().unwrap(),
        "--runtime",
        "1",
    ]);

    assert_eq!(output.status.code(), Some(1));
    assert!(temp_dir.path().join("precious").exists());
}

#[test]
fn test_run_invalid_range_fails() {
    let temp_dir = TempDir::new().unwrap();

    let output = fsload(&[
        "run",
        "-d",
        temp_dir.path().to_str().unwrap(),
        "--create-bytes",
        "200",
        "100",
    ]);

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_run_json_report() {
    let temp_dir = TempDir::new().unwrap();

    let output = fsload(&[
        "-q",
        "run",
        "-d",
        temp_dir.path().to_str().unwrap(),
        "--runtime",
        "1",
        "--sleep",
        "0.05",
        "--create-bytes",
        "16",
        "256",
        "--read-bytes",
        "16",
        "256",
        "--write-bytes",
        "16",
        "256",
        "--format",
        "json",
    ]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["stop_reason"], "runtime_elapsed");
    assert!(report["elapsed"].as_f64().unwrap() >= 1.0);
    assert!(report["operations"]["created"].as_u64().unwrap() > 0);
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_run_human_banner_and_summary() {
    let temp_dir = TempDir::new().unwrap();

    let output = fsload(&[
        "run",
        "-d",
        temp_dir.path().to_str().unwrap(),
        "--runtime",
        "1",
        "--sleep",
        "0.1",
        "--create-bytes",
        "16",
        "16",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Runtime (seconds): 1"));
    assert!(stdout.contains("Simulation ran for 1 seconds"));
}

#[test]
fn test_sweep_removes_files() {
    let temp_dir = TempDir::new().unwrap();
    for name in ["a", "b", "c"] {
        fs::write(temp_dir.path().join(name), "x").unwrap();
    }
    fs::create_dir(temp_dir.path().join("nested")).unwrap();

    let output = fsload(&[
        "sweep",
        "-d",
        temp_dir.path().to_str().unwrap(),
        "--format",
        "json",
    ]);

    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["removed"], 3);
    assert!(temp_dir.path().join("nested").is_dir());
}

#[test]
fn test_sweep_missing_directory_fails() {
    let output = fsload(&["sweep", "-d", "/nonexistent/fsload/target"]);
    assert_eq!(output.status.code(), Some(1));
}
