//! CLI integration tests

use std::process::Command;

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "cas-cli", "--", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Carbon Aware Scheduler"),
        "Should show app name"
    );
    assert!(stdout.contains("rank"), "Should show rank command");
    assert!(stdout.contains("schedule"), "Should show schedule command");
    assert!(stdout.contains("energy"), "Should show energy command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = Command::new("cargo")
        .args(["run", "-p", "cas-cli", "--", "--version"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("cas"), "Should show binary name");
}

/// Test schedule subcommand help
#[test]
fn test_schedule_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "cas-cli", "--", "schedule", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Schedule help should succeed");
    assert!(stdout.contains("--duration"), "Should show duration flag");
    assert!(stdout.contains("--deadline"), "Should show deadline flag");
    assert!(stdout.contains("--portable"), "Should show portable flag");
}

/// Test energy subcommand help
#[test]
fn test_energy_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "cas-cli", "--", "energy", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Energy help should succeed");
    assert!(stdout.contains("evaluate"), "Should show evaluate command");
    assert!(stdout.contains("baseline"), "Should show baseline command");
}

/// Rank requires at least one region
#[test]
fn test_rank_requires_regions() {
    let output = Command::new("cargo")
        .args(["run", "-p", "cas-cli", "--", "rank"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Rank without regions should fail");
}
