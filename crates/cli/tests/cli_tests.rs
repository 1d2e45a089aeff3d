//! CLI integration tests

use std::process::Command;

fn fleetctl(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "fleetctl", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = fleetctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Fleet Dashboard"), "Should show app name");
    for command in ["ls", "action", "confirm", "cancel", "deploy", "analyze", "users", "images"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("--user"), "Should show user option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = fleetctl(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("fleetctl"), "Should show binary name");
}

#[test]
fn test_ls_help() {
    let output = fleetctl(&["ls", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "ls help should succeed");
    assert!(stdout.contains("--search"), "Should show search option");
    assert!(stdout.contains("--status"), "Should show status option");
    assert!(stdout.contains("--sort"), "Should show sort option");
}

#[test]
fn test_action_help() {
    let output = fleetctl(&["action", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "action help should succeed");
    assert!(stdout.contains("--yes"), "Should show yes option");
    assert!(stdout.contains("<CONTAINER>"), "Should show container argument");
}

#[test]
fn test_deploy_help() {
    let output = fleetctl(&["deploy", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "deploy help should succeed");
    assert!(stdout.contains("--memory-limit"), "Should show memory-limit option");
    assert!(stdout.contains("--env"), "Should show env option");
}

#[test]
fn test_users_rm_help() {
    let output = fleetctl(&["users", "rm", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "users rm help should succeed");
    assert!(stdout.contains("<ID>"), "Should show id argument");
}

/// Test invalid command handling
#[test]
fn test_invalid_command() {
    let output = fleetctl(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");
}

#[test]
fn test_invalid_format() {
    let output = fleetctl(&["--format", "yaml", "ls"]);
    assert!(!output.status.success(), "Unknown output format should fail");
}

/// Unreachable API surfaces as a failed exit rather than a panic
#[test]
fn test_unreachable_api_fails_cleanly() {
    let output = fleetctl(&["--api-url", "http://127.0.0.1:1", "audit"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1));
    assert!(!stderr.contains("panicked"));
}
