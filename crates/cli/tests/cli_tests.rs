//! CLI integration tests

use std::process::Command;

fn ptd(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_ptd"))
        .args(args)
        .env_remove("PTD_API_URL")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = ptd(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Power Theft Detection"),
        "Should show app name"
    );
    for command in ["health", "info", "features", "predict", "batch"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
    assert!(stdout.contains("--api-url"), "Should show api-url option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = ptd(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("ptd"), "Should show binary name");
}

#[test]
fn test_features_help() {
    let output = ptd(&["features", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Features help should succeed");
    assert!(stdout.contains("--top"), "Should show top option");
}

#[test]
fn test_predict_help() {
    let output = ptd(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Predict help should succeed");
    assert!(stdout.contains("--file"), "Should show file option");
    assert!(stdout.contains("--model"), "Should show model option");
    assert!(stdout.contains("--threshold"), "Should show threshold option");
}

#[test]
fn test_batch_requires_file() {
    let output = ptd(&["batch"]);

    assert!(!output.status.success(), "Batch without --file should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--file"), "Should mention the missing option");
}

#[test]
fn test_invalid_format_rejected() {
    let output = ptd(&["--format", "xml", "health"]);
    assert!(!output.status.success(), "Unknown format should fail");
}
