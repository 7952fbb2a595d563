//! CLI integration tests for access-mysql-migrate.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for error conditions that need no database.

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a command for the access-mysql-migrate binary.
fn cmd() -> Command {
    Command::cargo_bin("access-mysql-migrate").unwrap()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_run_subcommand_help() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--on-existing"))
        .stdout(predicate::str::contains("--batch-size"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("access-mysql-migrate"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_progress_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--progress"));
}

#[test]
fn test_output_json_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"));
}

#[test]
fn test_log_format_flag_default() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"));
}

#[test]
fn test_verbosity_flag_default() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

// =============================================================================
// Error handling
// =============================================================================

#[test]
fn test_missing_config_file_fails() {
    cmd()
        .args(["--config", "/nonexistent/config.yaml", "run"])
        .assert()
        .failure();
}

#[test]
fn test_invalid_source_extension_rejected() {
    let dir = std::env::temp_dir().join("amm-cli-test-bad-ext");
    std::fs::create_dir_all(&dir).unwrap();
    let config_path = dir.join("config.yaml");
    std::fs::write(
        &config_path,
        "source:\n  path: /data/not-a-database.txt\ntarget:\n  host: localhost\n  database: db\n  user: root\n  password: x\n",
    )
    .unwrap();

    cmd()
        .args(["--config", config_path.to_str().unwrap(), "run"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("mdb"));
}

#[test]
fn test_invalid_on_existing_policy_rejected() {
    let dir = std::env::temp_dir().join("amm-cli-test-bad-policy");
    std::fs::create_dir_all(&dir).unwrap();
    let config_path = dir.join("config.yaml");
    std::fs::write(
        &config_path,
        "source:\n  path: /data/crm.accdb\ntarget:\n  host: localhost\n  database: db\n  user: root\n  password: x\n",
    )
    .unwrap();

    cmd()
        .args([
            "--config",
            config_path.to_str().unwrap(),
            "run",
            "--on-existing",
            "merge",
        ])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("on_existing"));
}

#[test]
fn test_invalid_log_format_rejected() {
    cmd()
        .args(["--log-format", "xml", "health-check"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("log format"));
}

#[test]
fn test_missing_subcommand_shows_usage() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
