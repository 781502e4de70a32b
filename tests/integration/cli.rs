//! Argument-surface tests for the installed binary.
//!
//! These stay off the network: they exercise help output, argument
//! validation, and the rollback guard (which fails fast when no backup
//! exists next to the test binary).

use assert_cmd::Command;
use predicates::prelude::*;

fn reviewtask() -> Command {
    Command::cargo_bin("reviewtask").expect("binary builds")
}

#[test]
fn help_lists_update_command() {
    reviewtask()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("update"));
}

#[test]
fn update_help_lists_modes() {
    reviewtask()
        .args(["update", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--check"))
        .stdout(predicate::str::contains("--rollback"))
        .stdout(predicate::str::contains("--status"));
}

#[test]
fn version_flag_reports_crate_version() {
    reviewtask()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn conflicting_verbosity_flags_are_rejected() {
    reviewtask()
        .args(["--verbose", "--quiet", "update", "--check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn rollback_without_backup_fails_cleanly() {
    reviewtask()
        .args(["update", "--rollback"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No backup found"));
}
