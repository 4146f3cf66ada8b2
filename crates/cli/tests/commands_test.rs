//! # CLI Command Tests
//!
//! Runs the `callboard-cli` binary against a temporary database.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn cli(db_path: &Path) -> Command {
    let mut cmd = Command::cargo_bin("callboard-cli").unwrap();
    cmd.arg("--db-url").arg(db_path).env("RUST_LOG", "warn");
    cmd
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "command failed: {output:?}");
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_import_then_normalize() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("callboard.db");
    let csv_path = temp_dir.path().join("leads.csv");
    fs::write(
        &csv_path,
        "full_name,specialty\nDr. Jane Doe,Cardiology GR27\nDr. John Roe,Cardiology Αττικη\n,Dermatology\n",
    )
    .unwrap();

    let imported = stdout_json(
        cli(&db_path)
            .arg("import-leads")
            .arg("--file")
            .arg(&csv_path)
            .arg("--caller-id")
            .arg("c1"),
    );
    assert_eq!(imported["imported"], 2);
    assert_eq!(imported["skipped"], 1);

    let normalized = stdout_json(cli(&db_path).arg("normalize-specialties"));
    assert_eq!(normalized["updated"], 1);

    // A second pass finds nothing left to rewrite.
    let again = stdout_json(cli(&db_path).arg("normalize-specialties"));
    assert_eq!(again["updated"], 0);
}

#[test]
fn test_set_role_for_unknown_email_fails() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("callboard.db");

    cli(&db_path)
        .args(["set-role", "--email", "nobody@example.com", "--role", "admin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nobody@example.com"));
}

#[test]
fn test_invalid_role_is_rejected_by_the_parser() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("callboard.db");

    cli(&db_path)
        .args(["set-role", "--email", "a@example.com", "--role", "owner"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown role 'owner'"));
}
