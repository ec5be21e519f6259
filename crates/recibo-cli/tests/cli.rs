//! End-to-end CLI tests.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("recibo")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn config_path_prints_a_location() {
    Command::cargo_bin("recibo")
        .unwrap()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.json"));
}

#[test]
fn missing_input_file_fails() {
    Command::cargo_bin("recibo")
        .unwrap()
        .args(["process", "/nonexistent/file.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn unsupported_extension_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.txt");
    std::fs::write(&path, "plain text").unwrap();

    Command::cargo_bin("recibo")
        .unwrap()
        .arg("process")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file format"));
}

#[test]
fn batch_with_no_matches_fails() {
    Command::cargo_bin("recibo")
        .unwrap()
        .args(["batch", "/nonexistent/*.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No files matched"));
}
