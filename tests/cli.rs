//! Command-line surface of the server binary

use assert_cmd::Command;
use predicates::prelude::*;

fn server() -> Command {
    Command::cargo_bin("igtl-template-server").unwrap()
}

#[test]
fn test_missing_port_prints_usage() {
    server()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_non_numeric_port() {
    server()
        .arg("abc")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_out_of_range_port() {
    server().arg("0").assert().failure();
    server().arg("70000").assert().failure();
}

#[test]
fn test_help() {
    server()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("PORT"));
}
