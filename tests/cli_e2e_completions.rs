//! End-to-end tests for the `overkube completions` command.

mod common;
use common::prelude::*;

#[test]
fn test_completions_help() {
    let mut cmd = cargo_bin_cmd!("overkube");
    cmd.arg("completions")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("bash"))
        .stdout(predicate::str::contains("powershell"));
}

#[test]
fn test_completions_bash() {
    let mut cmd = cargo_bin_cmd!("overkube");
    cmd.arg("completions")
        .arg("bash")
        .assert()
        .success()
        .stdout(predicate::str::contains("_overkube()"))
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn test_completions_zsh() {
    let mut cmd = cargo_bin_cmd!("overkube");
    cmd.arg("completions")
        .arg("zsh")
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef overkube"));
}

#[test]
fn test_completions_invalid_shell() {
    let mut cmd = cargo_bin_cmd!("overkube");
    cmd.arg("completions")
        .arg("tcsh")
        .assert()
        .failure()
        .code(2);
}
