//! End-to-end tests for the `tree` command.

mod common;
use common::prelude::*;

#[test]
fn test_tree_help() {
    let mut cmd = cargo_bin_cmd!("overkube");

    cmd.arg("tree")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--depth"))
        .stdout(predicate::str::contains("--load-restrictor"));
}

#[test]
fn test_tree_shows_bases_and_files() {
    let fixture = TestFixture::new()
        .with_app_base("overlays/base")
        .with_file(
            "overlays/kustomization.yaml",
            "resources:\n- base\n- extra.yaml\nnamespace: prod\nnamePrefix: prod-\n",
        )
        .with_file("overlays/extra.yaml", docs::SERVICE);

    fixture
        .command()
        .args(["--color=never", "tree", "overlays"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[TREE] Composition graph for"))
        .stdout(predicate::str::contains(". [namespace=prod, prefix=prod-]"))
        .stdout(predicate::str::contains("base [1 generator(s)]"))
        .stdout(predicate::str::contains("extra.yaml"))
        .stdout(predicate::str::contains("deployment.yaml"));
}

#[test]
fn test_tree_depth_limits_output() {
    let fixture = TestFixture::new()
        .with_app_base("overlays/base")
        .with_file("overlays/kustomization.yaml", "resources:\n- base\n");

    fixture
        .command()
        .args(["tree", "overlays", "--depth", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("base"))
        .stdout(predicate::str::contains("deployment.yaml").not());
}

#[test]
fn test_tree_cycle_fails() {
    let fixture = TestFixture::new()
        .with_file("a/kustomization.yaml", "resources:\n- ../b\n")
        .with_file("b/kustomization.yaml", "resources:\n- ../a\n");

    fixture
        .command()
        .args(["tree", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to resolve"))
        .stderr(predicate::str::contains("Cycle detected"));
}
