//! End-to-end tests for the `edit` command.

mod common;
use common::prelude::*;

fn app() -> TestFixture {
    TestFixture::new()
        .with_file("app/kustomization.yaml", "resources:\n- deployment.yaml\n")
        .with_file("app/deployment.yaml", docs::DEPLOYMENT)
        .with_file("app/service.yaml", docs::SERVICE)
}

#[test]
fn test_edit_set_image_and_build() {
    let fixture = app();

    fixture
        .command()
        .args([
            "--color=never",
            "edit",
            "--dir",
            "app",
            "set",
            "image",
            "nginx=registry.local/nginx:1.26",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] Set image nginx=registry.local/nginx:1.26"));

    let content = fixture.read("app/kustomization.yaml");
    assert!(content.contains("newName: registry.local/nginx"));
    assert!(content.contains("newTag: '1.26'") || content.contains("newTag: \"1.26\""));

    fixture
        .command()
        .args(["build", "app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("image: registry.local/nginx:1.26"));
}

#[test]
fn test_edit_set_replicas_and_namespace() {
    let fixture = app();

    fixture
        .command()
        .args(["edit", "--dir", "app", "set", "replicas", "web=4"])
        .assert()
        .success();
    fixture
        .command()
        .args(["edit", "--dir", "app", "set", "namespace", "qa"])
        .assert()
        .success();

    fixture
        .command()
        .args(["build", "app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("replicas: 4"))
        .stdout(predicate::str::contains("namespace: qa"));
}

#[test]
fn test_edit_add_resource() {
    let fixture = app();

    fixture
        .command()
        .args(["edit", "--dir", "app", "add", "resource", "service.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added resource service.yaml"));

    assert!(fixture.read("app/kustomization.yaml").contains("- service.yaml"));
}

#[test]
fn test_edit_add_missing_resource_fails() {
    let fixture = app();

    fixture
        .command()
        .args(["edit", "--dir", "app", "add", "resource", "missing.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_edit_add_label_requires_force_to_overwrite() {
    let fixture = app();

    fixture
        .command()
        .args(["edit", "--dir", "app", "add", "label", "team:core"])
        .assert()
        .success();
    fixture
        .command()
        .args(["edit", "--dir", "app", "add", "label", "team:infra"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
    fixture
        .command()
        .args(["edit", "--dir", "app", "add", "label", "team:infra", "--force"])
        .assert()
        .success();

    assert!(fixture.read("app/kustomization.yaml").contains("team: infra"));
}

#[test]
fn test_edit_add_targeted_patch() {
    let fixture = app().with_file(
        "app/replicas.yaml",
        "- op: replace\n  path: /spec/replicas\n  value: 5\n",
    );

    fixture
        .command()
        .args([
            "edit", "--dir", "app", "add", "patch", "--path", "replicas.yaml", "--kind",
            "Deployment", "--name", "web",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added patch replicas.yaml"));

    fixture
        .command()
        .args(["build", "app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("replicas: 5"));
}

#[test]
fn test_edit_without_kustomization_fails() {
    let fixture = TestFixture::new().with_file("empty/readme.txt", "nothing");

    fixture
        .command()
        .args(["edit", "--dir", "empty", "set", "namespace", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot edit"));
}
