//! End-to-end tests for the `build` command.
//!
//! These tests invoke the actual CLI binary and check the emitted YAML from a
//! user's perspective.

mod common;
use common::prelude::*;

#[test]
fn test_build_help() {
    let mut cmd = cargo_bin_cmd!("overkube");

    cmd.arg("build")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--reorder"))
        .stdout(predicate::str::contains("--load-restrictor"));
}

#[test]
fn test_build_base_prints_stream() {
    let fixture = TestFixture::new().with_app_base("base");

    fixture
        .command()
        .arg("build")
        .arg("base")
        .assert()
        .success()
        .stdout(predicate::str::contains("kind: ConfigMap"))
        .stdout(predicate::str::contains("kind: Service"))
        .stdout(predicate::str::contains("kind: Deployment"))
        .stdout(predicate::str::contains("---\n"))
        .stdout(predicate::str::contains("name: settings-"));
}

#[test]
fn test_build_overlay_applies_prefix_namespace_and_references() {
    let fixture = TestFixture::new().with_prod_overlay();

    let assert = fixture.command().arg("build").arg("prod").assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();

    let docs: Vec<serde_yaml::Value> = serde_yaml::Deserializer::from_str(&stdout)
        .map(|d| serde::Deserialize::deserialize(d).unwrap())
        .collect();
    assert_eq!(docs.len(), 3);

    // Legacy order: ConfigMap, Service, Deployment
    let kinds: Vec<&str> = docs.iter().map(|d| d["kind"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["ConfigMap", "Service", "Deployment"]);

    for doc in &docs {
        assert_eq!(doc["metadata"]["namespace"].as_str(), Some("prod"));
        assert_eq!(doc["metadata"]["labels"]["env"].as_str(), Some("prod"));
    }

    let config_map_name = docs[0]["metadata"]["name"].as_str().unwrap();
    assert!(config_map_name.starts_with("prod-settings-"));
    assert_eq!(docs[2]["metadata"]["name"].as_str(), Some("prod-web"));
    assert_eq!(
        docs[2]["spec"]["template"]["spec"]["containers"][0]["envFrom"][0]["configMapRef"]["name"]
            .as_str(),
        Some(config_map_name)
    );
}

#[test]
fn test_build_defaults_to_current_directory() {
    let fixture = TestFixture::new().with_app_base(".");

    fixture
        .command()
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("name: web"));
}

#[test]
fn test_build_reorder_none_keeps_accumulation_order() {
    let fixture = TestFixture::new()
        .with_file("app/kustomization.yaml", "resources:\n- deployment.yaml\n- service.yaml\n")
        .with_file("app/deployment.yaml", docs::DEPLOYMENT)
        .with_file("app/service.yaml", docs::SERVICE);

    let assert = fixture
        .command()
        .args(["build", "app", "--reorder", "none"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let deployment = stdout.find("kind: Deployment").unwrap();
    let service = stdout.find("kind: Service").unwrap();
    assert!(deployment < service);
}

#[test]
fn test_build_output_to_directory() {
    let fixture = TestFixture::new().with_prod_overlay();
    fixture.child("out").create_dir_all().unwrap();

    fixture
        .command()
        .args(["build", "prod", "-o", "out"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    fixture
        .child("out/apps_v1_deployment_prod-web.yaml")
        .assert(predicate::str::contains("name: prod-web"));
    fixture
        .child("out/v1_service_prod-web.yaml")
        .assert(predicate::str::contains("kind: Service"));
}

#[test]
fn test_build_output_to_file() {
    let fixture = TestFixture::new().with_app_base("base");

    fixture
        .command()
        .args(["build", "base", "--output", "all.yaml"])
        .assert()
        .success();

    let content = fixture.read("all.yaml");
    assert!(content.contains("kind: Deployment"));
    assert!(content.contains("kind: Service"));
}

#[test]
fn test_build_missing_kustomization_fails() {
    let fixture = TestFixture::new().with_file("empty/readme.txt", "nothing here");

    fixture
        .command()
        .args(["build", "empty"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No kustomization file found"));
}

#[test]
fn test_build_cycle_fails() {
    let fixture = TestFixture::new()
        .with_file("a/kustomization.yaml", "resources:\n- ../b\n")
        .with_file("b/kustomization.yaml", "resources:\n- ../a\n");

    fixture
        .command()
        .args(["build", "a"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cycle detected"));
}

#[test]
fn test_build_remote_resource_fails() {
    let fixture = TestFixture::new().with_file(
        "app/kustomization.yaml",
        "resources:\n- https://github.com/example/app//base?ref=v1\n",
    );

    fixture
        .command()
        .args(["build", "app"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not supported"));
}

#[test]
fn test_build_load_restrictor_blocks_outside_files() {
    let fixture = TestFixture::new()
        .with_file("shared/service.yaml", docs::SERVICE)
        .with_file("app/kustomization.yaml", "resources:\n- ../shared/service.yaml\n");

    fixture
        .command()
        .args(["build", "app"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Security"));

    fixture
        .command()
        .args(["build", "app", "--load-restrictor", "none"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kind: Service"));
}

#[test]
fn test_build_invalid_kustomization_fails() {
    let fixture = TestFixture::new().with_file("app/kustomization.yaml", docs::INVALID_YAML);

    fixture
        .command()
        .args(["build", "app"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Build of app failed"));
}

#[test]
fn test_build_patch_target_not_found_fails() {
    let fixture = TestFixture::new()
        .with_app_base("base")
        .with_file(
            "prod/kustomization.yaml",
            "resources:\n- ../base\npatchesStrategicMerge:\n- missing.yaml\n",
        )
        .with_file(
            "prod/missing.yaml",
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: nope\nspec:\n  replicas: 3\n",
        );

    fixture
        .command()
        .args(["build", "prod"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Patch target not found"));
}
