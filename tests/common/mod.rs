//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_app_base("base");
//!     fixture.command().arg("build").arg("base").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::Path;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::docs;
    pub use super::TestFixture;
}

/// Resource and kustomization snippets shared by the tests.
#[allow(dead_code)]
pub mod docs {
    pub const DEPLOYMENT: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  replicas: 1
  template:
    spec:
      containers:
      - name: web
        image: nginx:1.25
        envFrom:
        - configMapRef:
            name: settings
"#;

    pub const SERVICE: &str = r#"apiVersion: v1
kind: Service
metadata:
  name: web
spec:
  ports:
  - port: 80
"#;

    /// Base listing the deployment and service plus a generated ConfigMap.
    pub const BASE_KUSTOMIZATION: &str = r#"resources:
- deployment.yaml
- service.yaml
configMapGenerator:
- name: settings
  literals:
  - LOG_LEVEL=info
"#;

    /// Overlay of `../base` with a namespace and a name prefix.
    pub const PROD_KUSTOMIZATION: &str = r#"resources:
- ../base
namespace: prod
namePrefix: prod-
commonLabels:
  env: prod
"#;

    pub const INVALID_YAML: &str = "resources: [unclosed\n";
}

/// A temporary directory populated with kustomization trees.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Add the deployment/service base under `dir`.
    pub fn with_app_base(self, dir: &str) -> Self {
        self.with_file(&format!("{}/kustomization.yaml", dir), docs::BASE_KUSTOMIZATION)
            .with_file(&format!("{}/deployment.yaml", dir), docs::DEPLOYMENT)
            .with_file(&format!("{}/service.yaml", dir), docs::SERVICE)
    }

    /// Add the app base at `base/` and the prod overlay at `prod/`.
    #[allow(dead_code)]
    pub fn with_prod_overlay(self) -> Self {
        self.with_app_base("base")
            .with_file("prod/kustomization.yaml", docs::PROD_KUSTOMIZATION)
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Read a file below the fixture root.
    #[allow(dead_code)]
    pub fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.path().join(path)).expect("Failed to read file")
    }

    /// Create a command configured to run in this fixture's directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("overkube");
        cmd.current_dir(self.path());
        cmd.env_remove("OVERKUBE_LOG_LEVEL");
        cmd.env_remove("OVERKUBE_LOAD_RESTRICTOR");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_fixture_with_app_base() {
        let fixture = TestFixture::new().with_app_base("base");
        assert!(fixture.path().join("base/kustomization.yaml").exists());
        assert!(fixture.path().join("base/service.yaml").exists());
    }

    #[test]
    fn test_docs_are_valid_yaml() {
        for doc in [
            docs::DEPLOYMENT,
            docs::SERVICE,
            docs::BASE_KUSTOMIZATION,
            docs::PROD_KUSTOMIZATION,
        ] {
            let parsed: Result<serde_yaml::Value, _> = serde_yaml::from_str(doc);
            assert!(parsed.is_ok(), "Doc should be valid YAML: {}", doc);
        }
    }
}
