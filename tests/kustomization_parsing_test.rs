//! Kustomization parsing tests using datatest-stable for test data discovery
//!
//! Every YAML file under `tests/testdata/valid` must parse and validate, and
//! every file under `tests/testdata/invalid` must be rejected by one of the
//! two steps.

use overkube::kustomization::{parse, Kustomization};
use std::path::Path;

fn load(path: &Path) -> Result<Kustomization, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read test file {}: {}", path.display(), e))?;
    let kustomization = parse(&content, path).map_err(|e| e.to_string())?;
    kustomization.validate(path).map_err(|e| e.to_string())?;
    Ok(kustomization)
}

/// A valid kustomization parses, validates, and survives being written back
/// out. Files named `deprecated-*` must produce warnings; all others must not.
fn test_valid_kustomization(path: &Path) -> datatest_stable::Result<()> {
    let kustomization = load(path)?;

    for entry in kustomization.resource_entries() {
        assert!(
            !entry.trim().is_empty(),
            "Resource entry in {} is empty",
            path.display()
        );
    }
    for generator in kustomization
        .config_map_generator
        .iter()
        .chain(kustomization.secret_generator.iter())
    {
        assert!(
            generator.name.as_deref().is_some_and(|n| !n.is_empty()),
            "Generator in {} has no name",
            path.display()
        );
    }

    let warnings = kustomization.warnings();
    let deprecated = path
        .file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with("deprecated-"));
    assert_eq!(
        !warnings.is_empty(),
        deprecated,
        "Unexpected warnings for {}: {:?}",
        path.display(),
        warnings
    );

    let written = kustomization
        .to_yaml()
        .map_err(|e| format!("Failed to serialize {}: {}", path.display(), e))?;
    let reparsed = parse(&written, path)
        .map_err(|e| format!("Failed to reparse {}: {}", path.display(), e))?;
    assert_eq!(reparsed, kustomization, "Rewritten {} differs", path.display());
    Ok(())
}

/// An invalid kustomization is rejected with a message naming the file.
fn test_invalid_kustomization(path: &Path) -> datatest_stable::Result<()> {
    match load(path) {
        Ok(_) => Err(format!("{} should have been rejected", path.display()).into()),
        Err(message) => {
            assert!(
                message.contains(&path.display().to_string()),
                "Error for {} does not name the file: {}",
                path.display(),
                message
            );
            Ok(())
        }
    }
}

datatest_stable::harness!(
    test_valid_kustomization,
    "tests/testdata/valid",
    r".*\.yaml$",
    test_invalid_kustomization,
    "tests/testdata/invalid",
    r".*\.yaml$"
);
