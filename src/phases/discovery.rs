//! Phase 1: Discovery
//!
//! Resolves the composition graph of a build. Starting from the root
//! directory, every `resources` entry is classified as a resource file or a
//! base directory, and bases are resolved recursively into a tree of
//! [`KustNode`]s.
//!
//! ## Cycle Detection
//!
//! Discovery keeps the chain of directories currently being resolved. A
//! directory that appears twice on that chain is a cycle and fails with the
//! whole chain in the message. The same base reached through two different
//! branches (a diamond) is not a cycle and is resolved once per branch.
//!
//! ## Load Restrictions
//!
//! Resource files are checked against the restrictor of the kustomization
//! that lists them. Bases carry their own root and may live anywhere.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::{Entry, KustNode};
use crate::error::{Error, Result};
use crate::filesystem::FileSystem;
use crate::kustomization;
use crate::loader::{LoadRestrictor, Loader};

/// Execute Phase 1: resolve the graph rooted at `root`.
pub fn execute(fs: &dyn FileSystem, root: &Path, restrictor: LoadRestrictor) -> Result<KustNode> {
    let root = fs.canonicalize(root)?;
    discover(fs, &root, restrictor, &mut Vec::new())
}

fn discover(
    fs: &dyn FileSystem,
    dir: &Path,
    restrictor: LoadRestrictor,
    chain: &mut Vec<PathBuf>,
) -> Result<KustNode> {
    if let Some(start) = chain.iter().position(|d| d == dir) {
        let cycle = chain[start..]
            .iter()
            .map(|d| display_dir(d))
            .chain(std::iter::once(display_dir(dir)))
            .collect::<Vec<_>>()
            .join(" -> ");
        return Err(Error::CycleDetected { cycle });
    }

    let (kustomization_path, kustomization) = kustomization::load(fs, dir)?;
    kustomization.validate(&kustomization_path)?;
    for warning in kustomization.warnings() {
        warn!("{}: {}", kustomization_path.display(), warning);
    }
    debug!("Discovered {}", kustomization_path.display());

    chain.push(dir.to_path_buf());
    let loader = Loader::new(fs, dir, restrictor);
    let mut entries = Vec::new();
    for entry in kustomization.resource_entries() {
        let path = loader.resolve(entry)?;
        if fs.is_dir(&path) {
            let base_dir = fs.canonicalize(&path)?;
            entries.push(Entry::Base(discover(fs, &base_dir, restrictor, chain)?));
        } else if fs.is_file(&path) {
            loader.check_restriction(&path)?;
            entries.push(Entry::File(path));
        } else {
            return Err(Error::Filesystem {
                message: format!(
                    "resource '{}' listed in {} does not exist",
                    entry,
                    kustomization_path.display()
                ),
            });
        }
    }
    chain.pop();

    Ok(KustNode {
        dir: dir.to_path_buf(),
        kustomization_path,
        kustomization,
        entries,
    })
}

fn display_dir(dir: &Path) -> String {
    if dir.as_os_str().is_empty() {
        ".".to_string()
    } else {
        dir.display().to_string()
    }
}
