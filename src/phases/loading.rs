//! Phase 2: Loading
//!
//! Builds a [`KustNode`] bottom-up into a [`ResourceMap`].
//!
//! ## Process
//!
//! 1.  **Accumulate**: Every entry is loaded. Bases are fully built first,
//!     and independent entries are loaded in parallel with rayon. Results
//!     are appended in declared order, so scheduling never changes the
//!     output.
//! 2.  **Generate**: ConfigMap and Secret generators run.
//! 3.  **Transform**: The kustomization's transformers run.
//! 4.  **Patch**: The kustomization's patches run.
//! 5.  **Fix references**: Fields naming renamed resources are updated.
//! 6.  **Record lineage**: Every resource notes that this node built it, so
//!     later reference fixes can tell diamond copies apart.

use std::path::Path;

use log::debug;
use rayon::prelude::*;

use super::{Entry, KustNode};
use crate::error::Result;
use crate::filesystem::FileSystem;
use crate::generators;
use crate::loader::{LoadRestrictor, Loader};
use crate::patch;
use crate::resmap::ResourceMap;
use crate::resource::parse_documents;
use crate::transform::{self, name_reference};

/// Execute Phase 2: build `node` and everything below it.
pub fn execute(fs: &dyn FileSystem, node: &KustNode, restrictor: LoadRestrictor) -> Result<ResourceMap> {
    let mut resmap = accumulate(fs, node, restrictor)?;
    let loader = Loader::new(fs, &node.dir, restrictor);
    let kustomization = &node.kustomization;

    generators::run(kustomization, &loader, &mut resmap)?;
    transform::run(kustomization, &mut resmap)?;
    patch::run(kustomization, &loader, &mut resmap)?;
    name_reference::fix(&mut resmap)?;

    let dir = node.dir.display().to_string();
    for resource in resmap.iter_mut() {
        resource.push_lineage(dir.as_str());
    }

    debug!(
        "Built {} ({} resources)",
        node.kustomization_path.display(),
        resmap.len()
    );
    Ok(resmap)
}

/// Load every entry of `node`, in declared order.
pub fn accumulate(fs: &dyn FileSystem, node: &KustNode, restrictor: LoadRestrictor) -> Result<ResourceMap> {
    let loaded = node
        .entries
        .par_iter()
        .map(|entry| match entry {
            Entry::File(path) => load_file(fs, path),
            Entry::Base(base) => execute(fs, base, restrictor),
        })
        .collect::<Result<Vec<ResourceMap>>>()?;

    let mut resmap = ResourceMap::new();
    for part in loaded {
        resmap.append_all(part)?;
    }
    Ok(resmap)
}

/// Parse one file of resource documents.
pub fn load_file(fs: &dyn FileSystem, path: &Path) -> Result<ResourceMap> {
    let content = fs.read_to_string(path)?;
    Ok(parse_documents(&content, path)?.into_iter().collect())
}
