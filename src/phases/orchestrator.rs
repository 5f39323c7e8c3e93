//! Orchestrator for a complete build
//!
//! Coordinates the phases into the two entry points the command line uses:
//! [`execute_build`] returns the ordered resources, and [`execute_build_to`]
//! also writes them out.

use std::io::Write;
use std::path::Path;

use log::info;

use super::{phase1, phase2, phase3, phase4, BuildOptions};
use crate::error::Result;
use crate::filesystem::FileSystem;
use crate::generators;
use crate::resource::Resource;
use crate::transform::name_reference;

/// Execute a build of the kustomization in `dir`.
///
/// 1. Discover the composition graph
/// 2. Build every node bottom-up
/// 3. Append name-suffix hashes to generated resources and fix the
///    references to them
/// 4. Check that no two resources ended up with the same id
/// 5. Order the result
pub fn execute_build(fs: &dyn FileSystem, dir: &Path, options: BuildOptions) -> Result<Vec<Resource>> {
    // Phase 1: Discovery
    let root = phase1::execute(fs, dir, options.load_restrictor)?;

    // Phase 2: Loading
    let mut resmap = phase2::execute(fs, &root, options.load_restrictor)?;

    generators::apply_name_hashes(&mut resmap)?;
    name_reference::fix(&mut resmap)?;
    resmap.check_unique_ids()?;

    // Phase 3: Ordering
    let order = phase3::OutputOrder::resolve(&root.kustomization, options.reorder);
    let resources = phase3::execute(resmap, &order);
    info!(
        "Built {} resources from {} kustomizations",
        resources.len(),
        root.node_count()
    );
    Ok(resources)
}

/// Execute a build and write it to `output`, or to `stdout` when `output`
/// is `None`.
pub fn execute_build_to<W: Write>(
    fs: &dyn FileSystem,
    dir: &Path,
    options: BuildOptions,
    output: Option<&Path>,
    stdout: &mut W,
) -> Result<Vec<Resource>> {
    let resources = execute_build(fs, dir, options)?;

    // Phase 4: Writing
    phase4::execute(&resources, output, stdout)?;
    Ok(resources)
}
