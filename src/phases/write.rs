//! Phase 4: Writing
//!
//! Emits the ordered resources.
//!
//! - **Stream**: documents joined by `---`, each ending with a newline.
//! - **File**: the stream form, written to one file.
//! - **Directory**: one file per resource, named
//!   `<group>_<version>_<kind>_<name>.yaml` in lower case.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Error, Result};
use crate::path::{resource_file_name, sanitize_component};
use crate::resource::Resource;

/// Render the stream form.
pub fn to_yaml_stream(resources: &[Resource]) -> Result<String> {
    let documents = resources
        .iter()
        .map(Resource::to_yaml)
        .collect::<Result<Vec<_>>>()?;
    Ok(documents.join("---\n"))
}

/// Write the stream form to `writer`.
pub fn to_writer<W: Write>(resources: &[Resource], writer: &mut W) -> Result<()> {
    writer.write_all(to_yaml_stream(resources)?.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Write one file per resource into `dir`, creating it if needed. Returns
/// the written paths in output order.
///
/// Resources that would share a file name (same group, version, kind and
/// name in different namespaces) all get their namespace as a prefix, so
/// names do not depend on output order.
pub fn to_directory(resources: &[Resource], dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| Error::Filesystem {
        message: format!("Failed to create directory '{}': {}", dir.display(), e),
    })?;

    let base_names: Vec<String> = resources
        .iter()
        .map(|r| {
            let gvk = r.gvk();
            resource_file_name(&gvk.group, &gvk.version, &gvk.kind, r.name())
        })
        .collect();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in &base_names {
        *counts.entry(name.as_str()).or_default() += 1;
    }

    let mut written = Vec::with_capacity(resources.len());
    for (resource, base_name) in resources.iter().zip(&base_names) {
        let file_name = if counts.get(base_name.as_str()).copied().unwrap_or_default() > 1 {
            let namespace = resource.namespace().unwrap_or("default");
            format!("{}_{}", sanitize_component(namespace).to_lowercase(), base_name)
        } else {
            base_name.clone()
        };
        let path = dir.join(&file_name);
        fs::write(&path, resource.to_yaml()?).map_err(|e| Error::Filesystem {
            message: format!("Failed to write file '{}': {}", path.display(), e),
        })?;
        written.push(path);
    }
    Ok(written)
}

/// Write the stream form to a single file.
pub fn to_file(resources: &[Resource], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::Filesystem {
            message: format!("Failed to create directory '{}': {}", parent.display(), e),
        })?;
    }
    fs::write(path, to_yaml_stream(resources)?).map_err(|e| Error::Filesystem {
        message: format!("Failed to write file '{}': {}", path.display(), e),
    })
}

/// Execute Phase 4: write to `output`, or to `stdout` when there is none.
///
/// An existing directory (or a path ending in a separator) receives one file
/// per resource. Any other path receives the stream form.
pub fn execute<W: Write>(resources: &[Resource], output: Option<&Path>, stdout: &mut W) -> Result<()> {
    match output {
        None => to_writer(resources, stdout),
        Some(path) if path.is_dir() || ends_with_separator(path) => {
            let written = to_directory(resources, path)?;
            info!("Wrote {} files to {}", written.len(), path.display());
            Ok(())
        }
        Some(path) => {
            to_file(resources, path)?;
            info!("Wrote {} resources to {}", resources.len(), path.display());
            Ok(())
        }
    }
}

fn ends_with_separator(path: &Path) -> bool {
    path.as_os_str()
        .to_str()
        .is_some_and(|p| p.ends_with(std::path::MAIN_SEPARATOR) || p.ends_with('/'))
}
