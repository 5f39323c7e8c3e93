//! # Patch Engine
//!
//! Applies the patches of one kustomization to the resources it has
//! accumulated, after the transformers have run. Sources are applied in a
//! fixed order: `patchesStrategicMerge`, then `patchesJson6902`, then
//! `patches`.
//!
//! A patch without a selector finds its target through its own `kind`,
//! `metadata.name` and `metadata.namespace`, matched against every id the
//! resource has had. A patch with a selector applies to every match.

pub mod json6902;
pub mod strategic;

use log::{debug, warn};
use serde::Deserialize;
use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};
use crate::kustomization::{Kustomization, PatchOptions};
use crate::loader::Loader;
use crate::merge::to_pointer;
use crate::merge::yaml::{get_str, remove_path, set_path};
use crate::resmap::ResourceMap;
use crate::resource::Resource;
use crate::selector::Selector;

use self::json6902::Operation;
use self::strategic::Directive;

/// The content of one patch, with its type detected.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// One or more partial documents.
    Strategic(Vec<YamlValue>),
    Json6902(Vec<Operation>),
}

impl Patch {
    /// Detect the patch type from its content: a sequence is a list of
    /// operations, mappings are strategic merge documents.
    pub fn parse(content: &str, label: &str) -> Result<Self> {
        let mut documents = Vec::new();
        for document in serde_yaml::Deserializer::from_str(content) {
            let value = YamlValue::deserialize(document).map_err(|e| Error::Patch {
                patch: label.to_string(),
                message: e.to_string(),
            })?;
            if !value.is_null() {
                documents.push(value);
            }
        }
        match documents.as_slice() {
            [] => Err(Error::Patch {
                patch: label.to_string(),
                message: "patch is empty".to_string(),
            }),
            [single] if single.is_sequence() => {
                Ok(Patch::Json6902(json6902::from_value(single.clone(), label)?))
            }
            docs if docs.iter().all(YamlValue::is_mapping) => Ok(Patch::Strategic(documents)),
            _ => Err(Error::Patch {
                patch: label.to_string(),
                message: "expected a list of operations or one or more mappings".to_string(),
            }),
        }
    }
}

/// Where a patch's text comes from.
fn load_content(loader: &Loader<'_>, path: Option<&str>, inline: Option<&str>) -> Result<(String, String)> {
    match (path, inline) {
        (Some(path), None) => Ok((loader.load_string(path)?, path.to_string())),
        (None, Some(inline)) => Ok((inline.to_string(), "<inline patch>".to_string())),
        _ => Err(Error::Patch {
            patch: path.unwrap_or("<inline patch>").to_string(),
            message: "exactly one of 'path' or 'patch' must be set".to_string(),
        }),
    }
}

/// `patchesStrategicMerge` entries are file paths or inline documents.
fn is_inline(entry: &str) -> bool {
    let trimmed = entry.trim_start();
    entry.contains('\n') || trimmed.starts_with('{') || trimmed.starts_with('[')
}

/// Run every patch of `kustomization`.
pub fn run(kustomization: &Kustomization, loader: &Loader<'_>, resmap: &mut ResourceMap) -> Result<()> {
    for entry in &kustomization.patches_strategic_merge {
        let (content, label) = if is_inline(entry) {
            (entry.clone(), "<inline patch>".to_string())
        } else {
            (loader.load_string(entry)?, entry.clone())
        };
        match Patch::parse(&content, &label)? {
            Patch::Strategic(docs) => {
                for doc in docs {
                    apply_untargeted(resmap, &doc, &label)?;
                }
            }
            Patch::Json6902(_) => {
                return Err(Error::Patch {
                    patch: label,
                    message: "patchesStrategicMerge entries must be mappings".to_string(),
                })
            }
        }
    }

    for entry in &kustomization.patches_json6902 {
        let (content, label) = load_content(loader, entry.path.as_deref(), entry.patch.as_deref())?;
        let target = entry.target.as_ref().ok_or_else(|| Error::Patch {
            patch: label.clone(),
            message: "patchesJson6902 entries need a target".to_string(),
        })?;
        let ops = json6902::parse(&content, &label)?;
        let index = unique_match(resmap, target, &label)?;
        apply_ops(resmap, index, &ops, &label, PatchOptions::default())?;
    }

    for entry in &kustomization.patches {
        let (content, label) = load_content(loader, entry.path.as_deref(), entry.patch.as_deref())?;
        let options = entry.options.unwrap_or_default();
        let patch = Patch::parse(&content, &label)?;
        match (&entry.target, patch) {
            (Some(target), patch) => apply_targeted(resmap, target, &patch, &label, options)?,
            (None, Patch::Strategic(docs)) => {
                for doc in docs {
                    apply_untargeted(resmap, &doc, &label)?;
                }
            }
            (None, Patch::Json6902(_)) => {
                return Err(Error::Patch {
                    patch: label,
                    message: "a list of operations needs a 'target'".to_string(),
                })
            }
        }
    }
    Ok(())
}

fn unique_match(resmap: &ResourceMap, target: &Selector, label: &str) -> Result<usize> {
    let matches = resmap.select(target)?;
    match matches.as_slice() {
        [index] => Ok(*index),
        [] => Err(Error::PatchTargetNotFound {
            patch: label.to_string(),
            target: target.to_string(),
        }),
        _ => Err(Error::AmbiguousPatchTarget {
            patch: label.to_string(),
            target: target.to_string(),
            candidates: describe(resmap, &matches),
        }),
    }
}

fn describe(resmap: &ResourceMap, indices: &[usize]) -> String {
    indices
        .iter()
        .filter_map(|i| resmap.get(*i))
        .map(|r| r.id().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Find the single resource a strategic merge document names and merge it.
fn apply_untargeted(resmap: &mut ResourceMap, doc: &YamlValue, label: &str) -> Result<()> {
    let kind = get_str(doc, &["kind"]).unwrap_or_default().to_string();
    let name = get_str(doc, &["metadata", "name"]).unwrap_or_default().to_string();
    if kind.is_empty() || name.is_empty() {
        return Err(Error::Patch {
            patch: label.to_string(),
            message: "a patch without a target must set 'kind' and 'metadata.name'".to_string(),
        });
    }
    let namespace = get_str(doc, &["metadata", "namespace"]).map(str::to_string);
    let api_version = get_str(doc, &["apiVersion"]).map(str::to_string);

    let matches = resmap.positions(|r| {
        r.kind() == kind
            && api_version
                .as_deref()
                .is_none_or(|v| r.gvk().api_version() == v)
            && r.any_id(|id| {
                id.name == name
                    && namespace
                        .as_deref()
                        .is_none_or(|ns| id.namespace.as_deref().unwrap_or("default") == ns)
            })
    });
    let target = format!("{} '{}'", kind, name);
    let index = match matches.as_slice() {
        [index] => *index,
        [] => {
            return Err(Error::PatchTargetNotFound {
                patch: label.to_string(),
                target,
            })
        }
        _ => {
            return Err(Error::AmbiguousPatchTarget {
                patch: label.to_string(),
                target,
                candidates: describe(resmap, &matches),
            })
        }
    };
    apply_document(resmap, index, doc, label, PatchOptions::default())?;
    Ok(())
}

fn apply_targeted(
    resmap: &mut ResourceMap,
    target: &Selector,
    patch: &Patch,
    label: &str,
    options: PatchOptions,
) -> Result<()> {
    let matches = resmap.select(target)?;
    if matches.is_empty() {
        debug!("Patch {} matched no resources for {}", label, target);
    }
    // Walk backwards so deletions don't shift pending indices.
    for index in matches.into_iter().rev() {
        match patch {
            Patch::Strategic(docs) => {
                for doc in docs {
                    if !apply_document(resmap, index, doc, label, options)? {
                        break;
                    }
                }
            }
            Patch::Json6902(ops) => apply_ops(resmap, index, ops, label, options)?,
        }
    }
    Ok(())
}

/// Merge one strategic document into the resource at `index`. Returns
/// `false` if the document deleted the resource.
fn apply_document(
    resmap: &mut ResourceMap,
    index: usize,
    doc: &YamlValue,
    label: &str,
    options: PatchOptions,
) -> Result<bool> {
    if strategic::directive(doc)? == Directive::Delete {
        let removed = resmap.remove(index);
        debug!("Patch {} deleted {}", label, removed.id());
        return Ok(false);
    }
    let resource = resmap.get_mut(index).ok_or_else(|| Error::Patch {
        patch: label.to_string(),
        message: format!("resource index {} out of range", index),
    })?;
    let merged = strategic::merge(resource.value(), doc).map_err(|e| relabel(e, label))?;
    commit(resource, merged, label, options)?;
    Ok(true)
}

fn apply_ops(
    resmap: &mut ResourceMap,
    index: usize,
    ops: &[Operation],
    label: &str,
    options: PatchOptions,
) -> Result<()> {
    let resource = resmap.get_mut(index).ok_or_else(|| Error::Patch {
        patch: label.to_string(),
        message: format!("resource index {} out of range", index),
    })?;
    let mut value = resource.value().clone();
    json6902::apply(&mut value, ops, &format!("{} on {}", label, resource.id()))?;
    commit(resource, value, label, options)
}

fn relabel(error: Error, label: &str) -> Error {
    match error {
        Error::Patch { message, .. } => Error::Patch {
            patch: label.to_string(),
            message,
        },
        other => other,
    }
}

/// Write a patched document back, keeping the resource's identity unless
/// the options allow it to change. A patch that names the resource by an
/// earlier id is restored silently.
fn commit(resource: &mut Resource, mut patched: YamlValue, label: &str, options: PatchOptions) -> Result<()> {
    let id = resource.id();
    let api_version = get_str(resource.value(), &["apiVersion"]).map(str::to_string);
    let fields: [(&[&str], Option<String>, bool); 4] = [
        (
            &["metadata", "name"],
            Some(id.name.clone()),
            options.allow_name_change,
        ),
        (&["metadata", "namespace"], id.namespace.clone(), false),
        (&["kind"], Some(id.gvk.kind.clone()), options.allow_kind_change),
        (&["apiVersion"], api_version, options.allow_kind_change),
    ];

    for (path, original, allowed) in fields {
        let current = get_str(&patched, path).map(str::to_string);
        if allowed || current == original {
            continue;
        }
        let historical = current.as_deref().is_some_and(|value| {
            resource.any_id(|old| match path {
                ["metadata", "name"] => old.name == value,
                ["metadata", "namespace"] => old.effective_namespace().unwrap_or("default") == value,
                ["kind"] => old.gvk.kind == value,
                _ => old.gvk.api_version() == value,
            })
        });
        if !historical {
            warn!(
                "Patch {} tried to change {} of {}; change ignored",
                label,
                to_pointer(path),
                id
            );
        }
        match original {
            Some(value) => set_path(&mut patched, path, YamlValue::String(value))?,
            None => {
                remove_path(&mut patched, path);
            }
        }
    }

    for required in [&["kind"][..], &["metadata", "name"][..]] {
        if get_str(&patched, required).is_none_or(str::is_empty) {
            return Err(Error::Patch {
                patch: label.to_string(),
                message: format!("patch removed {} from {}", to_pointer(required), id),
            });
        }
    }
    resource.replace_value(patched);
    Ok(())
}
