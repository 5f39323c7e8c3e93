//! # Edit Command Implementation
//!
//! Edits an existing kustomization file in place.
//!
//! ```bash
//! overkube edit set image nginx=registry.local/nginx:1.25
//! overkube edit set replicas web=3
//! overkube edit add resource service.yaml
//! overkube edit add label app:web,tier:frontend
//! overkube edit add patch --path replicas.yaml --kind Deployment --name web
//! ```
//!
//! The file is rewritten from the parsed descriptor, so comments are not
//! preserved.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Subcommand};

use overkube::filesystem::DiskFS;
use overkube::kustomization::{self, ImageOverride, Kustomization, PatchEntry, PatchOptions, ReplicaOverride};
use overkube::output::{marker, OutputConfig, Status};
use overkube::path::{is_remote, join_relative};
use overkube::selector::Selector;
use overkube::transform::images::ImageRef;

use super::parse_pairs;

/// Edit an existing kustomization file
#[derive(Args, Debug)]
pub struct EditArgs {
    /// Directory containing the kustomization file
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    #[command(subcommand)]
    pub action: EditAction,
}

#[derive(Subcommand, Debug)]
pub enum EditAction {
    /// Set a value, replacing any previous one
    #[command(subcommand)]
    Set(SetTarget),

    /// Add entries to a list or map
    #[command(subcommand)]
    Add(AddTarget),
}

#[derive(Subcommand, Debug)]
pub enum SetTarget {
    /// Override images, written as NAME[=NEWNAME][:TAG][@DIGEST]
    Image {
        #[arg(required = true, value_name = "IMAGE")]
        images: Vec<String>,
    },
    /// Set the namespace of all resources
    Namespace { namespace: String },
    /// Set the name prefix
    Nameprefix { prefix: String },
    /// Set the name suffix
    Namesuffix { suffix: String },
    /// Set replica counts, written as NAME=COUNT
    Replicas {
        #[arg(required = true, value_name = "NAME=COUNT")]
        replicas: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum AddTarget {
    /// Add resource files or base directories
    Resource {
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<String>,
    },
    /// Add common labels as key:value pairs, comma-separated
    Label {
        pairs: String,
        /// Overwrite labels that are already set
        #[arg(long)]
        force: bool,
    },
    /// Add common annotations as key:value pairs, comma-separated
    Annotation {
        pairs: String,
        /// Overwrite annotations that are already set
        #[arg(long)]
        force: bool,
    },
    /// Add a patch file, optionally with a target selector
    Patch {
        /// Patch file, relative to the kustomization directory
        #[arg(long, value_name = "FILE")]
        path: String,
        #[command(flatten)]
        target: TargetArgs,
        /// Let the patch change the resource name
        #[arg(long)]
        allow_name_change: bool,
        /// Let the patch change the resource kind
        #[arg(long)]
        allow_kind_change: bool,
    },
}

/// Target selector fields of `add patch`.
#[derive(Args, Debug, Default, Clone)]
pub struct TargetArgs {
    #[arg(long)]
    pub group: Option<String>,
    #[arg(long)]
    pub version: Option<String>,
    #[arg(long)]
    pub kind: Option<String>,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub namespace: Option<String>,
    #[arg(long, value_name = "SELECTOR")]
    pub label_selector: Option<String>,
    #[arg(long, value_name = "SELECTOR")]
    pub annotation_selector: Option<String>,
}

impl TargetArgs {
    fn into_selector(self) -> Option<Selector> {
        let selector = Selector {
            group: self.group,
            version: self.version,
            kind: self.kind,
            name: self.name,
            namespace: self.namespace,
            label_selector: self.label_selector,
            annotation_selector: self.annotation_selector,
        };
        if selector.is_empty() {
            None
        } else {
            Some(selector)
        }
    }
}

/// Execute the `edit` command.
pub fn execute(args: EditArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let (path, mut k) = kustomization::load(&DiskFS, &args.dir)
        .map_err(|e| anyhow::anyhow!("Cannot edit: {}", e))?;

    let messages = apply(&mut k, args.action, &args.dir)?;
    fs::write(&path, k.to_yaml()?)?;
    for message in messages {
        println!("{} {}", marker(&out, Status::Ok), message);
    }
    Ok(())
}

/// Apply one edit to `k`. Returns a line per change made.
fn apply(k: &mut Kustomization, action: EditAction, dir: &Path) -> Result<Vec<String>> {
    let mut messages = Vec::new();
    match action {
        EditAction::Set(SetTarget::Image { images }) => {
            for spec in images {
                let image = parse_image_spec(&spec)?;
                messages.push(format!("Set image {}", spec));
                match k.images.iter_mut().find(|i| i.name == image.name) {
                    Some(existing) => *existing = image,
                    None => k.images.push(image),
                }
            }
        }
        EditAction::Set(SetTarget::Namespace { namespace }) => {
            messages.push(format!("Set namespace to '{}'", namespace));
            k.namespace = Some(namespace);
        }
        EditAction::Set(SetTarget::Nameprefix { prefix }) => {
            messages.push(format!("Set namePrefix to '{}'", prefix));
            k.name_prefix = Some(prefix);
        }
        EditAction::Set(SetTarget::Namesuffix { suffix }) => {
            messages.push(format!("Set nameSuffix to '{}'", suffix));
            k.name_suffix = Some(suffix);
        }
        EditAction::Set(SetTarget::Replicas { replicas }) => {
            for spec in replicas {
                let replica = parse_replica_spec(&spec)?;
                messages.push(format!("Set replicas of {} to {}", replica.name, replica.count));
                match k.replicas.iter_mut().find(|r| r.name == replica.name) {
                    Some(existing) => existing.count = replica.count,
                    None => k.replicas.push(replica),
                }
            }
        }
        EditAction::Add(AddTarget::Resource { paths }) => {
            for entry in paths {
                if is_remote(&entry) {
                    return Err(anyhow::anyhow!("remote resource '{}' is not supported", entry));
                }
                if k.resources.contains(&entry) {
                    messages.push(format!("Resource {} is already listed", entry));
                    continue;
                }
                if !join_relative(dir, &entry).exists() {
                    return Err(anyhow::anyhow!(
                        "resource '{}' does not exist in '{}'",
                        entry,
                        dir.display()
                    ));
                }
                messages.push(format!("Added resource {}", entry));
                k.resources.push(entry);
            }
        }
        EditAction::Add(AddTarget::Label { pairs, force }) => {
            for (key, value) in parse_pairs(&pairs)? {
                if k.common_labels.contains_key(&key) && !force {
                    return Err(anyhow::anyhow!(
                        "label '{}' is already set; use --force to overwrite",
                        key
                    ));
                }
                messages.push(format!("Added label {}={}", key, value));
                k.common_labels.insert(key, value);
            }
        }
        EditAction::Add(AddTarget::Annotation { pairs, force }) => {
            for (key, value) in parse_pairs(&pairs)? {
                if k.common_annotations.contains_key(&key) && !force {
                    return Err(anyhow::anyhow!(
                        "annotation '{}' is already set; use --force to overwrite",
                        key
                    ));
                }
                messages.push(format!("Added annotation {}={}", key, value));
                k.common_annotations.insert(key, value);
            }
        }
        EditAction::Add(AddTarget::Patch {
            path,
            target,
            allow_name_change,
            allow_kind_change,
        }) => {
            if !join_relative(dir, &path).is_file() {
                return Err(anyhow::anyhow!(
                    "patch file '{}' does not exist in '{}'",
                    path,
                    dir.display()
                ));
            }
            let target = target.into_selector();
            let options = (allow_name_change || allow_kind_change).then_some(PatchOptions {
                allow_name_change,
                allow_kind_change,
            });
            let entry = PatchEntry {
                path: Some(path.clone()),
                patch: None,
                target,
                options,
            };
            if k.patches.contains(&entry) {
                messages.push(format!("Patch {} is already listed", path));
            } else {
                messages.push(format!("Added patch {}", path));
                k.patches.push(entry);
            }
        }
    }
    Ok(messages)
}

/// Parse `NAME[=NEWNAME][:TAG][@DIGEST]`.
///
/// Without `=`, the tag and digest apply to NAME itself (`nginx:1.25`).
fn parse_image_spec(spec: &str) -> Result<ImageOverride> {
    let (name, replacement) = match spec.split_once('=') {
        Some((name, new)) => (name.to_string(), ImageRef::parse(new)),
        None => {
            let parsed = ImageRef::parse(spec);
            (parsed.name.clone(), parsed)
        }
    };
    if name.is_empty() {
        return Err(anyhow::anyhow!("invalid image '{}': missing name", spec));
    }
    let new_name = Some(replacement.name).filter(|n| !n.is_empty() && *n != name);
    if new_name.is_none() && replacement.tag.is_none() && replacement.digest.is_none() {
        return Err(anyhow::anyhow!(
            "invalid image '{}': nothing to set (expected a new name, tag or digest)",
            spec
        ));
    }
    Ok(ImageOverride {
        name,
        new_name,
        new_tag: replacement.tag,
        digest: replacement.digest,
    })
}

/// Parse `NAME=COUNT`.
fn parse_replica_spec(spec: &str) -> Result<ReplicaOverride> {
    let (name, count) = spec
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("invalid replicas '{}': expected NAME=COUNT", spec))?;
    let count: i64 = count
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid replicas '{}': count must be a number", spec))?;
    if name.trim().is_empty() || count < 0 {
        return Err(anyhow::anyhow!(
            "invalid replicas '{}': expected NAME=COUNT with COUNT >= 0",
            spec
        ));
    }
    Ok(ReplicaOverride {
        name: name.trim().to_string(),
        count,
    })
}
