//! # Create Command Implementation
//!
//! Writes a new `kustomization.yaml` into a directory.
//!
//! ## Functionality
//!
//! - **Explicit Resources**: `--resources a.yaml,b.yaml` lists resources.
//! - **Autodetect**: `--autodetect` adds every YAML file in the directory
//!   that parses as resource documents. With `--recursive` subdirectories
//!   are searched too, and a subdirectory holding its own kustomization is
//!   added as a base instead of being searched.
//! - **Transformers**: `--namespace`, `--name-prefix`, `--name-suffix`,
//!   `--labels` and `--annotations` fill the matching fields.
//!
//! The command refuses to overwrite an existing kustomization.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use walkdir::WalkDir;

use overkube::filesystem::DiskFS;
use overkube::kustomization::{self, Kustomization, KUSTOMIZATION_FILE_NAMES};
use overkube::output::{marker, OutputConfig, Status};
use overkube::path::glob_match;
use overkube::resource::parse_documents;

use super::parse_pairs;

/// File patterns considered by `--autodetect`.
const RESOURCE_PATTERNS: &[&str] = &["*.yaml", "*.yml"];

/// Directories never searched by `--autodetect`.
const SKIP_DIRS: &[&str] = &[".git", "node_modules", "target"];

/// Create a new kustomization file
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Directory to create the kustomization in
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Add the resource files found in the directory
    #[arg(long)]
    pub autodetect: bool,

    /// With --autodetect, also search subdirectories
    #[arg(long, requires = "autodetect")]
    pub recursive: bool,

    /// Comma-separated resource paths to list
    #[arg(long, value_name = "PATHS", value_delimiter = ',')]
    pub resources: Vec<String>,

    /// Namespace for all resources
    #[arg(long, value_name = "NAMESPACE")]
    pub namespace: Option<String>,

    /// Prefix for all resource names
    #[arg(long, value_name = "PREFIX")]
    pub name_prefix: Option<String>,

    /// Suffix for all resource names
    #[arg(long, value_name = "SUFFIX")]
    pub name_suffix: Option<String>,

    /// Common labels as key:value pairs, comma-separated
    #[arg(long, value_name = "PAIRS")]
    pub labels: Option<String>,

    /// Common annotations as key:value pairs, comma-separated
    #[arg(long, value_name = "PAIRS")]
    pub annotations: Option<String>,
}

/// Execute the `create` command.
pub fn execute(args: CreateArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    if !args.dir.is_dir() {
        return Err(anyhow::anyhow!(
            "Directory '{}' does not exist",
            args.dir.display()
        ));
    }
    if kustomization::has_kustomization(&DiskFS, &args.dir) {
        return Err(anyhow::anyhow!(
            "A kustomization file already exists in '{}'",
            args.dir.display()
        ));
    }

    let k = build_kustomization(&args)?;
    let path = args.dir.join(KUSTOMIZATION_FILE_NAMES[0]);
    fs::write(&path, k.to_yaml()?)?;
    println!(
        "{} Created {} with {} resource(s)",
        marker(&out, Status::Ok),
        path.display(),
        k.resources.len()
    );
    Ok(())
}

fn build_kustomization(args: &CreateArgs) -> Result<Kustomization> {
    let mut resources: Vec<String> = args
        .resources
        .iter()
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();
    if args.autodetect {
        for found in detect_resources(&args.dir, args.recursive)? {
            if !resources.contains(&found) {
                resources.push(found);
            }
        }
    }

    let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
    Ok(Kustomization {
        api_version: Some("kustomize.config.k8s.io/v1beta1".to_string()),
        kind: Some("Kustomization".to_string()),
        resources,
        namespace: non_empty(&args.namespace),
        name_prefix: non_empty(&args.name_prefix),
        name_suffix: non_empty(&args.name_suffix),
        common_labels: match &args.labels {
            Some(raw) => parse_pairs(raw)?.into_iter().collect(),
            None => Default::default(),
        },
        common_annotations: match &args.annotations {
            Some(raw) => parse_pairs(raw)?.into_iter().collect(),
            None => Default::default(),
        },
        ..Kustomization::default()
    })
}

/// Resource files (and, when recursive, base directories) below `dir`, as
/// `/`-separated paths relative to `dir`, sorted by path.
pub fn detect_resources(dir: &Path, recursive: bool) -> Result<Vec<String>> {
    let mut found = Vec::new();
    let mut walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name()
        .into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let rel = relative(entry.path(), dir);

        if entry.file_type().is_dir() {
            if name.starts_with('.') || SKIP_DIRS.contains(&name.as_str()) {
                walker.skip_current_dir();
            } else if recursive && kustomization::has_kustomization(&DiskFS, entry.path()) {
                found.push(rel);
                walker.skip_current_dir();
            }
            continue;
        }

        if KUSTOMIZATION_FILE_NAMES.contains(&name.as_str()) {
            continue;
        }
        let mut matches = false;
        for pattern in RESOURCE_PATTERNS {
            matches |= glob_match(pattern, &name)?;
        }
        if !matches {
            continue;
        }
        let content = match fs::read_to_string(entry.path()) {
            Ok(content) => content,
            Err(_) => continue,
        };
        if parse_documents(&content, entry.path()).is_ok_and(|docs| !docs.is_empty()) {
            found.push(rel);
        } else {
            log::debug!("Skipping {}: not a resource file", entry.path().display());
        }
    }
    Ok(found)
}

fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
