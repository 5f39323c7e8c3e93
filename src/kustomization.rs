//! # Kustomization Descriptor
//!
//! This module defines the data structures that represent a
//! `kustomization.yaml` file and the logic for locating and parsing it.
//!
//! A descriptor lists the resources and bases that make up one layer of the
//! composition graph, plus the directives applied to everything that layer
//! accumulates:
//!
//! - **Resources**: files holding resource documents, or directories that
//!   contain their own kustomization (bases)
//! - **Transformer settings**: `namespace`, `namePrefix`, `nameSuffix`,
//!   `commonLabels`, `labels`, `commonAnnotations`, `images`, `replicas`
//! - **Patches**: `patchesStrategicMerge`, `patchesJson6902`, `patches`
//! - **Generators**: `configMapGenerator`, `secretGenerator`,
//!   `generatorOptions`
//! - **Output ordering**: `sortOptions`
//!
//! Fields this tool does not implement are kept in [`Kustomization::extra`]
//! and reported by [`Kustomization::warnings`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};
use crate::filesystem::FileSystem;
use crate::merge::yaml::scalar_to_string;
use crate::selector::Selector;

/// Descriptor file names, in priority order.
pub const KUSTOMIZATION_FILE_NAMES: &[&str] =
    &["kustomization.yaml", "kustomization.yml", "Kustomization"];

/// Fields that are silently accepted without being applied.
const IGNORED_FIELDS: &[&str] = &["metadata"];

/// Parsed `kustomization.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kustomization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
    /// Deprecated alias of `resources`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_suffix: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "deserialize_string_map"
    )]
    pub common_labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<LabelEntry>,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "deserialize_string_map"
    )]
    pub common_annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageOverride>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replicas: Vec<ReplicaOverride>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches_strategic_merge: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches_json6902: Vec<Json6902Entry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<PatchEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_map_generator: Vec<GeneratorArgs>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secret_generator: Vec<GeneratorArgs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator_options: Option<GeneratorOptions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_options: Option<SortOptions>,

    /// Unrecognized top-level fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, YamlValue>,
}

/// One entry of the `labels` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelEntry {
    #[serde(default, deserialize_with = "deserialize_string_map")]
    pub pairs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub include_selectors: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub include_templates: bool,
}

/// One entry of the `images` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageOverride {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_opt_scalar"
    )]
    pub new_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// One entry of the `replicas` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaOverride {
    pub name: String,
    pub count: i64,
}

/// One entry of the `patches` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Selector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<PatchOptions>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchOptions {
    #[serde(default)]
    pub allow_name_change: bool,
    #[serde(default)]
    pub allow_kind_change: bool,
}

/// One entry of the `patchesJson6902` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Json6902Entry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Selector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

/// A `configMapGenerator` or `secretGenerator` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub literals: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub envs: Vec<String>,
    /// Deprecated single-file form of `envs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub secret_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<GeneratorOptions>,
}

impl GeneratorArgs {
    /// Env files from both `envs` and the deprecated `env`.
    pub fn env_files(&self) -> impl Iterator<Item = &String> {
        self.envs.iter().chain(self.env.iter())
    }
}

/// How a generator interacts with an existing resource of the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Behavior {
    #[default]
    Create,
    Merge,
    Replace,
}

impl Behavior {
    pub fn parse(value: Option<&str>) -> Option<Self> {
        match value.unwrap_or("create") {
            "" | "create" => Some(Behavior::Create),
            "merge" => Some(Behavior::Merge),
            "replace" => Some(Behavior::Replace),
            _ => None,
        }
    }
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Behavior::Create => "create",
            Behavior::Merge => "merge",
            Behavior::Replace => "replace",
        };
        write!(f, "{}", name)
    }
}

/// Options shared by all generators of a kustomization, or set per
/// generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorOptions {
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "deserialize_string_map"
    )]
    pub labels: BTreeMap<String, String>,
    #[serde(
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "deserialize_string_map"
    )]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_name_suffix_hash: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immutable: Option<bool>,
}

impl GeneratorOptions {
    /// Layer `overrides` on top of `self`: maps are merged with the override
    /// winning, flags are taken from the override when set.
    pub fn merged_with(&self, overrides: Option<&GeneratorOptions>) -> GeneratorOptions {
        let mut merged = self.clone();
        if let Some(o) = overrides {
            merged.labels.extend(o.labels.clone());
            merged.annotations.extend(o.annotations.clone());
            if o.disable_name_suffix_hash.is_some() {
                merged.disable_name_suffix_hash = o.disable_name_suffix_hash;
            }
            if o.immutable.is_some() {
                merged.immutable = o.immutable;
            }
        }
        merged
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Legacy,
    Fifo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortOptions {
    #[serde(default)]
    pub order: SortOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_sort_options: Option<LegacySortOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySortOptions {
    #[serde(default)]
    pub order_first: Vec<String>,
    #[serde(default)]
    pub order_last: Vec<String>,
}

/// Accept label-like maps whose values are written as numbers or booleans.
fn deserialize_string_map<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, YamlValue>> = Option::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(|(k, v)| match v {
            YamlValue::Null => Ok((k, String::new())),
            other => scalar_to_string(&other)
                .map(|s| (k.clone(), s))
                .ok_or_else(|| serde::de::Error::custom(format!("value of '{}' must be a scalar", k))),
        })
        .collect()
}

fn deserialize_opt_scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<YamlValue> = Option::deserialize(deserializer)?;
    match raw {
        None | Some(YamlValue::Null) => Ok(None),
        Some(value) => scalar_to_string(&value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("expected a scalar value")),
    }
}

impl Kustomization {
    /// Resource entries in declared order: `resources`, then the deprecated
    /// `bases`.
    pub fn resource_entries(&self) -> impl Iterator<Item = &String> {
        self.resources.iter().chain(self.bases.iter())
    }

    /// Kustomization-level generator options, or the defaults.
    pub fn generator_defaults(&self) -> GeneratorOptions {
        self.generator_options.clone().unwrap_or_default()
    }

    /// Check the descriptor for structural errors.
    pub fn validate(&self, path: &Path) -> Result<()> {
        let fail = |message: String, hint: Option<&str>| Error::KustomizationParse {
            path: path.display().to_string(),
            message,
            hint: hint.map(str::to_string),
        };

        for (i, image) in self.images.iter().enumerate() {
            if image.name.trim().is_empty() {
                return Err(fail(
                    format!("images[{}] has no name", i),
                    Some("set 'name' to the image reference to replace"),
                ));
            }
        }
        for (i, replica) in self.replicas.iter().enumerate() {
            if replica.count < 0 {
                return Err(fail(
                    format!(
                        "replicas[{}] ({}) has a negative count {}",
                        i, replica.name, replica.count
                    ),
                    None,
                ));
            }
        }
        for (i, patch) in self.patches.iter().enumerate() {
            if patch.path.is_some() == patch.patch.is_some() {
                return Err(fail(
                    format!("patches[{}] must set exactly one of 'path' or 'patch'", i),
                    None,
                ));
            }
        }
        for (i, patch) in self.patches_json6902.iter().enumerate() {
            if patch.target.is_none() {
                return Err(fail(format!("patchesJson6902[{}] has no target", i), None));
            }
            if patch.path.is_some() == patch.patch.is_some() {
                return Err(fail(
                    format!(
                        "patchesJson6902[{}] must set exactly one of 'path' or 'patch'",
                        i
                    ),
                    None,
                ));
            }
        }
        let generators = self
            .config_map_generator
            .iter()
            .map(|g| ("configMapGenerator", g))
            .chain(self.secret_generator.iter().map(|g| ("secretGenerator", g)));
        for (field, generator) in generators {
            let name = generator.name.as_deref().unwrap_or_default();
            if name.is_empty() {
                return Err(fail(format!("{} entry has no name", field), None));
            }
            if Behavior::parse(generator.behavior.as_deref()).is_none() {
                return Err(fail(
                    format!(
                        "{} '{}' has invalid behavior '{}'",
                        field,
                        name,
                        generator.behavior.as_deref().unwrap_or_default()
                    ),
                    Some("behavior must be one of: create, merge, replace"),
                ));
            }
        }
        Ok(())
    }

    /// Deprecated and unsupported fields, as human-readable messages.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.bases.is_empty() {
            warnings.push("'bases' is deprecated; list bases under 'resources'".to_string());
        }
        if !self.common_labels.is_empty() && !self.labels.is_empty() {
            warnings.push(
                "both 'commonLabels' and 'labels' are set; 'commonLabels' is applied first"
                    .to_string(),
            );
        }
        for generator in self
            .config_map_generator
            .iter()
            .chain(self.secret_generator.iter())
        {
            if generator.env.is_some() {
                warnings.push(format!(
                    "generator '{}': 'env' is deprecated; use 'envs'",
                    generator.name.as_deref().unwrap_or_default()
                ));
            }
        }
        for key in self.extra.keys() {
            if IGNORED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            warnings.push(format!("field '{}' is not supported and will be ignored", key));
        }
        warnings
    }

    /// Serialize back to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Parse descriptor content. `path` is used in error messages.
pub fn parse(content: &str, path: &Path) -> Result<Kustomization> {
    if content.trim().is_empty() {
        return Ok(Kustomization::default());
    }
    let kustomization: Kustomization =
        serde_yaml::from_str(content).map_err(|e| Error::KustomizationParse {
            path: path.display().to_string(),
            message: e.to_string(),
            hint: Some("check the field names and types against the kustomization format".to_string()),
        })?;

    match kustomization.kind.as_deref() {
        None | Some("") | Some("Kustomization") => Ok(kustomization),
        Some("Component") => Err(Error::KustomizationParse {
            path: path.display().to_string(),
            message: "kind 'Component' is not supported".to_string(),
            hint: Some("move the component's content into a regular base".to_string()),
        }),
        Some(other) => Err(Error::KustomizationParse {
            path: path.display().to_string(),
            message: format!("unexpected kind '{}'", other),
            hint: Some("kind must be 'Kustomization' or absent".to_string()),
        }),
    }
}

/// Locate the descriptor file in `dir`.
pub fn find_file(fs: &dyn FileSystem, dir: &Path) -> Result<PathBuf> {
    let mut found: Vec<PathBuf> = KUSTOMIZATION_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .filter(|p| fs.is_file(p))
        .collect();

    match found.len() {
        0 => Err(Error::MissingKustomization {
            dir: dir.display().to_string(),
            expected: KUSTOMIZATION_FILE_NAMES.join(", "),
        }),
        1 => Ok(found.remove(0)),
        _ => Err(Error::MultipleKustomizations {
            dir: dir.display().to_string(),
            found: found
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

/// Whether `dir` contains a descriptor file.
pub fn has_kustomization(fs: &dyn FileSystem, dir: &Path) -> bool {
    KUSTOMIZATION_FILE_NAMES
        .iter()
        .any(|name| fs.is_file(&dir.join(name)))
}

/// Locate, read and parse the descriptor in `dir`.
pub fn load(fs: &dyn FileSystem, dir: &Path) -> Result<(PathBuf, Kustomization)> {
    let path = find_file(fs, dir)?;
    let content = fs.read_to_string(&path)?;
    let kustomization = parse(&content, &path)?;
    Ok((path, kustomization))
}
