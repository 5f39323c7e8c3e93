//! # ConfigMap and Secret Generators
//!
//! Generators turn literals, files and env files into ConfigMap and Secret
//! resources. Generated resources are flagged for a content-hash name
//! suffix, which [`apply_name_hashes`] appends once the top-level build has
//! finished, so overlays that merge into a base generator change the hash.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::debug;
use regex::Regex;
use serde_yaml::{Mapping, Value as YamlValue};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::kustomization::{Behavior, GeneratorArgs, GeneratorOptions, Kustomization};
use crate::loader::Loader;
use crate::merge::yaml::{ensure_mapping, get_path, get_str, navigate_or_create, string_mapping};
use crate::resmap::ResourceMap;
use crate::resource::Resource;

const KEY_PATTERN: &str = r"^[-._a-zA-Z0-9]+$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GeneratedKind {
    ConfigMap,
    Secret,
}

impl GeneratedKind {
    fn as_str(self) -> &'static str {
        match self {
            GeneratedKind::ConfigMap => "ConfigMap",
            GeneratedKind::Secret => "Secret",
        }
    }
}

/// Collected key/value data for one generator.
#[derive(Debug, Default)]
struct GeneratedData {
    data: BTreeMap<String, String>,
    binary_data: BTreeMap<String, String>,
}

/// Run every generator of `kustomization` against `resmap`.
pub fn run(kustomization: &Kustomization, loader: &Loader<'_>, resmap: &mut ResourceMap) -> Result<()> {
    let defaults = kustomization.generator_defaults();
    let key_re = Regex::new(KEY_PATTERN)?;

    let generators = kustomization
        .config_map_generator
        .iter()
        .map(|g| (GeneratedKind::ConfigMap, g))
        .chain(
            kustomization
                .secret_generator
                .iter()
                .map(|g| (GeneratedKind::Secret, g)),
        );

    for (kind, args) in generators {
        let name = args.name.as_deref().unwrap_or_default();
        let label = format!("{} '{}'", kind.as_str(), name);
        if name.is_empty() {
            return Err(Error::Generator {
                generator: kind.as_str().to_string(),
                message: "generator has no name".to_string(),
            });
        }
        let behavior = Behavior::parse(args.behavior.as_deref()).ok_or_else(|| Error::Generator {
            generator: label.clone(),
            message: format!(
                "invalid behavior '{}'",
                args.behavior.as_deref().unwrap_or_default()
            ),
        })?;

        let options = defaults.merged_with(args.options.as_ref());
        let data = collect_data(kind, args, loader, &key_re, &label)?;
        let resource = build_resource(kind, args, &options, data)?;
        debug!("Generated {} with behavior {}", label, behavior);

        match behavior {
            Behavior::Create => resmap.append(resource)?,
            Behavior::Merge | Behavior::Replace => {
                let index = find_existing(resmap, kind, args, &label)?;
                let explicit_hash = args
                    .options
                    .as_ref()
                    .and_then(|o| o.disable_name_suffix_hash)
                    .map(|disabled| !disabled);
                let existing = resmap.get_mut(index).ok_or_else(|| Error::Generator {
                    generator: label.clone(),
                    message: "existing resource disappeared".to_string(),
                })?;
                combine(existing, &resource, behavior)?;
                if let Some(needs_hash) = explicit_hash {
                    existing.set_needs_hash(needs_hash);
                }
            }
        }
    }
    Ok(())
}

fn find_existing(
    resmap: &ResourceMap,
    kind: GeneratedKind,
    args: &GeneratorArgs,
    label: &str,
) -> Result<usize> {
    let name = args.name.as_deref().unwrap_or_default();
    let namespace = args.namespace.as_deref();
    let matches = resmap.positions(|r| {
        r.kind() == kind.as_str()
            && r.any_id(|id| {
                id.name == name && (namespace.is_none() || id.namespace.as_deref() == namespace)
            })
    });
    match matches.as_slice() {
        [index] => Ok(*index),
        [] => Err(Error::Generator {
            generator: label.to_string(),
            message: format!(
                "behavior '{}' requires an existing {} named '{}'",
                args.behavior.as_deref().unwrap_or_default(),
                kind.as_str(),
                name
            ),
        }),
        _ => Err(Error::Generator {
            generator: label.to_string(),
            message: format!("{} existing resources match; set 'namespace'", matches.len()),
        }),
    }
}

/// Merge or replace the data of `existing` with that of `generated`.
fn combine(existing: &mut Resource, generated: &Resource, behavior: Behavior) -> Result<()> {
    let mut value = existing.value().clone();
    for section in ["data", "binaryData"] {
        let incoming = get_path(generated.value(), &[section]).and_then(YamlValue::as_mapping);
        let root = ensure_mapping(&mut value, "document")?;
        match behavior {
            Behavior::Replace => {
                root.remove(section);
                if let Some(incoming) = incoming {
                    root.insert(section.into(), YamlValue::Mapping(incoming.clone()));
                }
            }
            _ => {
                if let Some(incoming) = incoming {
                    let slot = root
                        .entry(YamlValue::String(section.to_string()))
                        .or_insert(YamlValue::Null);
                    let target = ensure_mapping(slot, section)?;
                    for (k, v) in incoming {
                        target.insert(k.clone(), v.clone());
                    }
                }
            }
        }
    }
    for section in ["labels", "annotations"] {
        if let Some(incoming) =
            get_path(generated.value(), &["metadata", section]).and_then(YamlValue::as_mapping)
        {
            let slot = navigate_or_create(&mut value, &["metadata", section])?;
            let target = ensure_mapping(slot, section)?;
            for (k, v) in incoming {
                target.insert(k.clone(), v.clone());
            }
        }
    }
    if let Some(secret_type) = get_str(generated.value(), &["type"]) {
        if behavior == Behavior::Replace {
            ensure_mapping(&mut value, "document")?
                .insert("type".into(), YamlValue::String(secret_type.to_string()));
        }
    }
    existing.replace_value(value);
    Ok(())
}

fn collect_data(
    kind: GeneratedKind,
    args: &GeneratorArgs,
    loader: &Loader<'_>,
    key_re: &Regex,
    label: &str,
) -> Result<GeneratedData> {
    let mut out = GeneratedData::default();
    let fail = |message: String| Error::Generator {
        generator: label.to_string(),
        message,
    };

    let insert = |out: &mut GeneratedData, key: String, bytes: Vec<u8>| -> Result<()> {
        if !key_re.is_match(&key) {
            return Err(fail(format!(
                "invalid key '{}': keys must consist of alphanumerics, '-', '_' or '.'",
                key
            )));
        }
        if out.data.contains_key(&key) || out.binary_data.contains_key(&key) {
            return Err(fail(format!("duplicate key '{}'", key)));
        }
        match (kind, String::from_utf8(bytes)) {
            (GeneratedKind::Secret, Ok(text)) => {
                out.data.insert(key, STANDARD.encode(text.as_bytes()));
            }
            (GeneratedKind::Secret, Err(e)) => {
                out.data.insert(key, STANDARD.encode(e.into_bytes()));
            }
            (GeneratedKind::ConfigMap, Ok(text)) => {
                out.data.insert(key, text);
            }
            (GeneratedKind::ConfigMap, Err(e)) => {
                out.binary_data.insert(key, STANDARD.encode(e.into_bytes()));
            }
        }
        Ok(())
    };

    for literal in &args.literals {
        let (key, value) = parse_literal(literal)
            .ok_or_else(|| fail(format!("literal '{}' must be of the form key=value", literal)))?;
        insert(&mut out, key, value.into_bytes())?;
    }

    for source in &args.files {
        let (key, path) = match source.split_once('=') {
            Some((key, path)) => (key.trim().to_string(), path.trim()),
            None => {
                let file_name = std::path::Path::new(source)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| fail(format!("file source '{}' has no file name", source)))?;
                (file_name, source.as_str())
            }
        };
        if key.is_empty() {
            return Err(fail(format!("file source '{}' has an empty key", source)));
        }
        let bytes = loader.load_bytes(path)?;
        insert(&mut out, key, bytes)?;
    }

    for env_file in args.env_files() {
        let content = loader.load_string(env_file)?;
        for (key, value) in parse_env_file(&content, |k| std::env::var(k).ok()) {
            insert(&mut out, key, value.into_bytes())?;
        }
    }

    Ok(out)
}

/// Split `key=value`, removing one pair of matching quotes around the value.
fn parse_literal(literal: &str) -> Option<(String, String)> {
    let (key, value) = literal.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let value = value.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| value.strip_prefix(*q).and_then(|v| v.strip_suffix(*q)))
        .filter(|_| value.len() >= 2)
        .unwrap_or(value);
    Some((key.to_string(), unquoted.to_string()))
}

/// Parse dotenv content. Blank lines and `#` comments are skipped; a line
/// with no `=` takes its value from `lookup`, and is skipped when that
/// yields nothing.
fn parse_env_file<F>(content: &str, lookup: F) -> Vec<(String, String)>
where
    F: Fn(&str) -> Option<String>,
{
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    content
        .lines()
        .map(str::trim_start)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| match line.split_once('=') {
            Some((key, value)) => Some((key.trim().to_string(), value.to_string())),
            None => {
                let key = line.trim();
                let value = lookup(key);
                if value.is_none() {
                    debug!("Skipping env key '{}': not set in the environment", key);
                }
                value.map(|v| (key.to_string(), v))
            }
        })
        .collect()
}

fn build_resource(
    kind: GeneratedKind,
    args: &GeneratorArgs,
    options: &GeneratorOptions,
    data: GeneratedData,
) -> Result<Resource> {
    let mut metadata = Mapping::new();
    metadata.insert(
        "name".into(),
        YamlValue::String(args.name.clone().unwrap_or_default()),
    );
    if let Some(ns) = args.namespace.as_ref().filter(|ns| !ns.is_empty()) {
        metadata.insert("namespace".into(), YamlValue::String(ns.clone()));
    }
    if !options.labels.is_empty() {
        metadata.insert(
            "labels".into(),
            YamlValue::Mapping(string_mapping(&options.labels)),
        );
    }
    if !options.annotations.is_empty() {
        metadata.insert(
            "annotations".into(),
            YamlValue::Mapping(string_mapping(&options.annotations)),
        );
    }

    let mut doc = Mapping::new();
    doc.insert("apiVersion".into(), "v1".into());
    doc.insert("kind".into(), kind.as_str().into());
    doc.insert("metadata".into(), YamlValue::Mapping(metadata));
    if kind == GeneratedKind::Secret {
        doc.insert(
            "type".into(),
            YamlValue::String(args.secret_type.clone().unwrap_or_else(|| "Opaque".to_string())),
        );
    }
    if !data.data.is_empty() {
        doc.insert("data".into(), YamlValue::Mapping(string_mapping(&data.data)));
    }
    if !data.binary_data.is_empty() {
        doc.insert(
            "binaryData".into(),
            YamlValue::Mapping(string_mapping(&data.binary_data)),
        );
    }
    if options.immutable == Some(true) {
        doc.insert("immutable".into(), YamlValue::Bool(true));
    }

    let mut resource = Resource::from_value(YamlValue::Mapping(doc))?;
    resource.set_needs_hash(options.disable_name_suffix_hash != Some(true));
    Ok(resource)
}

/// Content hash used as a generated resource's name suffix.
///
/// The input is the canonical JSON (sorted keys) of the fields that define
/// the resource's content. The first ten hex digits of its sha256 are
/// re-encoded so the suffix never looks like a number or a bad word.
pub fn content_hash(resource: &Resource) -> Result<String> {
    let value = resource.value();
    let mut input = serde_json::Map::new();
    input.insert("kind".into(), resource.kind().into());
    input.insert("name".into(), resource.name().into());
    match resource.kind() {
        "ConfigMap" => {
            input.insert("data".into(), json_section(value, "data")?);
            if let Some(binary) = get_path(value, &["binaryData"]).filter(|v| !v.is_null()) {
                input.insert("binaryData".into(), serde_json::to_value(binary)?);
            }
        }
        "Secret" => {
            input.insert(
                "type".into(),
                get_str(value, &["type"]).unwrap_or("Opaque").into(),
            );
            input.insert("data".into(), json_section(value, "data")?);
        }
        _ => {
            input.insert("content".into(), serde_json::to_value(value)?);
        }
    }
    let canonical = serde_json::to_string(&serde_json::Value::Object(input))?;
    let digest = Sha256::digest(canonical.as_bytes());
    let hex = format!("{:x}", digest);
    Ok(encode_hash(&hex[..10]))
}

fn json_section(value: &YamlValue, section: &str) -> Result<serde_json::Value> {
    match get_path(value, &[section]) {
        Some(v) if !v.is_null() => Ok(serde_json::to_value(v)?),
        _ => Ok(serde_json::Value::String(String::new())),
    }
}

fn encode_hash(hex: &str) -> String {
    hex.chars()
        .map(|c| match c {
            '0' => 'g',
            '1' => 'h',
            '3' => 'k',
            'a' => 'm',
            'e' => 't',
            other => other,
        })
        .collect()
}

/// Append the content hash to the name of every resource flagged for it.
pub fn apply_name_hashes(resmap: &mut ResourceMap) -> Result<()> {
    for resource in resmap.iter_mut().filter(|r| r.needs_hash()) {
        let hash = content_hash(resource)?;
        let hashed = format!("{}-{}", resource.name(), hash);
        debug!("Hashed {} -> {}", resource.id(), hashed);
        resource.set_name(&hashed)?;
        resource.set_needs_hash(false);
    }
    Ok(())
}
