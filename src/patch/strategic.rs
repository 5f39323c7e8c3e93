//! Strategic merge
//!
//! A structural merge of a partial document into a resource. Mappings merge
//! recursively and `null` deletes a key. Lists of well-known fields merge
//! element by element on a merge key; other lists are replaced. Directives
//! embedded in the patch adjust this:
//!
//! - `$patch: replace` on a mapping, or as a list element, replaces instead
//!   of merging.
//! - `$patch: delete` on a keyed list element removes the matching element.
//! - `$deleteFromPrimitiveList/<field>: [..]` removes values from a
//!   primitive list.

use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::{Error, Result};

const PATCH_DIRECTIVE: &str = "$patch";
const DELETE_FROM_PRIMITIVE_LIST: &str = "$deleteFromPrimitiveList/";
const SET_ELEMENT_ORDER: &str = "$setElementOrder/";
const RETAIN_KEYS: &str = "$retainKeys";

/// Lists merged as sets of scalars.
const PRIMITIVE_MERGE_LISTS: &[&str] = &["finalizers"];

/// Merge key of a list field, chosen by field name. `ports` is keyed on
/// `containerPort` in containers and on `port` in Services; the patch
/// element decides which.
fn merge_key(field: &str, element: &Mapping) -> Option<&'static str> {
    match field {
        "containers" | "initContainers" | "ephemeralContainers" | "volumes" | "env"
        | "imagePullSecrets" => Some("name"),
        "volumeMounts" => Some("mountPath"),
        "volumeDevices" => Some("devicePath"),
        "hostAliases" => Some("ip"),
        "conditions" => Some("type"),
        "ownerReferences" => Some("uid"),
        "ports" => {
            if element.contains_key("containerPort") {
                Some("containerPort")
            } else {
                Some("port")
            }
        }
        _ => None,
    }
}

/// What a top-level `$patch` directive asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Merge,
    Replace,
    Delete,
}

/// Read the `$patch` directive of a mapping.
pub fn directive(value: &YamlValue) -> Result<Directive> {
    match value.get(PATCH_DIRECTIVE) {
        None => Ok(Directive::Merge),
        Some(v) => match v.as_str() {
            Some("merge") => Ok(Directive::Merge),
            Some("replace") => Ok(Directive::Replace),
            Some("delete") => Ok(Directive::Delete),
            _ => Err(Error::Patch {
                patch: "strategic merge".to_string(),
                message: format!("unknown $patch directive {:?}", v),
            }),
        },
    }
}

/// Merge `patch` into `target`.
pub fn merge(target: &YamlValue, patch: &YamlValue) -> Result<YamlValue> {
    let mut out = target.clone();
    merge_value(&mut out, patch, None)?;
    Ok(out)
}

fn merge_value(target: &mut YamlValue, patch: &YamlValue, field: Option<&str>) -> Result<()> {
    match (target, patch) {
        (YamlValue::Mapping(t), YamlValue::Mapping(p)) => {
            if directive(patch)? == Directive::Replace {
                *t = strip_directives_mapping(p);
                return Ok(());
            }
            merge_mapping(t, p)
        }
        (YamlValue::Sequence(t), YamlValue::Sequence(p)) => {
            merge_sequence(t, p, field.unwrap_or_default())
        }
        (target, patch) => {
            *target = strip_directives(patch);
            Ok(())
        }
    }
}

fn merge_mapping(target: &mut Mapping, patch: &Mapping) -> Result<()> {
    for (key, value) in patch {
        let Some(key_str) = key.as_str() else {
            merge_entry(target, key, value)?;
            continue;
        };
        if key_str == PATCH_DIRECTIVE || key_str == RETAIN_KEYS || key_str.starts_with(SET_ELEMENT_ORDER) {
            continue;
        }
        if let Some(list_field) = key_str.strip_prefix(DELETE_FROM_PRIMITIVE_LIST) {
            if let (Some(YamlValue::Sequence(items)), Some(remove)) =
                (target.get_mut(list_field), value.as_sequence())
            {
                items.retain(|item| !remove.contains(item));
            }
            continue;
        }
        merge_entry(target, key, value)?;
    }
    Ok(())
}

fn merge_entry(target: &mut Mapping, key: &YamlValue, value: &YamlValue) -> Result<()> {
    if value.is_null() {
        target.remove(key);
        return Ok(());
    }
    if value.is_mapping() && directive(value)? == Directive::Delete {
        target.remove(key);
        return Ok(());
    }
    match target.get_mut(key) {
        Some(existing) => merge_value(existing, value, key.as_str()),
        None => {
            target.insert(key.clone(), strip_directives(value));
            Ok(())
        }
    }
}

fn merge_sequence(target: &mut Vec<YamlValue>, patch: &[YamlValue], field: &str) -> Result<()> {
    if PRIMITIVE_MERGE_LISTS.contains(&field) {
        for item in patch {
            if !target.contains(item) {
                target.push(item.clone());
            }
        }
        return Ok(());
    }

    let replace_marker = patch
        .iter()
        .any(|e| is_marker(e) && directive_of(e) == Some(Directive::Replace));
    let keyed = patch
        .iter()
        .filter_map(YamlValue::as_mapping)
        .find_map(|m| merge_key(field, m));

    let Some(key) = keyed.filter(|_| !replace_marker) else {
        *target = patch
            .iter()
            .filter(|e| !is_marker(e))
            .map(strip_directives)
            .collect();
        return Ok(());
    };

    for element in patch {
        let Some(map) = element.as_mapping() else {
            target.push(strip_directives(element));
            continue;
        };
        let Some(key_value) = map.get(key) else {
            if !is_marker(element) {
                target.push(strip_directives(element));
            }
            continue;
        };
        let position = target
            .iter()
            .position(|t| t.as_mapping().and_then(|m| m.get(key)) == Some(key_value));
        match (directive_of(element), position) {
            (Some(Directive::Delete), Some(index)) => {
                target.remove(index);
            }
            (Some(Directive::Delete), None) => {}
            (Some(Directive::Replace), Some(index)) => {
                target[index] = strip_directives(element);
            }
            (_, Some(index)) => {
                if let Some(existing) = target[index].as_mapping_mut() {
                    merge_mapping(existing, map)?;
                }
            }
            (_, None) => target.push(strip_directives(element)),
        }
    }
    Ok(())
}

fn directive_of(value: &YamlValue) -> Option<Directive> {
    directive(value).ok().filter(|d| *d != Directive::Merge)
}

/// A list element that only carries a `$patch` directive.
fn is_marker(value: &YamlValue) -> bool {
    value
        .as_mapping()
        .is_some_and(|m| m.len() == 1 && m.contains_key(PATCH_DIRECTIVE))
}

fn is_directive_key(key: &YamlValue) -> bool {
    key.as_str().is_some_and(|k| {
        k == PATCH_DIRECTIVE
            || k == RETAIN_KEYS
            || k.starts_with(SET_ELEMENT_ORDER)
            || k.starts_with(DELETE_FROM_PRIMITIVE_LIST)
    })
}

/// Copy of `value` without any patch directives. Null mapping members are
/// deletions with nothing to delete, so they are dropped too.
pub fn strip_directives(value: &YamlValue) -> YamlValue {
    match value {
        YamlValue::Mapping(map) => YamlValue::Mapping(strip_directives_mapping(map)),
        YamlValue::Sequence(items) => YamlValue::Sequence(
            items
                .iter()
                .filter(|e| !is_marker(e))
                .map(strip_directives)
                .collect(),
        ),
        other => other.clone(),
    }
}

fn strip_directives_mapping(map: &Mapping) -> Mapping {
    map.iter()
        .filter(|(k, v)| !is_directive_key(k) && !v.is_null())
        .map(|(k, v)| (k.clone(), strip_directives(v)))
        .collect()
}
