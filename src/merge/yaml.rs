//! YAML value navigation helpers
//!
//! Small building blocks on top of `serde_yaml::Value` used by resources,
//! transformers and patches: typed lookups along a member path, creation of
//! intermediate mappings, and type names for diagnostics.

use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::{Error, Result};

/// Look up a value by member names. Returns `None` if any step is missing or
/// is not a mapping.
pub fn get_path<'a, S: AsRef<str>>(value: &'a YamlValue, path: &[S]) -> Option<&'a YamlValue> {
    let mut current = value;
    for key in path {
        current = current.as_mapping()?.get(key.as_ref())?;
    }
    Some(current)
}

/// Look up a string scalar by member names.
pub fn get_str<'a, S: AsRef<str>>(value: &'a YamlValue, path: &[S]) -> Option<&'a str> {
    get_path(value, path).and_then(YamlValue::as_str)
}

/// Navigate to a member path, creating intermediate mappings as needed, and
/// return a mutable reference to the final slot (inserted as `Null` if it
/// did not exist).
///
/// # Errors
///
/// Returns `Error::Path` if a non-null, non-mapping value sits on the way.
pub fn navigate_or_create<'a, S: AsRef<str>>(
    value: &'a mut YamlValue,
    path: &[S],
) -> Result<&'a mut YamlValue> {
    let mut current = value;
    for key in path {
        let key = key.as_ref();
        if current.is_null() {
            *current = YamlValue::Mapping(Mapping::new());
        }
        let type_name = get_yaml_type_name(current);
        let map = current.as_mapping_mut().ok_or_else(|| Error::Path {
            message: format!("Expected mapping while navigating to '{}', found {}", key, type_name),
        })?;
        current = map
            .entry(YamlValue::String(key.to_string()))
            .or_insert(YamlValue::Null);
    }
    Ok(current)
}

/// Set a value at a member path, creating intermediate mappings.
pub fn set_path<S: AsRef<str>>(value: &mut YamlValue, path: &[S], new: YamlValue) -> Result<()> {
    *navigate_or_create(value, path)? = new;
    Ok(())
}

/// Remove the value at a member path. Returns the removed value, if any.
pub fn remove_path<S: AsRef<str>>(value: &mut YamlValue, path: &[S]) -> Option<YamlValue> {
    let (last, parents) = path.split_last()?;
    let mut current = value;
    for key in parents {
        current = current.as_mapping_mut()?.get_mut(key.as_ref())?;
    }
    current.as_mapping_mut()?.remove(last.as_ref())
}

/// Coerce a slot into a mapping: `Null` becomes an empty mapping.
pub fn ensure_mapping<'a>(value: &'a mut YamlValue, context: &str) -> Result<&'a mut Mapping> {
    if value.is_null() {
        *value = YamlValue::Mapping(Mapping::new());
    }
    let type_name = get_yaml_type_name(value);
    value.as_mapping_mut().ok_or_else(|| Error::Path {
        message: format!("Expected mapping at '{}', found {}", context, type_name),
    })
}

/// Read a scalar as a string, formatting numbers and booleans the way they
/// would appear in YAML.
pub fn scalar_to_string(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Get a human-readable type name for a YAML value
///
/// Used for logging and error messages to describe the type of a value.
pub fn get_yaml_type_name(value: &YamlValue) -> &'static str {
    match value {
        YamlValue::Null => "Null",
        YamlValue::Bool(_) => "Bool",
        YamlValue::Number(_) => "Number",
        YamlValue::String(_) => "String",
        YamlValue::Sequence(_) => "Sequence",
        YamlValue::Mapping(_) => "Mapping",
        YamlValue::Tagged(_) => "Tagged",
    }
}

/// Build a mapping of string pairs.
pub fn string_mapping<'a, I>(pairs: I) -> Mapping
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (YamlValue::String(k.clone()), YamlValue::String(v.clone())))
        .collect()
}
