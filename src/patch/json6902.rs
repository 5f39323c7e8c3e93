//! Ordered-operation patches (RFC 6902)
//!
//! Operations address locations with RFC 6901 pointers. A patch is applied
//! to a copy of the document and only written back when every operation
//! succeeds.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};
use crate::merge::{parse_pointer, PathSegment};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Operation {
    Add { path: String, value: YamlValue },
    Remove { path: String },
    Replace { path: String, value: YamlValue },
    Move { from: String, path: String },
    Copy { from: String, path: String },
    Test { path: String, value: YamlValue },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Add { path, .. } => write!(f, "add {}", path),
            Operation::Remove { path } => write!(f, "remove {}", path),
            Operation::Replace { path, .. } => write!(f, "replace {}", path),
            Operation::Move { from, path } => write!(f, "move {} -> {}", from, path),
            Operation::Copy { from, path } => write!(f, "copy {} -> {}", from, path),
            Operation::Test { path, .. } => write!(f, "test {}", path),
        }
    }
}

/// Parse a list of operations from YAML or JSON text.
pub fn parse(content: &str, label: &str) -> Result<Vec<Operation>> {
    let value: YamlValue = serde_yaml::from_str(content).map_err(|e| Error::Patch {
        patch: label.to_string(),
        message: e.to_string(),
    })?;
    from_value(value, label)
}

/// Interpret an already parsed sequence as operations.
pub fn from_value(value: YamlValue, label: &str) -> Result<Vec<Operation>> {
    if !value.is_sequence() {
        return Err(Error::Patch {
            patch: label.to_string(),
            message: "expected a list of operations".to_string(),
        });
    }
    serde_yaml::from_value(value).map_err(|e| Error::Patch {
        patch: label.to_string(),
        message: format!("invalid operation: {}", e),
    })
}

/// Apply `ops` to `doc` atomically. On error `doc` is unchanged and the
/// error names the failing operation's index.
pub fn apply(doc: &mut YamlValue, ops: &[Operation], label: &str) -> Result<()> {
    let mut work = doc.clone();
    for (index, op) in ops.iter().enumerate() {
        apply_one(&mut work, op).map_err(|message| Error::Patch {
            patch: label.to_string(),
            message: format!("operation {} ({}) failed: {}", index, op, message),
        })?;
    }
    *doc = work;
    Ok(())
}

type OpResult<T> = std::result::Result<T, String>;

fn pointer(path: &str) -> OpResult<Vec<PathSegment>> {
    parse_pointer(path).map_err(|e| e.to_string())
}

fn apply_one(doc: &mut YamlValue, op: &Operation) -> OpResult<()> {
    match op {
        Operation::Add { path, value } => add(doc, &pointer(path)?, value.clone()),
        Operation::Remove { path } => remove(doc, &pointer(path)?).map(|_| ()),
        Operation::Replace { path, value } => {
            let slot = get_mut(doc, &pointer(path)?)
                .ok_or_else(|| format!("path '{}' does not exist", path))?;
            *slot = value.clone();
            Ok(())
        }
        Operation::Move { from, path } => {
            if path != from && path.starts_with(&format!("{}/", from)) {
                return Err(format!("cannot move '{}' into its own child '{}'", from, path));
            }
            let value = remove(doc, &pointer(from)?)?;
            add(doc, &pointer(path)?, value)
        }
        Operation::Copy { from, path } => {
            let value = get(doc, &pointer(from)?)
                .cloned()
                .ok_or_else(|| format!("path '{}' does not exist", from))?;
            add(doc, &pointer(path)?, value)
        }
        Operation::Test { path, value } => {
            let actual = get(doc, &pointer(path)?)
                .ok_or_else(|| format!("path '{}' does not exist", path))?;
            if actual == value {
                Ok(())
            } else {
                Err(format!(
                    "value at '{}' is {}, expected {}",
                    path,
                    render(actual),
                    render(value)
                ))
            }
        }
    }
}

fn render(value: &YamlValue) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{:?}", value))
}

fn get<'a>(doc: &'a YamlValue, segments: &[PathSegment]) -> Option<&'a YamlValue> {
    let mut current = doc;
    for segment in segments {
        current = match current {
            YamlValue::Mapping(map) => match segment {
                PathSegment::Key(key) => map.get(key.as_str())?,
                PathSegment::End => map.get("-")?,
            },
            YamlValue::Sequence(items) => items.get(segment.as_index(items.len(), false)?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn get_mut<'a>(doc: &'a mut YamlValue, segments: &[PathSegment]) -> Option<&'a mut YamlValue> {
    let mut current = doc;
    for segment in segments {
        current = match current {
            YamlValue::Mapping(map) => match segment {
                PathSegment::Key(key) => map.get_mut(key.as_str())?,
                PathSegment::End => map.get_mut("-")?,
            },
            YamlValue::Sequence(items) => {
                let index = segment.as_index(items.len(), false)?;
                items.get_mut(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

fn segment_key(segment: &PathSegment) -> String {
    match segment {
        PathSegment::Key(key) => key.clone(),
        PathSegment::End => "-".to_string(),
    }
}

fn add(doc: &mut YamlValue, segments: &[PathSegment], value: YamlValue) -> OpResult<()> {
    let Some((last, parents)) = segments.split_last() else {
        *doc = value;
        return Ok(());
    };
    let parent = get_mut(doc, parents).ok_or_else(|| "parent path does not exist".to_string())?;
    match parent {
        YamlValue::Mapping(map) => {
            map.insert(YamlValue::String(segment_key(last)), value);
            Ok(())
        }
        YamlValue::Sequence(items) => {
            let index = last
                .as_index(items.len(), true)
                .ok_or_else(|| format!("index '{}' is out of bounds", segment_key(last)))?;
            items.insert(index, value);
            Ok(())
        }
        _ => Err("parent is not a mapping or a sequence".to_string()),
    }
}

fn remove(doc: &mut YamlValue, segments: &[PathSegment]) -> OpResult<YamlValue> {
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| "cannot remove the whole document".to_string())?;
    let parent = get_mut(doc, parents).ok_or_else(|| "parent path does not exist".to_string())?;
    match parent {
        YamlValue::Mapping(map) => map
            .remove(segment_key(last).as_str())
            .ok_or_else(|| format!("member '{}' does not exist", segment_key(last))),
        YamlValue::Sequence(items) => {
            let index = last
                .as_index(items.len(), false)
                .ok_or_else(|| format!("index '{}' is out of bounds", segment_key(last)))?;
            Ok(items.remove(index))
        }
        _ => Err("parent is not a mapping or a sequence".to_string()),
    }
}
