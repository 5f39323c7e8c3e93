//! Target selectors
//!
//! A [`Selector`] picks resources by group, version, kind, name and
//! namespace (each an anchored regular expression), and by label and
//! annotation selectors written in Kubernetes selector syntax.
//!
//! Name and namespace are matched against a resource's whole id history, so
//! a selector written against base names keeps working after an overlay
//! adds a prefix or moves the resource into another namespace.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;

use crate::error::{Error, Result};
use crate::resource::Resource;

/// Which resources a patch or transformer applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation_selector: Option<String>,
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            ("group", &self.group),
            ("version", &self.version),
            ("kind", &self.kind),
            ("name", &self.name),
            ("namespace", &self.namespace),
            ("labelSelector", &self.label_selector),
            ("annotationSelector", &self.annotation_selector),
        ];
        let parts: Vec<String> = fields
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| format!("{}={}", k, v)))
            .collect();
        if parts.is_empty() {
            write!(f, "<all resources>")
        } else {
            write!(f, "{}", parts.join(","))
        }
    }
}

impl Selector {
    /// Whether this selector constrains nothing.
    pub fn is_empty(&self) -> bool {
        self == &Selector::default()
    }

    /// Compile the regular expressions and label selectors.
    pub fn compile(&self) -> Result<CompiledSelector> {
        Ok(CompiledSelector {
            group: compile_anchored(self.group.as_deref())?,
            version: compile_anchored(self.version.as_deref())?,
            kind: compile_anchored(self.kind.as_deref())?,
            name: compile_anchored(self.name.as_deref())?,
            namespace: compile_anchored(self.namespace.as_deref())?,
            labels: self
                .label_selector
                .as_deref()
                .map(LabelSelector::parse)
                .transpose()?,
            annotations: self
                .annotation_selector
                .as_deref()
                .map(LabelSelector::parse)
                .transpose()?,
        })
    }
}

fn compile_anchored(pattern: Option<&str>) -> Result<Option<Regex>> {
    pattern
        .filter(|p| !p.is_empty())
        .map(|p| Regex::new(&format!("^(?:{})$", p)).map_err(Error::from))
        .transpose()
}

/// A [`Selector`] ready for matching.
#[derive(Debug, Clone)]
pub struct CompiledSelector {
    group: Option<Regex>,
    version: Option<Regex>,
    kind: Option<Regex>,
    name: Option<Regex>,
    namespace: Option<Regex>,
    labels: Option<LabelSelector>,
    annotations: Option<LabelSelector>,
}

impl CompiledSelector {
    pub fn matches(&self, resource: &Resource) -> bool {
        let gvk = resource.gvk();
        if !matches_opt(&self.group, &gvk.group)
            || !matches_opt(&self.version, &gvk.version)
            || !matches_opt(&self.kind, &gvk.kind)
        {
            return false;
        }
        let identity_matches = resource.any_id(|id| {
            matches_opt(&self.name, &id.name)
                && matches_opt(&self.namespace, id.namespace.as_deref().unwrap_or_default())
        });
        if !identity_matches {
            return false;
        }
        if let Some(labels) = &self.labels {
            if !labels.matches(resource.labels()) {
                return false;
            }
        }
        if let Some(annotations) = &self.annotations {
            if !annotations.matches(resource.annotations()) {
                return false;
            }
        }
        true
    }
}

fn matches_opt(regex: &Option<Regex>, value: &str) -> bool {
    regex.as_ref().is_none_or(|r| r.is_match(value))
}

/// One requirement of a label selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Equals(String, String),
    NotEquals(String, String),
    In(String, Vec<String>),
    NotIn(String, Vec<String>),
    Exists(String),
    DoesNotExist(String),
}

impl Requirement {
    fn matches(&self, lookup: &dyn Fn(&str) -> Option<String>) -> bool {
        match self {
            Requirement::Equals(k, v) => lookup(k).as_deref() == Some(v.as_str()),
            Requirement::NotEquals(k, v) => lookup(k).as_deref() != Some(v.as_str()),
            Requirement::In(k, vs) => lookup(k).is_some_and(|actual| vs.contains(&actual)),
            Requirement::NotIn(k, vs) => lookup(k).is_none_or(|actual| !vs.contains(&actual)),
            Requirement::Exists(k) => lookup(k).is_some(),
            Requirement::DoesNotExist(k) => lookup(k).is_none(),
        }
    }
}

/// Parsed Kubernetes label selector (`app=web,tier in (fe,be),!legacy`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    pub fn parse(selector: &str) -> Result<Self> {
        let requirements = split_requirements(selector)
            .into_iter()
            .map(|raw| parse_requirement(selector, raw.trim()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { requirements })
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Match against a labels (or annotations) mapping.
    pub fn matches(&self, labels: Option<&Mapping>) -> bool {
        let lookup = |key: &str| -> Option<String> {
            labels
                .and_then(|m| m.get(key))
                .and_then(crate::merge::yaml::scalar_to_string)
        };
        self.requirements.iter().all(|r| r.matches(&lookup))
    }
}

/// Split on commas that are not inside a parenthesized value set.
fn split_requirements(selector: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in selector.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&selector[start..]);
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}

fn parse_requirement(selector: &str, raw: &str) -> Result<Requirement> {
    let invalid = |message: &str| Error::Selector {
        selector: selector.to_string(),
        message: format!("{} in '{}'", message, raw),
    };

    if let Some(key) = raw.strip_prefix('!') {
        let key = key.trim();
        validate_key(key).map_err(|m| invalid(&m))?;
        return Ok(Requirement::DoesNotExist(key.to_string()));
    }
    if let Some((key, value)) = raw.split_once("!=") {
        let key = key.trim();
        validate_key(key).map_err(|m| invalid(&m))?;
        return Ok(Requirement::NotEquals(key.to_string(), value.trim().to_string()));
    }
    if let Some((key, value)) = raw.split_once("==").or_else(|| raw.split_once('=')) {
        let key = key.trim();
        validate_key(key).map_err(|m| invalid(&m))?;
        return Ok(Requirement::Equals(key.to_string(), value.trim().to_string()));
    }
    if let Some(open) = raw.find('(') {
        let close = raw
            .rfind(')')
            .ok_or_else(|| invalid("unterminated value set"))?;
        if close < open {
            return Err(invalid("malformed value set"));
        }
        let head: Vec<&str> = raw[..open].split_whitespace().collect();
        let values: Vec<String> = raw[open + 1..close]
            .split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        return match head.as_slice() {
            [key, "in"] => {
                validate_key(key).map_err(|m| invalid(&m))?;
                Ok(Requirement::In(key.to_string(), values))
            }
            [key, "notin"] => {
                validate_key(key).map_err(|m| invalid(&m))?;
                Ok(Requirement::NotIn(key.to_string(), values))
            }
            _ => Err(invalid("expected 'key in (...)' or 'key notin (...)'")),
        };
    }
    validate_key(raw).map_err(|m| invalid(&m))?;
    Ok(Requirement::Exists(raw.to_string()))
}

fn validate_key(key: &str) -> std::result::Result<(), String> {
    if key.is_empty() {
        return Err("empty key".to_string());
    }
    if key.chars().any(|c| c.is_whitespace() || "=!(),".contains(c)) {
        return Err(format!("invalid key '{}'", key));
    }
    Ok(())
}
