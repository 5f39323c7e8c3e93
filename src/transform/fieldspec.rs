//! Field specs: where in a document a transformer writes
//!
//! A [`FieldSpec`] pairs a kind (and optionally a group) with a slash
//! separated path. [`apply_to_path`] walks that path, descending into every
//! element of any sequence it meets, and hands each matching slot to a
//! callback.

use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::Result;
use crate::merge::parse_field_path;
use crate::resource::Gvk;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Kind the field applies to; `None` for every kind.
    pub kind: Option<&'static str>,
    /// Group the field applies to; `None` for any group.
    pub group: Option<&'static str>,
    pub path: &'static str,
    /// Create the field (and missing parents) when it is absent.
    pub create: bool,
}

impl FieldSpec {
    pub const fn any(path: &'static str, create: bool) -> Self {
        Self {
            kind: None,
            group: None,
            path,
            create,
        }
    }

    pub const fn kind(kind: &'static str, path: &'static str, create: bool) -> Self {
        Self {
            kind: Some(kind),
            group: None,
            path,
            create,
        }
    }

    pub fn applies_to(&self, gvk: &Gvk) -> bool {
        self.kind.is_none_or(|k| k == gvk.kind) && self.group.is_none_or(|g| g == gvk.group)
    }

    pub fn segments(&self) -> Vec<String> {
        parse_field_path(self.path)
    }
}

/// Pod template owners and the path of their pod template.
pub const POD_TEMPLATES: &[(&str, &str)] = &[
    ("Deployment", "spec/template"),
    ("ReplicaSet", "spec/template"),
    ("DaemonSet", "spec/template"),
    ("StatefulSet", "spec/template"),
    ("Job", "spec/template"),
    ("ReplicationController", "spec/template"),
    ("CronJob", "spec/jobTemplate/spec/template"),
];

/// Kinds carrying a pod spec, and the path to it.
pub const POD_SPECS: &[(&str, &str)] = &[
    ("Pod", "spec"),
    ("Deployment", "spec/template/spec"),
    ("ReplicaSet", "spec/template/spec"),
    ("DaemonSet", "spec/template/spec"),
    ("StatefulSet", "spec/template/spec"),
    ("Job", "spec/template/spec"),
    ("ReplicationController", "spec/template/spec"),
    ("CronJob", "spec/jobTemplate/spec/template/spec"),
];

/// Label selector fields that must stay in step with the labels of the pods
/// they select.
pub const SELECTOR_LABEL_SPECS: &[FieldSpec] = &[
    FieldSpec::kind("Service", "spec/selector", true),
    FieldSpec::kind("ReplicationController", "spec/selector", true),
    FieldSpec::kind("Deployment", "spec/selector/matchLabels", true),
    FieldSpec::kind("ReplicaSet", "spec/selector/matchLabels", true),
    FieldSpec::kind("DaemonSet", "spec/selector/matchLabels", true),
    FieldSpec::kind("StatefulSet", "spec/selector/matchLabels", true),
    FieldSpec::kind("Job", "spec/selector/matchLabels", false),
    FieldSpec::kind("CronJob", "spec/jobTemplate/spec/selector/matchLabels", false),
    FieldSpec::kind("PodDisruptionBudget", "spec/selector/matchLabels", false),
    FieldSpec::kind("NetworkPolicy", "spec/podSelector/matchLabels", false),
    FieldSpec::kind("NetworkPolicy", "spec/ingress/from/podSelector/matchLabels", false),
    FieldSpec::kind("NetworkPolicy", "spec/egress/to/podSelector/matchLabels", false),
];

/// Labels of templated objects: pod templates, job templates and volume
/// claim templates.
pub const TEMPLATE_LABEL_SPECS: &[FieldSpec] = &[
    FieldSpec::kind("ReplicationController", "spec/template/metadata/labels", true),
    FieldSpec::kind("Deployment", "spec/template/metadata/labels", true),
    FieldSpec::kind("ReplicaSet", "spec/template/metadata/labels", true),
    FieldSpec::kind("DaemonSet", "spec/template/metadata/labels", true),
    FieldSpec::kind("StatefulSet", "spec/template/metadata/labels", true),
    FieldSpec::kind("StatefulSet", "spec/volumeClaimTemplates/metadata/labels", true),
    FieldSpec::kind("Job", "spec/template/metadata/labels", true),
    FieldSpec::kind("CronJob", "spec/jobTemplate/metadata/labels", true),
    FieldSpec::kind("CronJob", "spec/jobTemplate/spec/template/metadata/labels", true),
];

pub const METADATA_LABELS: FieldSpec = FieldSpec::any("metadata/labels", true);

pub const ANNOTATION_SPECS: &[FieldSpec] = &[
    FieldSpec::any("metadata/annotations", true),
    FieldSpec::kind("ReplicationController", "spec/template/metadata/annotations", true),
    FieldSpec::kind("Deployment", "spec/template/metadata/annotations", true),
    FieldSpec::kind("ReplicaSet", "spec/template/metadata/annotations", true),
    FieldSpec::kind("DaemonSet", "spec/template/metadata/annotations", true),
    FieldSpec::kind("StatefulSet", "spec/template/metadata/annotations", true),
    FieldSpec::kind("Job", "spec/template/metadata/annotations", true),
    FieldSpec::kind("CronJob", "spec/jobTemplate/metadata/annotations", true),
    FieldSpec::kind("CronJob", "spec/jobTemplate/spec/template/metadata/annotations", true),
];

/// Call `f` on every slot `path` reaches inside `value`.
///
/// Sequences met along the way are traversed element by element. When
/// `create` is set, missing mapping members are inserted (intermediate ones
/// as empty mappings, the final one as `Null`); otherwise paths that run out
/// are skipped silently.
pub fn apply_to_path<F>(value: &mut YamlValue, path: &[String], create: bool, f: &mut F) -> Result<()>
where
    F: FnMut(&mut YamlValue) -> Result<()>,
{
    if let YamlValue::Sequence(items) = value {
        for item in items {
            apply_to_path(item, path, create, f)?;
        }
        return Ok(());
    }
    let Some((head, rest)) = path.split_first() else {
        return f(value);
    };
    if value.is_null() && create {
        *value = YamlValue::Mapping(Mapping::new());
    }
    let Some(map) = value.as_mapping_mut() else {
        return Ok(());
    };
    match map.get_mut(head.as_str()) {
        Some(child) => apply_to_path(child, rest, create, f),
        None if create => {
            let child = map
                .entry(YamlValue::String(head.clone()))
                .or_insert(YamlValue::Null);
            apply_to_path(child, rest, create, f)
        }
        None => Ok(()),
    }
}

/// Apply `f` through every spec in `specs` that applies to `gvk`.
pub fn apply_specs<F>(value: &mut YamlValue, gvk: &Gvk, specs: &[FieldSpec], f: &mut F) -> Result<()>
where
    F: FnMut(&mut YamlValue) -> Result<()>,
{
    for spec in specs.iter().filter(|s| s.applies_to(gvk)) {
        apply_to_path(value, &spec.segments(), spec.create, f)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(src: &str) -> YamlValue {
        serde_yaml::from_str(src).unwrap()
    }

    fn set_x(slot: &mut YamlValue) -> Result<()> {
        *slot = YamlValue::String("x".to_string());
        Ok(())
    }

    #[test]
    fn test_applies_to() {
        let gvk = Gvk::from_api_version("apps/v1", "Deployment");
        assert!(FieldSpec::any("metadata/labels", true).applies_to(&gvk));
        assert!(FieldSpec::kind("Deployment", "spec", true).applies_to(&gvk));
        assert!(!FieldSpec::kind("Service", "spec", true).applies_to(&gvk));
    }

    #[test]
    fn test_apply_traverses_sequences() {
        let mut value = doc("spec:\n  containers:\n    - name: a\n    - name: b\n");
        let path = parse_field_path("spec/containers/name");
        apply_to_path(&mut value, &path, false, &mut set_x).unwrap();
        assert_eq!(value["spec"]["containers"][0]["name"], YamlValue::from("x"));
        assert_eq!(value["spec"]["containers"][1]["name"], YamlValue::from("x"));
    }

    #[test]
    fn test_apply_creates_when_asked() {
        let mut value = doc("metadata:\n  name: web\n");
        let path = parse_field_path("spec/selector/matchLabels");
        apply_to_path(&mut value, &path, false, &mut set_x).unwrap();
        assert!(value.get("spec").is_none());
        apply_to_path(&mut value, &path, true, &mut set_x).unwrap();
        assert_eq!(
            value["spec"]["selector"]["matchLabels"],
            YamlValue::from("x")
        );
    }

    #[test]
    fn test_apply_skips_scalars_on_the_way() {
        let mut value = doc("spec: 3\n");
        let path = parse_field_path("spec/selector");
        apply_to_path(&mut value, &path, true, &mut set_x).unwrap();
        assert_eq!(value["spec"], YamlValue::from(3));
    }

    #[test]
    fn test_apply_specs_filters_kind() {
        let mut value = doc("spec: {}\n");
        let gvk = Gvk::from_api_version("v1", "Service");
        apply_specs(&mut value, &gvk, SELECTOR_LABEL_SPECS, &mut set_x).unwrap();
        assert_eq!(value["spec"]["selector"], YamlValue::from("x"));
        assert!(value["spec"].get("podSelector").is_none());
    }
}
