//! # Resource Model
//!
//! A [`Resource`] is one declarative document: a YAML mapping with a `kind`
//! and a `metadata.name`. Its identity is a [`ResId`], built from the
//! group/version/kind ([`Gvk`]), the name and the optional namespace.
//!
//! Resources remember every id they have had. Transformers that rename or
//! re-namespace a resource record the previous id, so patches, replica
//! overrides and name references written against base names keep matching
//! in overlays.

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::{Mapping, Value as YamlValue};

use crate::error::{Error, Result};
use crate::merge::yaml::{get_path, get_str, remove_path, set_path};

/// Kinds that are not namespaced.
const CLUSTER_SCOPED_KINDS: &[&str] = &[
    "APIService",
    "CertificateSigningRequest",
    "ClusterRole",
    "ClusterRoleBinding",
    "ComponentStatus",
    "CSIDriver",
    "CSINode",
    "CustomResourceDefinition",
    "IngressClass",
    "MutatingWebhookConfiguration",
    "Namespace",
    "Node",
    "PersistentVolume",
    "PodSecurityPolicy",
    "PriorityClass",
    "RuntimeClass",
    "StorageClass",
    "ValidatingWebhookConfiguration",
    "VolumeAttachment",
];

/// Group, version and kind of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Gvk {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl Gvk {
    /// Build a Gvk from an `apiVersion` string and a kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use overkube::resource::Gvk;
    ///
    /// let gvk = Gvk::from_api_version("apps/v1", "Deployment");
    /// assert_eq!(gvk.group, "apps");
    /// assert_eq!(gvk.version, "v1");
    ///
    /// let core = Gvk::from_api_version("v1", "Service");
    /// assert_eq!(core.group, "");
    /// ```
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        let (group, version) = match api_version.rsplit_once('/') {
            Some((group, version)) => (group.to_string(), version.to_string()),
            None => (String::new(), api_version.to_string()),
        };
        Self {
            group,
            version,
            kind: kind.to_string(),
        }
    }

    /// The `apiVersion` string for this Gvk.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Whether resources of this kind live outside any namespace.
    pub fn is_cluster_scoped(&self) -> bool {
        CLUSTER_SCOPED_KINDS.contains(&self.kind.as_str())
    }
}

impl fmt::Display for Gvk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let group = if self.group.is_empty() {
            "[noGrp]"
        } else {
            &self.group
        };
        let version = if self.version.is_empty() {
            "[noVer]"
        } else {
            &self.version
        };
        write!(f, "{}.{}.{}", self.kind, version, group)
    }
}

/// Identity of a resource within a build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResId {
    pub gvk: Gvk,
    pub name: String,
    pub namespace: Option<String>,
}

impl ResId {
    pub fn new(gvk: Gvk, name: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            gvk,
            name: name.into(),
            namespace,
        }
    }

    /// Namespace with the implicit default applied: namespaced resources
    /// without an explicit namespace live in `default`.
    pub fn effective_namespace(&self) -> Option<&str> {
        if self.gvk.is_cluster_scoped() {
            None
        } else {
            Some(self.namespace.as_deref().unwrap_or("default"))
        }
    }
}

impl fmt::Display for ResId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}.{}",
            self.gvk,
            self.name,
            self.namespace.as_deref().unwrap_or("[noNs]")
        )
    }
}

/// One declarative document.
#[derive(Debug, Clone)]
pub struct Resource {
    value: YamlValue,
    id_history: Vec<ResId>,
    /// Directories of the kustomizations this resource was built through,
    /// innermost first.
    lineage: Vec<String>,
    needs_hash: bool,
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Resource {
    /// Wrap a parsed document, checking it has a `kind` and a
    /// `metadata.name`.
    pub fn from_value(value: YamlValue) -> Result<Self> {
        if !value.is_mapping() {
            return Err(Error::ResourceParse {
                source_path: "<document>".to_string(),
                message: "document is not a mapping".to_string(),
            });
        }
        let kind = get_str(&value, &["kind"]).unwrap_or_default();
        if kind.is_empty() {
            return Err(Error::ResourceParse {
                source_path: "<document>".to_string(),
                message: "missing 'kind' field".to_string(),
            });
        }
        let name = get_str(&value, &["metadata", "name"]).unwrap_or_default();
        if name.is_empty() {
            return Err(Error::ResourceParse {
                source_path: "<document>".to_string(),
                message: format!("{} is missing 'metadata.name'", kind),
            });
        }
        let mut resource = Self {
            value,
            id_history: Vec::new(),
            lineage: Vec::new(),
            needs_hash: false,
        };
        resource.track_id();
        Ok(resource)
    }

    /// Parse a single YAML document into a resource.
    pub fn from_yaml(src: &str) -> Result<Self> {
        Self::from_value(serde_yaml::from_str(src)?)
    }

    /// The group/version/kind of this resource.
    pub fn gvk(&self) -> Gvk {
        Gvk::from_api_version(
            get_str(&self.value, &["apiVersion"]).unwrap_or_default(),
            self.kind(),
        )
    }

    pub fn kind(&self) -> &str {
        get_str(&self.value, &["kind"]).unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        get_str(&self.value, &["metadata", "name"]).unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        get_str(&self.value, &["metadata", "namespace"]).filter(|ns| !ns.is_empty())
    }

    /// Current identity.
    pub fn id(&self) -> ResId {
        ResId::new(self.gvk(), self.name(), self.namespace().map(str::to_string))
    }

    /// Every id this resource has had, oldest first, ending with the
    /// current one.
    pub fn id_history(&self) -> &[ResId] {
        &self.id_history
    }

    /// Whether any id in the history satisfies `pred`.
    pub fn any_id<F: Fn(&ResId) -> bool>(&self, pred: F) -> bool {
        self.id_history.iter().any(pred)
    }

    pub fn lineage(&self) -> &[String] {
        &self.lineage
    }

    /// Record that the kustomization in `dir` finished building this
    /// resource.
    pub fn push_lineage(&mut self, dir: impl Into<String>) {
        self.lineage.push(dir.into());
    }

    /// Record the current id if it differs from the last recorded one.
    /// Callers that mutate the document through [`Resource::value_mut`] must
    /// call this afterwards.
    pub fn track_id(&mut self) {
        let id = self.id();
        if self.id_history.last() != Some(&id) {
            self.id_history.push(id);
        }
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        set_path(
            &mut self.value,
            &["metadata", "name"],
            YamlValue::String(name.to_string()),
        )?;
        self.track_id();
        Ok(())
    }

    pub fn set_namespace(&mut self, namespace: Option<&str>) -> Result<()> {
        match namespace {
            Some(ns) => set_path(
                &mut self.value,
                &["metadata", "namespace"],
                YamlValue::String(ns.to_string()),
            )?,
            None => {
                remove_path(&mut self.value, &["metadata", "namespace"]);
            }
        }
        self.track_id();
        Ok(())
    }

    /// Value of a label, if set.
    pub fn label(&self, key: &str) -> Option<&str> {
        get_str(&self.value, &["metadata", "labels", key])
    }

    /// The `metadata.labels` mapping, if any.
    pub fn labels(&self) -> Option<&Mapping> {
        get_path(&self.value, &["metadata", "labels"]).and_then(YamlValue::as_mapping)
    }

    /// The `metadata.annotations` mapping, if any.
    pub fn annotations(&self) -> Option<&Mapping> {
        get_path(&self.value, &["metadata", "annotations"]).and_then(YamlValue::as_mapping)
    }

    pub fn value(&self) -> &YamlValue {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut YamlValue {
        &mut self.value
    }

    /// Replace the whole document, keeping the id history.
    pub fn replace_value(&mut self, value: YamlValue) {
        self.value = value;
        self.track_id();
    }

    /// Whether a name-suffix hash must be appended when the build finishes.
    pub fn needs_hash(&self) -> bool {
        self.needs_hash
    }

    pub fn set_needs_hash(&mut self, needs_hash: bool) {
        self.needs_hash = needs_hash;
    }

    /// Serialize to a YAML document (without a leading `---`).
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.value)?)
    }
}

/// Length of the common tail of two lineages: how many enclosing
/// kustomizations two resources were both built through.
pub fn shared_tail(a: &[String], b: &[String]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Parse a multi-document YAML stream into resources.
///
/// Empty documents are skipped. `List` documents (any kind ending in `List`
/// that carries an `items` sequence) are flattened into their items.
/// `source` is used in error messages.
pub fn parse_documents(content: &str, source: &Path) -> Result<Vec<Resource>> {
    let source_path = source.display().to_string();
    let mut resources = Vec::new();

    for document in serde_yaml::Deserializer::from_str(content) {
        let value = YamlValue::deserialize(document).map_err(|e| Error::ResourceParse {
            source_path: source_path.clone(),
            message: e.to_string(),
        })?;
        collect_document(value, &source_path, &mut resources)?;
    }

    Ok(resources)
}

fn collect_document(value: YamlValue, source_path: &str, out: &mut Vec<Resource>) -> Result<()> {
    if value.is_null() {
        return Ok(());
    }
    if is_list(&value) {
        if let Some(items) = get_path(&value, &["items"]).and_then(YamlValue::as_sequence) {
            for item in items.clone() {
                collect_document(item, source_path, out)?;
            }
        }
        return Ok(());
    }
    let resource = Resource::from_value(value).map_err(|e| match e {
        Error::ResourceParse { message, .. } => Error::ResourceParse {
            source_path: source_path.to_string(),
            message,
        },
        other => other,
    })?;
    out.push(resource);
    Ok(())
}

fn is_list(value: &YamlValue) -> bool {
    let kind = get_str(value, &["kind"]).unwrap_or_default();
    kind.ends_with("List") && get_path(value, &["items"]).is_some_and(YamlValue::is_sequence)
}
