//! # Transformer Engine
//!
//! Transformers rewrite every resource a kustomization has accumulated:
//! namespace, name prefix and suffix, labels, annotations, container images
//! and replica counts. [`from_kustomization`] builds them in the order they
//! run.

pub mod annotations;
pub mod fieldspec;
pub mod images;
pub mod labels;
pub mod name_reference;
pub mod names;
pub mod namespace;
pub mod replicas;

use log::debug;

use crate::error::Result;
use crate::kustomization::Kustomization;
use crate::resmap::ResourceMap;

/// A whole-collection rewrite.
pub trait Transformer: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    fn transform(&self, resmap: &mut ResourceMap) -> Result<()>;
}

/// The built-in transformers a kustomization asks for, in execution order.
pub fn from_kustomization(kustomization: &Kustomization) -> Vec<Box<dyn Transformer>> {
    let mut transformers: Vec<Box<dyn Transformer>> = Vec::new();

    if let Some(ns) = kustomization.namespace.as_ref().filter(|ns| !ns.is_empty()) {
        transformers.push(Box::new(namespace::NamespaceTransformer::new(ns)));
    }
    let prefix = kustomization.name_prefix.clone().unwrap_or_default();
    let suffix = kustomization.name_suffix.clone().unwrap_or_default();
    if !prefix.is_empty() || !suffix.is_empty() {
        transformers.push(Box::new(names::PrefixSuffixTransformer::new(prefix, suffix)));
    }
    if !kustomization.common_labels.is_empty() {
        transformers.push(Box::new(labels::LabelTransformer::common(
            kustomization.common_labels.clone(),
        )));
    }
    for entry in kustomization.labels.iter().filter(|e| !e.pairs.is_empty()) {
        transformers.push(Box::new(labels::LabelTransformer::from_entry(entry)));
    }
    if !kustomization.common_annotations.is_empty() {
        transformers.push(Box::new(annotations::AnnotationTransformer::new(
            kustomization.common_annotations.clone(),
        )));
    }
    if !kustomization.images.is_empty() {
        transformers.push(Box::new(images::ImageTransformer::new(
            kustomization.images.clone(),
        )));
    }
    if !kustomization.replicas.is_empty() {
        transformers.push(Box::new(replicas::ReplicaTransformer::new(
            kustomization.replicas.clone(),
        )));
    }
    transformers
}

/// Run the transformers a kustomization asks for.
pub fn run(kustomization: &Kustomization, resmap: &mut ResourceMap) -> Result<()> {
    for transformer in from_kustomization(kustomization) {
        debug!("Running {} transformer", transformer.name());
        transformer.transform(resmap)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_order_of_transformers() {
        let k = crate::kustomization::parse(
            r#"
replicas: [{name: web, count: 2}]
images: [{name: nginx, newTag: "1.25"}]
commonAnnotations: {a: b}
commonLabels: {app: web}
namePrefix: p-
namespace: prod
"#,
            Path::new("kustomization.yaml"),
        )
        .unwrap();
        let names: Vec<_> = from_kustomization(&k).iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec!["namespace", "prefix-suffix", "labels", "annotations", "images", "replicas"]
        );
    }

    #[test]
    fn test_empty_kustomization_has_no_transformers() {
        assert!(from_kustomization(&Kustomization::default()).is_empty());
    }
}
