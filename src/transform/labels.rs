//! Label transformer
//!
//! `commonLabels` are written to resource metadata and to every selector and
//! template field that has to agree with it. A `labels` entry always writes
//! metadata, and reaches templates and selectors only when it asks to.

use std::collections::BTreeMap;

use serde_yaml::Value as YamlValue;

use crate::error::Result;
use crate::kustomization::LabelEntry;
use crate::merge::yaml::ensure_mapping;
use crate::resmap::ResourceMap;

use super::fieldspec::{
    apply_specs, FieldSpec, METADATA_LABELS, SELECTOR_LABEL_SPECS, TEMPLATE_LABEL_SPECS,
};
use super::Transformer;

#[derive(Debug, Clone)]
pub struct LabelTransformer {
    labels: BTreeMap<String, String>,
    specs: Vec<FieldSpec>,
}

impl LabelTransformer {
    /// Labels applied to metadata, selectors and templates alike.
    pub fn common(labels: BTreeMap<String, String>) -> Self {
        Self::with_scope(labels, true, true)
    }

    pub fn from_entry(entry: &LabelEntry) -> Self {
        Self::with_scope(
            entry.pairs.clone(),
            entry.include_selectors,
            entry.include_templates || entry.include_selectors,
        )
    }

    fn with_scope(labels: BTreeMap<String, String>, selectors: bool, templates: bool) -> Self {
        let mut specs = vec![METADATA_LABELS];
        if templates {
            specs.extend_from_slice(TEMPLATE_LABEL_SPECS);
        }
        if selectors {
            specs.extend_from_slice(SELECTOR_LABEL_SPECS);
        }
        Self { labels, specs }
    }
}

impl Transformer for LabelTransformer {
    fn name(&self) -> &'static str {
        "labels"
    }

    fn transform(&self, resmap: &mut ResourceMap) -> Result<()> {
        for resource in resmap.iter_mut() {
            let gvk = resource.gvk();
            apply_specs(resource.value_mut(), &gvk, &self.specs, &mut |slot| {
                let map = ensure_mapping(slot, "labels")?;
                for (k, v) in &self.labels {
                    map.insert(YamlValue::String(k.clone()), YamlValue::String(v.clone()));
                }
                Ok(())
            })?;
        }
        Ok(())
    }
}
