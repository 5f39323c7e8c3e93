//! Annotation transformer

use std::collections::BTreeMap;

use serde_yaml::Value as YamlValue;

use crate::error::Result;
use crate::merge::yaml::ensure_mapping;
use crate::resmap::ResourceMap;

use super::fieldspec::{apply_specs, ANNOTATION_SPECS};
use super::Transformer;

/// Adds `commonAnnotations` to metadata and pod templates.
#[derive(Debug, Clone)]
pub struct AnnotationTransformer {
    annotations: BTreeMap<String, String>,
}

impl AnnotationTransformer {
    pub fn new(annotations: BTreeMap<String, String>) -> Self {
        Self { annotations }
    }
}

impl Transformer for AnnotationTransformer {
    fn name(&self) -> &'static str {
        "annotations"
    }

    fn transform(&self, resmap: &mut ResourceMap) -> Result<()> {
        for resource in resmap.iter_mut() {
            let gvk = resource.gvk();
            apply_specs(resource.value_mut(), &gvk, ANNOTATION_SPECS, &mut |slot| {
                let map = ensure_mapping(slot, "annotations")?;
                for (k, v) in &self.annotations {
                    map.insert(YamlValue::String(k.clone()), YamlValue::String(v.clone()));
                }
                Ok(())
            })?;
        }
        Ok(())
    }
}
