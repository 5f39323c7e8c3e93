//! Name prefix and suffix transformer

use log::debug;

use crate::error::Result;
use crate::resmap::ResourceMap;

use super::Transformer;

/// Kinds whose names are fixed by the API server or by convention.
const SKIPPED_KINDS: &[&str] = &["CustomResourceDefinition", "APIService", "Namespace"];

#[derive(Debug, Clone)]
pub struct PrefixSuffixTransformer {
    prefix: String,
    suffix: String,
}

impl PrefixSuffixTransformer {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }
}

impl Transformer for PrefixSuffixTransformer {
    fn name(&self) -> &'static str {
        "prefix-suffix"
    }

    fn transform(&self, resmap: &mut ResourceMap) -> Result<()> {
        for resource in resmap.iter_mut() {
            if SKIPPED_KINDS.contains(&resource.kind()) {
                debug!("Not renaming {}", resource.id());
                continue;
            }
            let name = format!("{}{}{}", self.prefix, resource.name(), self.suffix);
            resource.set_name(&name)?;
        }
        Ok(())
    }
}
