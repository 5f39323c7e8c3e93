//! Replica count transformer

use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};
use crate::kustomization::ReplicaOverride;
use crate::merge::yaml::set_path;
use crate::resmap::ResourceMap;

use super::Transformer;

const SCALABLE_KINDS: &[&str] = &[
    "Deployment",
    "ReplicaSet",
    "StatefulSet",
    "ReplicationController",
];

#[derive(Debug, Clone)]
pub struct ReplicaTransformer {
    overrides: Vec<ReplicaOverride>,
}

impl ReplicaTransformer {
    pub fn new(overrides: Vec<ReplicaOverride>) -> Self {
        Self { overrides }
    }
}

impl Transformer for ReplicaTransformer {
    fn name(&self) -> &'static str {
        "replicas"
    }

    fn transform(&self, resmap: &mut ResourceMap) -> Result<()> {
        for replica in &self.overrides {
            let targets = resmap.positions(|r| {
                SCALABLE_KINDS.contains(&r.kind()) && r.any_id(|id| id.name == replica.name)
            });
            if targets.is_empty() {
                return Err(Error::Transform {
                    transformer: self.name().to_string(),
                    message: format!(
                        "no Deployment, ReplicaSet, StatefulSet or ReplicationController named '{}'",
                        replica.name
                    ),
                });
            }
            for index in targets {
                if let Some(resource) = resmap.get_mut(index) {
                    set_path(
                        resource.value_mut(),
                        &["spec", "replicas"],
                        YamlValue::Number(replica.count.into()),
                    )?;
                }
            }
        }
        Ok(())
    }
}
