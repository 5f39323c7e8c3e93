//! Ordered collection of resources
//!
//! A [`ResourceMap`] keeps resources in insertion order (the FIFO output
//! order) and enforces that no two resources share a current id.

use crate::error::{Error, Result};
use crate::resource::{ResId, Resource};
use crate::selector::Selector;

#[derive(Debug, Clone, Default)]
pub struct ResourceMap {
    resources: Vec<Resource>,
}

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resource, failing if its id is already present.
    pub fn append(&mut self, resource: Resource) -> Result<()> {
        let id = resource.id();
        if self.index_of(&id).is_some() {
            return Err(Error::ResourceConflict {
                id: id.to_string(),
                hint: Some(
                    "each resource may only be declared once; use a patch to modify it".to_string(),
                ),
            });
        }
        self.resources.push(resource);
        Ok(())
    }

    /// Append every resource of `other`, in order.
    pub fn append_all(&mut self, other: ResourceMap) -> Result<()> {
        for resource in other.resources {
            self.append(resource)?;
        }
        Ok(())
    }

    /// Position of the resource whose current id is `id`.
    pub fn index_of(&self, id: &ResId) -> Option<usize> {
        self.resources.iter().position(|r| &r.id() == id)
    }

    pub fn get(&self, index: usize) -> Option<&Resource> {
        self.resources.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Resource> {
        self.resources.get_mut(index)
    }

    /// Indices of the resources for which `pred` holds.
    pub fn positions<F: Fn(&Resource) -> bool>(&self, pred: F) -> Vec<usize> {
        self.resources
            .iter()
            .enumerate()
            .filter(|(_, r)| pred(r))
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of the resources matched by a selector.
    pub fn select(&self, selector: &Selector) -> Result<Vec<usize>> {
        let compiled = selector.compile()?;
        Ok(self.positions(|r| compiled.matches(r)))
    }

    pub fn remove(&mut self, index: usize) -> Resource {
        self.resources.remove(index)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Resource> {
        self.resources.iter_mut()
    }

    pub fn into_resources(self) -> Vec<Resource> {
        self.resources
    }

    /// Fail if two resources have come to share an id, e.g. after a rename.
    pub fn check_unique_ids(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for resource in &self.resources {
            let id = resource.id();
            if !seen.insert(id.clone()) {
                return Err(Error::ResourceConflict {
                    id: id.to_string(),
                    hint: Some("two resources were transformed to the same id".to_string()),
                });
            }
        }
        Ok(())
    }
}

impl FromIterator<Resource> for ResourceMap {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        Self {
            resources: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ResourceMap {
    type Item = Resource;
    type IntoIter = std::vec::IntoIter<Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.into_iter()
    }
}
