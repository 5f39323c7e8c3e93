//! Implementation of the phases of an overkube build.
//!
//! ## Overview
//!
//! A build runs these phases:
//! 1. Discovery - Resolve the base/overlay composition graph from the root directory
//! 2. Loading - Build every node bottom-up: load resources, run generators,
//!    transformers and patches, fix name references
//! 3. Ordering - Put the final resources in output order
//! 4. Writing - Emit the documents to a stream, a file or a directory
//!
//! Name-suffix hashing happens once, in the orchestrator, after the root node
//! has been built.

use std::path::{Path, PathBuf};

use crate::kustomization::{Kustomization, SortOrder};
use crate::loader::LoadRestrictor;

pub mod discovery;
pub mod loading;
pub mod orchestrator;
pub mod ordering;
pub mod write;

pub use discovery as phase1;
pub use loading as phase2;
pub use ordering as phase3;
pub use write as phase4;

/// One kustomization directory in the composition graph.
#[derive(Debug, Clone)]
pub struct KustNode {
    /// Directory holding the kustomization, in canonical form
    pub dir: PathBuf,
    /// The kustomization file itself
    pub kustomization_path: PathBuf,
    pub kustomization: Kustomization,
    /// Resolved `resources` entries, in declared order
    pub entries: Vec<Entry>,
}

/// A resolved `resources` entry.
#[derive(Debug, Clone)]
pub enum Entry {
    /// A file of resource documents
    File(PathBuf),
    /// A directory with its own kustomization
    Base(KustNode),
}

impl KustNode {
    /// Direct bases of this node, in declared order.
    pub fn bases(&self) -> impl Iterator<Item = &KustNode> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Base(node) => Some(node),
            Entry::File(_) => None,
        })
    }

    /// Resource files listed directly by this node.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::File(path) => Some(path.as_path()),
            Entry::Base(_) => None,
        })
    }

    /// Number of kustomizations in the graph rooted here, counting shared
    /// bases once per reference.
    pub fn node_count(&self) -> usize {
        1 + self.bases().map(KustNode::node_count).sum::<usize>()
    }

    /// Length of the longest base chain below this node.
    pub fn depth(&self) -> usize {
        self.bases().map(|b| b.depth() + 1).max().unwrap_or(0)
    }
}

/// Options that apply to a whole build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub load_restrictor: LoadRestrictor,
    /// Output order; overrides every `sortOptions` when set
    pub reorder: Option<SortOrder>,
}
