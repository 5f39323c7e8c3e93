//! # overkube
//!
//! A configuration-overlay engine for Kubernetes resources. It combines base
//! resource documents with layered overlay directives (kustomizations) into
//! one deterministic output set, without templating and without talking to a
//! cluster. The `overkube` command-line tool is a thin wrapper around this
//! library.
//!
//! ## Quick Example
//!
//! ```
//! use overkube::filesystem::MemoryFS;
//! use overkube::phases::{orchestrator, BuildOptions};
//! use std::path::Path;
//!
//! let mut fs = MemoryFS::new();
//! fs.add_file_string("base/kustomization.yaml", "resources: [deployment.yaml]\n").unwrap();
//! fs.add_file_string(
//!     "base/deployment.yaml",
//!     "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: web\n",
//! )
//! .unwrap();
//! fs.add_file_string(
//!     "prod/kustomization.yaml",
//!     "resources: [../base]\nnamePrefix: prod-\nnamespace: prod\n",
//! )
//! .unwrap();
//!
//! let resources = orchestrator::execute_build(&fs, Path::new("prod"), BuildOptions::default()).unwrap();
//! assert_eq!(resources[0].name(), "prod-web");
//! assert_eq!(resources[0].namespace(), Some("prod"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Resources (`resource`, `resmap`)**: Parsed documents with the history
//!   of ids they have had, kept in an ordered, id-unique collection.
//! - **Kustomizations (`kustomization`)**: The serde model of
//!   `kustomization.yaml`.
//! - **Filesystem and loading (`filesystem`, `loader`)**: All reads go
//!   through a trait with a disk and an in-memory implementation, and through
//!   a loader that enforces load restrictions.
//! - **Generators (`generators`)**: ConfigMaps and Secrets built from
//!   literals, files and env files, with content-hash name suffixes.
//! - **Transformers (`transform`)**: Namespace, name prefix/suffix, labels,
//!   annotations, images and replicas, plus name reference fixing.
//! - **Patches (`patch`, `selector`)**: Strategic merge and JSON 6902
//!   patches, targeted by selectors.
//! - **Phases (`phases`)**: The pipeline that ties everything together.
//!
//! ## Execution Flow
//!
//! The main entry point is [`phases::orchestrator::execute_build`]:
//!
//! 1.  **Discovery**: Resolve the base/overlay graph, rejecting cycles and
//!     remote references.
//! 2.  **Loading**: Build every kustomization bottom-up. Each one loads its
//!     resources and bases, runs generators, transformers and patches, and
//!     fixes name references.
//! 3.  **Hashing**: Append content hashes to generated names and update
//!     references to them.
//! 4.  **Ordering**: Sort into legacy kind order or keep accumulation order.
//! 5.  **Writing**: Emit a YAML stream, a file, or one file per resource.

pub mod error;
pub mod filesystem;
pub mod generators;
pub mod kustomization;
pub mod loader;
pub mod merge;
pub mod output;
pub mod patch;
pub mod path;
pub mod phases;
pub mod resmap;
pub mod resource;
pub mod selector;
pub mod transform;

#[cfg(test)]
mod proptests;
