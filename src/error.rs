//! # Error Handling
//!
//! This module defines the centralized error type for `overkube`. It uses
//! `thiserror` to derive a single `Error` enum covering every failure mode of
//! the build pipeline, with messages that name the file, resource id or
//! operation involved.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Variants map to pipeline stages: descriptor
//!   parsing, resource loading, composition (cycles, conflicts, load
//!   restrictions), generation, transformation and patching.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`, used
//!   throughout the library.
//!
//! Errors from third-party crates (`std::io`, `serde_yaml`, `serde_json`,
//! `regex`, `glob`, `url`) are wrapped with `#[from]` so they can be
//! propagated with `?`.

use thiserror::Error;

fn render_hint(hint: &Option<String>) -> String {
    hint.as_ref()
        .map(|h| format!("\n  hint: {}", h))
        .unwrap_or_default()
}

/// Main error type for overkube operations
#[derive(Error, Debug)]
pub enum Error {
    /// The kustomization descriptor could not be parsed or is structurally
    /// invalid.
    #[error("Kustomization error in {path}: {message}{}", render_hint(hint))]
    KustomizationParse {
        path: String,
        message: String,
        /// Optional hint for how to fix the descriptor
        hint: Option<String>,
    },

    /// A directory referenced as a base contains no kustomization file.
    #[error("No kustomization file found in '{dir}' (expected one of: {expected})")]
    MissingKustomization { dir: String, expected: String },

    /// A directory contains more than one kustomization file name.
    #[error("Found multiple kustomization files in '{dir}': {found}")]
    MultipleKustomizations { dir: String, found: String },

    /// A resource document could not be parsed.
    #[error("Failed to parse resource from {source_path}: {message}")]
    ResourceParse { source_path: String, message: String },

    /// Two resources ended up with the same identity.
    #[error("Resource conflict: {id} is already registered{}", render_hint(hint))]
    ResourceConflict { id: String, hint: Option<String> },

    /// A kustomization references itself through its bases.
    #[error("Cycle detected in kustomization bases: {cycle}")]
    CycleDetected { cycle: String },

    /// A resource entry points at a remote location.
    #[error("Remote resource '{reference}' is not supported; vendor it into a local directory")]
    RemoteResource { reference: String },

    /// A file outside the kustomization root was referenced under the
    /// root-only load restrictor.
    #[error("Security: file '{file}' is not in or below '{root}'{}", render_hint(hint))]
    LoadRestriction {
        file: String,
        root: String,
        hint: Option<String>,
    },

    /// A ConfigMap or Secret generator failed.
    #[error("Generator error for {generator}: {message}")]
    Generator { generator: String, message: String },

    /// A builtin transformer failed.
    #[error("Transformer error: {transformer} - {message}")]
    Transform { transformer: String, message: String },

    /// A patch could not be parsed or applied.
    #[error("Patch error in {patch}: {message}")]
    Patch { patch: String, message: String },

    /// A patch that must match one resource matched none.
    #[error("Patch target not found for {patch}: no resource matches {target}")]
    PatchTargetNotFound { patch: String, target: String },

    /// A patch that must match one resource matched several.
    #[error("Ambiguous patch target for {patch}: {target} matches {candidates}")]
    AmbiguousPatchTarget {
        patch: String,
        target: String,
        candidates: String,
    },

    /// A target or label selector is malformed.
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// An error occurred with a filesystem operation.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An error occurred with a path-related operation.
    #[error("Path operation error: {message}")]
    Path { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
