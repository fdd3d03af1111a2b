//! Error types for document loading and assembly.
//!
//! Covers every failure that aborts a load: I/O, parsing, schema
//! compilation, malformed section attributes and include problems.
//! Reference resolution failures never appear here; they are logged and
//! kept on the [`Document`](crate::Document).

use std::path::PathBuf;

use apispec_core::SchemaError;
use thiserror::Error;

/// Errors that can occur while loading or writing a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A definition failed to compile.
    #[error("schema error: {0}")]
    SchemaError(#[from] SchemaError),

    /// A section attribute has the wrong shape or value.
    #[error("invalid attribute '{key}' in {object}: {reason}")]
    InvalidAttribute {
        /// Section object being built.
        object: String,
        /// Attribute key.
        key: String,
        /// What was wrong.
        reason: String,
    },

    /// A required attribute is absent and the strict policy is active.
    #[error("missing required attribute '{key}' in {object}")]
    MissingRequiredField {
        /// Section object being built.
        object: String,
        /// Attribute key.
        key: String,
    },

    /// The document root is not a mapping.
    #[error("document root must be a mapping")]
    NotAMapping,

    /// Includes nest deeper than the configured limit.
    #[error("include depth limit {limit} exceeded at {}", path.display())]
    IncludeDepthExceeded {
        /// The include that would exceed the limit.
        path: PathBuf,
        /// Configured maximum depth.
        limit: usize,
    },
}

/// Convenience alias for results with [`DocumentError`].
pub type Result<T> = std::result::Result<T, DocumentError>;
