//! Error types for schema compilation, field assignment and reference
//! resolution.
//!
//! Errors fall into three groups with different propagation rules:
//!
//! - compile-time errors ([`UnsupportedType`](SchemaError::UnsupportedType),
//!   [`InvalidSchema`](SchemaError::InvalidSchema),
//!   [`InvalidPattern`](SchemaError::InvalidPattern)) abort compilation of
//!   the whole model;
//! - assignment errors ([`TypeMismatch`](SchemaError::TypeMismatch),
//!   [`ConstraintViolation`](SchemaError::ConstraintViolation) and the
//!   constructor argument errors) fail a single assignment and leave the
//!   target untouched;
//! - resolution errors ([`ReferenceNotFound`](SchemaError::ReferenceNotFound),
//!   [`UnimplementedReferenceKind`](SchemaError::UnimplementedReferenceKind))
//!   are recorded and logged by the resolution pass, never raised out of it.

use thiserror::Error;

/// Errors produced by the schema compiler, field descriptors and references.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The schema declares a type name with no runtime mapping.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// The schema is structurally malformed (e.g. properties is not a mapping).
    #[error("invalid schema for '{name}': {reason}")]
    InvalidSchema {
        /// Model or field being compiled.
        name: String,
        /// What was wrong.
        reason: String,
    },

    /// A `pattern` constraint is not a valid regular expression.
    #[error("invalid pattern '{pattern}' for field '{field}': {reason}")]
    InvalidPattern {
        /// Field declaring the pattern.
        field: String,
        /// The offending pattern.
        pattern: String,
        /// Regex compiler message.
        reason: String,
    },

    /// A value is not an instance of the declared type.
    #[error("type mismatch for '{field}': expected {expected}, got {found}")]
    TypeMismatch {
        /// Field (or `item` for sequence elements) being assigned.
        field: String,
        /// Declared type.
        expected: String,
        /// Type of the rejected value.
        found: String,
    },

    /// A value has the right type but violates a bound, pattern, enum or
    /// format constraint.
    #[error("constraint violation for '{field}': {reason}")]
    ConstraintViolation {
        /// Field being assigned.
        field: String,
        /// Human-readable reason.
        reason: String,
    },

    /// A required field was not supplied.
    #[error("missing required field '{field}' for {model}")]
    MissingRequiredField {
        /// Model being constructed.
        model: String,
        /// The missing field.
        field: String,
    },

    /// A named argument or assignment targets a field the model does not declare.
    #[error("{model} has no field named '{field}'")]
    UnknownField {
        /// Model being constructed or mutated.
        model: String,
        /// The unknown field name.
        field: String,
    },

    /// The same field was supplied both positionally and by name, or twice by name.
    #[error("field '{field}' supplied more than once for {model}")]
    DuplicateArgument {
        /// Model being constructed.
        model: String,
        /// The duplicated field.
        field: String,
    },

    /// More positional arguments than declared fields.
    #[error("{model} takes at most {expected} positional argument(s), got {given}")]
    TooManyArguments {
        /// Model being constructed.
        model: String,
        /// Number of declared fields.
        expected: usize,
        /// Number of positional values supplied.
        given: usize,
    },

    /// A value had to be checked against a reference that never resolved.
    #[error("reference {0} is not resolved")]
    UnresolvedReference(String),

    /// A local pointer names a section or entry that does not exist.
    #[error("reference not found: {0}")]
    ReferenceNotFound(String),

    /// Remote and relative-file pointers are not supported.
    #[error("{kind} references are not implemented: {pointer}")]
    UnimplementedReferenceKind {
        /// The pointer that could not be followed.
        pointer: String,
        /// `remote` or `relative file`.
        kind: String,
    },
}

/// Convenience alias for results with [`SchemaError`].
pub type Result<T> = std::result::Result<T, SchemaError>;
