//! Error types for schema definition and value conversion.

use thiserror::Error;

/// Errors that can occur when building a schema or converting values.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error.
    #[error("{0}")]
    Common(#[from] xmap_common::Error),

    /// A referenced class or enum is not registered.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// Two types share a name.
    #[error("duplicate type name: {0}")]
    DuplicateType(String),

    /// Invalid class or enum name.
    #[error("invalid type name: '{0}'")]
    InvalidTypeName(String),

    /// Two members of one class share a name.
    #[error("duplicate member '{member}' in class '{class}'")]
    DuplicateMember { class: String, member: String },

    /// A base class is not registered.
    #[error("class '{class}' derives from unknown class '{base}'")]
    UnknownBase { class: String, base: String },

    /// A class derives from itself.
    #[error("inheritance cycle through class '{0}'")]
    InheritanceCycle(String),

    /// Text cannot be converted to the target type.
    #[error("cannot convert '{text}' to {type_name}: {reason}")]
    MalformedValue {
        text: String,
        type_name: String,
        reason: String,
    },

    /// An enum variant or alias does not exist.
    #[error("'{text}' is not a variant of enum '{enum_name}'")]
    UnknownEnumVariant { enum_name: String, text: String },

    /// A value of this type has no single-text form.
    #[error("{0} has no text form")]
    NotBasic(String),

    /// Unsupported format string.
    #[error("invalid format string '{format}' for {type_name}")]
    InvalidFormat { format: String, type_name: String },

    /// The class cannot be instantiated.
    #[error("class '{0}' cannot be instantiated")]
    NotInstantiable(String),

    /// A container rejected an item.
    #[error("insertion failed: {0}")]
    Insert(String),

    /// Array dimensions do not match the item count.
    #[error("array dimensions expect {expected} items, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Error raised by a custom converter.
    #[error("converter error: {0}")]
    Converter(String),

    /// Schema file error.
    #[cfg(feature = "serde")]
    #[error("schema file error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, Error>;
