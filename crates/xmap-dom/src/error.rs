//! Error types for XML tree operations.

use thiserror::Error;

/// Errors that can occur when parsing, writing or editing a document.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 decoding error.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// XML parsing or writing error.
    #[error("XML error: {0}")]
    Xml(String),

    /// The document has no root element.
    #[error("no root element found in XML")]
    NoRoot,

    /// An attribute with the same qualified name already exists on the element.
    #[error("duplicate attribute '{name}'")]
    DuplicateAttribute { name: String },

    /// A location path cannot be created from the anchor element.
    #[error("cannot create location '{path}'")]
    UncreatableLocation { path: String },

    /// A node id does not refer to an element.
    #[error("node {index} is not an element")]
    NotAnElement { index: usize },
}

/// Result type for XML tree operations.
pub type Result<T> = std::result::Result<T, Error>;
