//! Error types for xmap-common.

use thiserror::Error;

/// Common error type for xmap value parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Invalid GUID format.
    #[error("invalid GUID format: {0}")]
    InvalidGuid(String),

    /// Invalid duration format.
    #[error("invalid time span format: {0}")]
    InvalidTimeSpan(String),

    /// Duration does not fit in the tick counter.
    #[error("time span overflow")]
    TimeSpanOverflow,
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
