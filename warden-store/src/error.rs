//! Error types for the policy store.

use serde_json::Error as SerdeError;
use thiserror::Error;

/// Errors emitted by policy store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No current record exists for the requested policy name.
    #[error("policy `{name}` not found")]
    NotFound {
        /// The requested policy name.
        name: String,
    },
    /// Policy fields failed validation before persistence.
    #[error("invalid policy: {0}")]
    Validation(&'static str),
    /// Underlying I/O failure while reading or writing store files.
    #[error("i/o error: {source}")]
    Io {
        /// Source [`std::io::Error`].
        #[from]
        source: std::io::Error,
    },
    /// Serialization or deserialization error.
    #[error("serialization error: {source}")]
    Serialization {
        /// Source [`serde_json::Error`].
        #[from]
        source: SerdeError,
    },
}

impl StoreError {
    /// Helper to construct not-found errors from string-like values.
    #[must_use]
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
