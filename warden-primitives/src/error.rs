//! Shared error definitions for governance primitives.

use thiserror::Error;
use uuid::Error as UuidError;

/// Result alias used throughout the primitive types.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while manipulating governance primitive types.
#[derive(Debug, Error)]
pub enum Error {
    /// The provided scan identifier could not be parsed.
    #[error("invalid scan id: {source}")]
    InvalidScanId {
        /// Source parsing error from the UUID library.
        #[from]
        source: UuidError,
    },

    /// The resource type string is not part of the supported set.
    #[error("unsupported resource type `{value}`")]
    UnsupportedResourceType {
        /// The offending resource type string.
        value: String,
    },

    /// Resource snapshot fields failed validation.
    #[error("invalid resource snapshot: {0}")]
    InvalidResource(&'static str),
}
