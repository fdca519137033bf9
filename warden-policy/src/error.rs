//! Error types for the policy model.

use thiserror::Error;

/// Errors surfaced while constructing policy records.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Policy fields failed validation before use.
    #[error("invalid policy: {0}")]
    Validation(&'static str),
}

/// Result alias for policy model operations.
pub type PolicyResult<T> = Result<T, PolicyError>;
