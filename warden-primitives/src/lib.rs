//! Core shared types for the CloudWarden governance engine.

#![warn(missing_docs, clippy::pedantic)]

mod error;
mod ids;
mod resource;

/// Error type and result alias shared across the workspace primitives.
pub use error::{Error, Result};
/// Unique identifier assigned to each scan invocation.
pub use ids::ScanId;
/// Resource snapshot types produced by collectors.
pub use resource::{ResourceSnapshot, ResourceSnapshotBuilder, ResourceType};
