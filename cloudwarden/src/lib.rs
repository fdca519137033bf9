//! CloudWarden governance engine facade.
//!
//! Depend on this crate via `cargo add cloudwarden`. It bundles the internal
//! engine crates behind feature flags so downstream users can enable or
//! disable components as needed for their deployment.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use warden_primitives as primitives;

/// Policy model, filter evaluation, and action planning (enabled by the
/// `policy` feature).
#[cfg(feature = "policy")]
pub use warden_policy as policy;

/// Versioned policy persistence (enabled by the `store` feature).
#[cfg(feature = "store")]
pub use warden_store as store;

/// Scan orchestration and resource collection (enabled by the `scan`
/// feature).
#[cfg(feature = "scan")]
pub use warden_scan as scan;

/// Runtime configuration (enabled by the `config` feature).
#[cfg(feature = "config")]
pub use warden_config as config;

/// Observability setup (enabled by the `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use warden_telemetry as telemetry;
