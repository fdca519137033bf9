//! The resource collection seam.
//!
//! Collectors are opaque to the core: a capability from (resource type,
//! region) to a sequence of snapshots, with no assumption about vendor
//! shapes beyond the snapshot fields. Implementations may block or retry
//! internally; the core imposes no timeout of its own.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use warden_primitives::{ResourceSnapshot, ResourceType};

/// Snapshot retrieval failure for one resource type.
#[derive(Debug, Clone, Error)]
#[error("snapshot collection failed: {reason}")]
pub struct CollectorError {
    reason: String,
}

impl CollectorError {
    /// Creates a collector error from a string-like reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns the human-readable failure reason.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Result alias for collection operations.
pub type CollectorResult<T> = Result<T, CollectorError>;

/// Trait implemented by resource snapshot providers.
#[async_trait]
pub trait ResourceCollector: Send + Sync {
    /// Returns snapshots of all resources of the supplied type in the region.
    async fn collect(
        &self,
        resource_type: ResourceType,
        region: &str,
    ) -> CollectorResult<Vec<ResourceSnapshot>>;
}

/// Fixed in-memory collector for tests and embedded use.
///
/// Serves pre-seeded snapshots per resource type, ignoring the region, and
/// can be told to fail for specific types.
#[derive(Default)]
pub struct StaticCollector {
    resources: Mutex<HashMap<ResourceType, Vec<ResourceSnapshot>>>,
    failures: Mutex<HashMap<ResourceType, String>>,
}

impl StaticCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds snapshots for a resource type, replacing any prior set.
    pub fn seed(&self, resource_type: ResourceType, snapshots: Vec<ResourceSnapshot>) {
        let mut guard = self.resources.lock().expect("collector state poisoned");
        guard.insert(resource_type, snapshots);
    }

    /// Makes collection fail for a resource type with the supplied reason.
    pub fn fail_with(&self, resource_type: ResourceType, reason: impl Into<String>) {
        let mut guard = self.failures.lock().expect("collector state poisoned");
        guard.insert(resource_type, reason.into());
    }
}

#[async_trait]
impl ResourceCollector for StaticCollector {
    async fn collect(
        &self,
        resource_type: ResourceType,
        _region: &str,
    ) -> CollectorResult<Vec<ResourceSnapshot>> {
        if let Some(reason) = self
            .failures
            .lock()
            .expect("collector state poisoned")
            .get(&resource_type)
        {
            return Err(CollectorError::new(reason.clone()));
        }

        let guard = self.resources.lock().expect("collector state poisoned");
        Ok(guard.get(&resource_type).cloned().unwrap_or_default())
    }
}
