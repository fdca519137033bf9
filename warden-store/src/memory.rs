//! In-memory policy store for tests and embedded use.

use std::collections::HashMap;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;
use warden_policy::{Policy, PolicyStatus};

use crate::history::{ArchiveReason, HistoryEntry};
use crate::store::{PolicyStore, assign_version, validate_name};
use crate::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct MemoryInner {
    policies: HashMap<String, Policy>,
    history: HashMap<String, Vec<HistoryEntry>>,
}

/// Volatile policy store holding records behind a single reader-writer lock.
///
/// The exclusive write lock serializes writes per name; versioning and
/// history semantics match the file-backed store exactly.
#[derive(Debug, Default)]
pub struct MemoryPolicyStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryPolicyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    async fn save(&self, mut policy: Policy) -> StoreResult<Policy> {
        validate_name(policy.name())?;

        let mut guard = self.inner.write().await;
        let now = SystemTime::now();
        let previous_version = guard.policies.get(policy.name()).map(Policy::version);
        if let Some(previous) = guard.policies.get(policy.name()).cloned() {
            guard
                .history
                .entry(previous.name().to_owned())
                .or_default()
                .push(HistoryEntry::new(previous, ArchiveReason::Superseded, now));
        }

        policy.set_version(assign_version(previous_version, policy.version()));
        policy.touch(now);
        guard
            .policies
            .insert(policy.name().to_owned(), policy.clone());
        debug!(name = policy.name(), version = policy.version(), "policy saved");
        Ok(policy)
    }

    async fn get(&self, name: &str) -> StoreResult<Policy> {
        let guard = self.inner.read().await;
        guard
            .policies
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::not_found(name))
    }

    async fn list(&self) -> StoreResult<Vec<Policy>> {
        let guard = self.inner.read().await;
        let mut policies: Vec<Policy> = guard.policies.values().cloned().collect();
        policies.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(policies)
    }

    async fn delete(&self, name: &str) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        let mut policy = guard
            .policies
            .remove(name)
            .ok_or_else(|| StoreError::not_found(name))?;
        policy.set_status(PolicyStatus::Deleted);
        guard
            .history
            .entry(name.to_owned())
            .or_default()
            .push(HistoryEntry::new(
                policy,
                ArchiveReason::Deleted,
                SystemTime::now(),
            ));
        Ok(())
    }

    async fn history(&self, name: &str) -> StoreResult<Vec<HistoryEntry>> {
        let guard = self.inner.read().await;
        Ok(guard.history.get(name).cloned().unwrap_or_default())
    }

    async fn record_run(&self, name: &str, at: SystemTime) -> StoreResult<()> {
        let mut guard = self.inner.write().await;
        let policy = guard
            .policies
            .get_mut(name)
            .ok_or_else(|| StoreError::not_found(name))?;
        policy.mark_run(at);
        Ok(())
    }
}
