//! The policy store trait and shared persistence bookkeeping.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;
use warden_policy::{Policy, PolicySource};

use crate::history::HistoryEntry;
use crate::{StoreError, StoreResult};

/// Trait implemented by durable policy stores.
///
/// Writes to the same policy name are mutually exclusive inside each
/// implementation; reads may proceed concurrently.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Persists a policy record.
    ///
    /// A fresh name is written at version 1. An overwrite first archives the
    /// existing record to history and then writes version = previous + 1,
    /// unless the caller supplied an explicitly higher version. Returns the
    /// record as stored.
    async fn save(&self, policy: Policy) -> StoreResult<Policy>;

    /// Returns the current record for the supplied name.
    async fn get(&self, name: &str) -> StoreResult<Policy>;

    /// Returns all current records. A record that fails to parse is skipped
    /// with a logged warning rather than aborting the listing.
    async fn list(&self) -> StoreResult<Vec<Policy>>;

    /// Removes the current record for the supplied name, archiving its final
    /// state to history tagged as deleted.
    async fn delete(&self, name: &str) -> StoreResult<()>;

    /// Returns all archived versions for a name in creation order; an empty
    /// sequence when none exist.
    async fn history(&self, name: &str) -> StoreResult<Vec<HistoryEntry>>;

    /// Records one completed run against the named policy, updating its
    /// last-run timestamp and run count in place.
    ///
    /// Operational metadata only: no version bump, no history entry.
    async fn record_run(&self, name: &str, at: SystemTime) -> StoreResult<()>;

    /// Serializes one policy to an external byte stream.
    async fn export(&self, name: &str) -> StoreResult<Bytes> {
        let policy = self.get(name).await?;
        let data = serde_json::to_vec_pretty(&policy)?;
        Ok(Bytes::from(data))
    }

    /// Deserializes a policy from an external byte stream and applies it
    /// through the normal [`PolicyStore::save`] path.
    ///
    /// The imported record receives fresh timestamps, cleared run
    /// bookkeeping, and `import` provenance; versioning and history rules
    /// apply unchanged.
    async fn import(&self, data: &[u8]) -> StoreResult<Policy> {
        let mut policy: Policy = serde_json::from_slice(data)?;
        policy.refresh_timestamps(SystemTime::now());
        policy.set_source(PolicySource::Import);
        self.save(policy).await
    }
}

/// Computes the version a record should be stored at.
///
/// Fresh names are forced to 1; overwrites advance by one unless the caller
/// supplied a higher version explicitly.
pub(crate) fn assign_version(existing: Option<u64>, requested: u64) -> u64 {
    match existing {
        None => 1,
        Some(previous) => (previous + 1).max(requested),
    }
}

/// Rejects names that cannot serve as store keys (or file names).
pub(crate) fn validate_name(name: &str) -> StoreResult<()> {
    if name.trim().is_empty() {
        return Err(StoreError::Validation("policy name must not be empty"));
    }
    let safe = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !safe || name.starts_with('.') {
        return Err(StoreError::Validation(
            "policy name may only contain ascii letters, digits, `-`, `_`, and `.`",
        ));
    }
    Ok(())
}

/// Keyed async lock registry serializing writes per policy name.
#[derive(Debug, Default)]
pub(crate) struct NameLocks {
    inner: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl NameLocks {
    /// Returns the lock guarding writes to the supplied name.
    pub(crate) fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        let mut guard = self.inner.lock().expect("name lock registry poisoned");
        Arc::clone(guard.entry(name.to_owned()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_names_start_at_version_one() {
        assert_eq!(assign_version(None, 1), 1);
        assert_eq!(assign_version(None, 42), 1);
    }

    #[test]
    fn overwrites_advance_by_one() {
        assert_eq!(assign_version(Some(1), 1), 2);
        assert_eq!(assign_version(Some(7), 1), 8);
    }

    #[test]
    fn explicitly_higher_versions_win() {
        assert_eq!(assign_version(Some(3), 10), 10);
        assert_eq!(assign_version(Some(3), 4), 4);
    }

    #[test]
    fn name_validation_rejects_path_like_names() {
        assert!(validate_name("stale-ec2").is_ok());
        assert!(validate_name("v1.2_final").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("  ").is_err());
        assert!(validate_name("../escape").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name(".hidden").is_err());
    }

    #[test]
    fn name_locks_hand_out_the_same_lock_per_name() {
        let locks = NameLocks::default();
        let a = locks.lock_for("p");
        let b = locks.lock_for("p");
        let c = locks.lock_for("q");
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
