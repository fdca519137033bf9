//! File-backed policy store.
//!
//! Layout under the store root: `policies/<name>.json` holds the current
//! record for each name; `history/<name>.log` is an append-only
//! newline-delimited JSON trail of archived versions. History files are only
//! ever appended to, so no prior version is lost even under repeated rapid
//! saves.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use warden_policy::{Policy, PolicyStatus};

use crate::history::{ArchiveReason, HistoryEntry};
use crate::store::{NameLocks, PolicyStore, assign_version, validate_name};
use crate::{StoreError, StoreResult};

const POLICY_DIR: &str = "policies";
const HISTORY_DIR: &str = "history";

/// Policy store persisting one JSON document per policy name plus an
/// append-only history log per name.
pub struct FilePolicyStore {
    root: PathBuf,
    locks: NameLocks,
}

impl FilePolicyStore {
    /// Opens (or creates) a store rooted at the provided directory.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors encountered while preparing the directory
    /// layout.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(POLICY_DIR)).await?;
        fs::create_dir_all(root.join(HISTORY_DIR)).await?;
        Ok(Self {
            root,
            locks: NameLocks::default(),
        })
    }

    /// Returns the root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn policy_path(&self, name: &str) -> PathBuf {
        self.root.join(POLICY_DIR).join(format!("{name}.json"))
    }

    fn history_path(&self, name: &str) -> PathBuf {
        self.root.join(HISTORY_DIR).join(format!("{name}.log"))
    }

    async fn read_current(&self, name: &str) -> StoreResult<Option<Policy>> {
        match fs::read(self.policy_path(name)).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn write_current(&self, policy: &Policy) -> StoreResult<()> {
        let data = serde_json::to_vec_pretty(policy)?;
        fs::write(self.policy_path(policy.name()), data).await?;
        Ok(())
    }

    async fn append_history(&self, entry: &HistoryEntry) -> StoreResult<()> {
        let line = serde_json::to_vec(entry)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.history_path(entry.name()))
            .await?;
        file.write_all(&line).await?;
        file.write_u8(b'\n').await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl PolicyStore for FilePolicyStore {
    async fn save(&self, mut policy: Policy) -> StoreResult<Policy> {
        validate_name(policy.name())?;

        let lock = self.locks.lock_for(policy.name());
        let _guard = lock.lock().await;

        let now = SystemTime::now();
        let existing = self.read_current(policy.name()).await?;
        let previous_version = existing.as_ref().map(Policy::version);
        if let Some(previous) = existing {
            self.append_history(&HistoryEntry::new(previous, ArchiveReason::Superseded, now))
                .await?;
        }

        policy.set_version(assign_version(previous_version, policy.version()));
        policy.touch(now);
        self.write_current(&policy).await?;
        debug!(name = policy.name(), version = policy.version(), "policy saved");
        Ok(policy)
    }

    async fn get(&self, name: &str) -> StoreResult<Policy> {
        self.read_current(name)
            .await?
            .ok_or_else(|| StoreError::not_found(name))
    }

    async fn list(&self) -> StoreResult<Vec<Policy>> {
        let mut policies = Vec::new();
        let mut entries = fs::read_dir(self.root.join(POLICY_DIR)).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match fs::read(&path).await {
                Ok(data) => match serde_json::from_slice::<Policy>(&data) {
                    Ok(policy) => policies.push(policy),
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "skipping unparseable policy record");
                    }
                },
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable policy record");
                }
            }
        }
        policies.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(policies)
    }

    async fn delete(&self, name: &str) -> StoreResult<()> {
        validate_name(name)?;

        let lock = self.locks.lock_for(name);
        let _guard = lock.lock().await;

        let mut policy = self
            .read_current(name)
            .await?
            .ok_or_else(|| StoreError::not_found(name))?;
        policy.set_status(PolicyStatus::Deleted);
        self.append_history(&HistoryEntry::new(
            policy,
            ArchiveReason::Deleted,
            SystemTime::now(),
        ))
        .await?;
        fs::remove_file(self.policy_path(name)).await?;
        debug!(name, "policy deleted");
        Ok(())
    }

    async fn history(&self, name: &str) -> StoreResult<Vec<HistoryEntry>> {
        let data = match fs::read(self.history_path(name)).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut entries = Vec::new();
        for chunk in data
            .split(|byte| *byte == b'\n')
            .filter(|chunk| !chunk.is_empty())
        {
            match serde_json::from_slice::<HistoryEntry>(chunk) {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    warn!(name, error = %err, "skipping unparseable history entry");
                }
            }
        }
        Ok(entries)
    }

    async fn record_run(&self, name: &str, at: SystemTime) -> StoreResult<()> {
        let lock = self.locks.lock_for(name);
        let _guard = lock.lock().await;

        let mut policy = self
            .read_current(name)
            .await?
            .ok_or_else(|| StoreError::not_found(name))?;
        policy.mark_run(at);
        self.write_current(&policy).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use warden_primitives::ResourceType;

    fn temp_root() -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("warden-store-{}", Uuid::new_v4()));
        path
    }

    fn policy(name: &str) -> Policy {
        Policy::builder(name, ResourceType::Ec2)
            .status(PolicyStatus::Active)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn save_twice_archives_exactly_one_history_entry() {
        let root = temp_root();
        let store = FilePolicyStore::open(&root).await.unwrap();

        let first = store.save(policy("stale-ec2")).await.unwrap();
        assert_eq!(first.version(), 1);

        let second = store.save(policy("stale-ec2")).await.unwrap();
        assert_eq!(second.version(), 2);

        let history = store.history("stale-ec2").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].version(), 1);
        assert_eq!(history[0].reason(), ArchiveReason::Superseded);

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn explicitly_higher_versions_are_honoured() {
        let root = temp_root();
        let store = FilePolicyStore::open(&root).await.unwrap();

        store.save(policy("p")).await.unwrap();
        let mut update = policy("p");
        update.set_version(10);
        let stored = store.save(update).await.unwrap();
        assert_eq!(stored.version(), 10);

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn fresh_names_are_forced_to_version_one() {
        let root = temp_root();
        let store = FilePolicyStore::open(&root).await.unwrap();

        let mut record = policy("fresh");
        record.set_version(9);
        let stored = store.save(record).await.unwrap();
        assert_eq!(stored.version(), 1);

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn delete_archives_terminal_state() {
        let root = temp_root();
        let store = FilePolicyStore::open(&root).await.unwrap();

        store.save(policy("doomed")).await.unwrap();
        store.delete("doomed").await.unwrap();

        assert!(matches!(
            store.get("doomed").await,
            Err(StoreError::NotFound { .. })
        ));

        let history = store.history("doomed").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reason(), ArchiveReason::Deleted);
        assert_eq!(history[0].policy().status(), PolicyStatus::Deleted);

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn delete_missing_returns_not_found() {
        let root = temp_root();
        let store = FilePolicyStore::open(&root).await.unwrap();
        assert!(matches!(
            store.delete("ghost").await,
            Err(StoreError::NotFound { .. })
        ));
        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn get_missing_returns_not_found_and_list_is_empty() {
        let root = temp_root();
        let store = FilePolicyStore::open(&root).await.unwrap();

        assert!(matches!(
            store.get("never-saved").await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(store.list().await.unwrap().is_empty());
        assert!(store.history("never-saved").await.unwrap().is_empty());

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn list_skips_corrupt_records() {
        let root = temp_root();
        let store = FilePolicyStore::open(&root).await.unwrap();

        store.save(policy("alpha")).await.unwrap();
        store.save(policy("beta")).await.unwrap();
        std::fs::write(root.join(POLICY_DIR).join("broken.json"), b"{ not json").unwrap();

        let listed = store.list().await.unwrap();
        let names: Vec<&str> = listed.iter().map(Policy::name).collect();
        assert_eq!(names, ["alpha", "beta"]);

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn record_run_updates_in_place() {
        let root = temp_root();
        let store = FilePolicyStore::open(&root).await.unwrap();

        store.save(policy("runner")).await.unwrap();
        store.record_run("runner", SystemTime::now()).await.unwrap();

        let current = store.get("runner").await.unwrap();
        assert_eq!(current.run_count(), 1);
        assert!(current.last_run().is_some());
        assert_eq!(current.version(), 1);
        assert!(store.history("runner").await.unwrap().is_empty());

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn reopened_store_preserves_records_and_history() {
        let root = temp_root();
        {
            let store = FilePolicyStore::open(&root).await.unwrap();
            store.save(policy("durable")).await.unwrap();
            store.save(policy("durable")).await.unwrap();
        }

        let store = FilePolicyStore::open(&root).await.unwrap();
        assert_eq!(store.get("durable").await.unwrap().version(), 2);
        assert_eq!(store.history("durable").await.unwrap().len(), 1);

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn save_rejects_path_like_names() {
        let root = temp_root();
        let store = FilePolicyStore::open(&root).await.unwrap();

        let record = Policy::builder("../escape", ResourceType::Ec2)
            .build()
            .unwrap();
        assert!(matches!(
            store.save(record).await,
            Err(StoreError::Validation(_))
        ));

        let _ = std::fs::remove_dir_all(root);
    }
}
