//! Immutable archived policy versions.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use warden_policy::Policy;

/// Why a policy version was archived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveReason {
    /// A newer version overwrote this record.
    Superseded,
    /// The record was removed from the store.
    Deleted,
}

/// Snapshot of a policy at a prior version, keyed by (name, version, save
/// time). History entries are append-only and never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    policy: Policy,
    archived_at: SystemTime,
    reason: ArchiveReason,
}

impl HistoryEntry {
    /// Creates a history entry archiving the supplied record.
    #[must_use]
    pub fn new(policy: Policy, reason: ArchiveReason, archived_at: SystemTime) -> Self {
        Self {
            policy,
            archived_at,
            reason,
        }
    }

    /// Returns the archived policy record.
    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Returns the archived policy's name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.policy.name()
    }

    /// Returns the archived policy's version.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.policy.version()
    }

    /// Returns when the entry was archived.
    #[must_use]
    pub const fn archived_at(&self) -> SystemTime {
        self.archived_at
    }

    /// Returns the archive reason.
    #[must_use]
    pub const fn reason(&self) -> ArchiveReason {
        self.reason
    }
}
