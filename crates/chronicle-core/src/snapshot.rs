//! Snapshot (memento) support.
//!
//! A snapshot is a cache of materialised aggregate state at a version. It is
//! never a source of truth: a missing, stale or unreadable snapshot only costs
//! a longer replay.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Point-in-time materialised state of one aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Aggregate this snapshot belongs to.
    pub aggregate_id: Uuid,
    /// Aggregate type, used to reject snapshots of a different kind.
    pub aggregate_type: String,
    /// Stream version the state reflects.
    pub version: i64,
    /// Serialized aggregate state.
    pub state: serde_json::Value,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
}

/// When the repository should offer a snapshot after a save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SnapshotPolicy {
    /// Never take snapshots (load-only).
    #[default]
    Never,
    /// Take a snapshot whenever a save crosses a multiple of N events.
    EveryNEvents(u32),
}

impl SnapshotPolicy {
    /// Returns `true` if moving the stream from `from_version` to `to_version`
    /// crosses a snapshot boundary.
    #[must_use]
    pub fn should_snapshot(self, from_version: i64, to_version: i64) -> bool {
        match self {
            Self::Never | Self::EveryNEvents(0) => false,
            Self::EveryNEvents(n) => {
                let n = i64::from(n);
                to_version / n > from_version / n
            }
        }
    }
}

/// Snapshot persistence collaborator.
///
/// Reads and writes are best-effort; the repository treats failures as a
/// cache miss.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Loads the latest snapshot for an aggregate, if any.
    async fn get(&self, aggregate_id: Uuid) -> Result<Option<Snapshot>, DomainError>;

    /// Stores a snapshot, replacing any older one for the same aggregate.
    async fn put(&self, snapshot: Snapshot) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_policy_never_snapshots() {
        assert!(!SnapshotPolicy::Never.should_snapshot(0, 1_000));
    }

    #[test]
    fn test_every_n_snapshots_when_boundary_crossed() {
        let policy = SnapshotPolicy::EveryNEvents(10);

        assert!(policy.should_snapshot(9, 10));
        assert!(policy.should_snapshot(8, 12));
        assert!(policy.should_snapshot(0, 25));
    }

    #[test]
    fn test_every_n_skips_when_boundary_not_crossed() {
        let policy = SnapshotPolicy::EveryNEvents(10);

        assert!(!policy.should_snapshot(10, 11));
        assert!(!policy.should_snapshot(0, 9));
    }

    #[test]
    fn test_every_zero_is_treated_as_never() {
        assert!(!SnapshotPolicy::EveryNEvents(0).should_snapshot(0, 100));
    }
}
