//! Repository configuration.

use crate::snapshot::SnapshotPolicy;

/// Tunables for a [`Repository`](crate::repository::Repository).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// When to offer snapshots after a successful save.
    pub snapshot_policy: SnapshotPolicy,
}

impl RepositoryConfig {
    /// Sets the snapshot policy.
    #[must_use]
    pub fn with_snapshot_policy(mut self, snapshot_policy: SnapshotPolicy) -> Self {
        self.snapshot_policy = snapshot_policy;
        self
    }
}
