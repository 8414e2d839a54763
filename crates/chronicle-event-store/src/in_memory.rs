//! In-memory event and snapshot stores.
//!
//! Intended for tests and single-process use. Streams live behind one async
//! `RwLock`; an append checks the head version and pushes the batch while
//! holding the write guard, so the compare-and-append is a single step.

use std::collections::HashMap;

use async_trait::async_trait;
use chronicle_core::error::DomainError;
use chronicle_core::snapshot::{Snapshot, SnapshotStore};
use chronicle_core::store::{EventStore, StoredEvent};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::batch;

/// In-memory append-only event store.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<Uuid, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the head version of a stream (0 if it does not exist).
    pub async fn head_version(&self, aggregate_id: Uuid) -> i64 {
        let streams = self.streams.read().await;
        streams
            .get(&aggregate_id)
            .map_or(0, |stream| current_version(stream))
    }

    async fn read_filtered<F>(&self, aggregate_id: Uuid, keep: F) -> Vec<StoredEvent>
    where
        F: Fn(&StoredEvent) -> bool,
    {
        let streams = self.streams.read().await;
        streams
            .get(&aggregate_id)
            .map(|stream| stream.iter().filter(|e| keep(e)).cloned().collect())
            .unwrap_or_default()
    }
}

fn current_version(stream: &[StoredEvent]) -> i64 {
    stream.last().map_or(0, |e| e.version)
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    #[tracing::instrument(skip(self, events), fields(count = events.len()))]
    async fn append(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }
        batch::validate(aggregate_id, expected_version, events)?;

        let mut streams = self.streams.write().await;
        let stream = streams.entry(aggregate_id).or_default();
        let actual = current_version(stream);
        if actual != expected_version {
            tracing::debug!(actual, "append rejected, stream moved on");
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        stream.extend_from_slice(events);
        Ok(())
    }

    async fn read_all(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.read_filtered(aggregate_id, |_| true).await)
    }

    async fn read_up_to(
        &self,
        aggregate_id: Uuid,
        version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self
            .read_filtered(aggregate_id, |e| e.version <= version)
            .await)
    }

    async fn read_since(
        &self,
        aggregate_id: Uuid,
        version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(self.read_filtered(aggregate_id, |e| e.version > version).await)
    }
}

/// In-memory snapshot store keeping the latest snapshot per aggregate.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: RwLock<HashMap<Uuid, Snapshot>>,
}

impl InMemorySnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn get(&self, aggregate_id: Uuid) -> Result<Option<Snapshot>, DomainError> {
        Ok(self.snapshots.read().await.get(&aggregate_id).cloned())
    }

    async fn put(&self, snapshot: Snapshot) -> Result<(), DomainError> {
        let mut snapshots = self.snapshots.write().await;
        match snapshots.get(&snapshot.aggregate_id) {
            Some(existing) if existing.version > snapshot.version => {
                tracing::debug!(
                    aggregate_id = %snapshot.aggregate_id,
                    kept = existing.version,
                    offered = snapshot.version,
                    "older snapshot ignored"
                );
            }
            _ => {
                snapshots.insert(snapshot.aggregate_id, snapshot);
            }
        }
        Ok(())
    }
}
