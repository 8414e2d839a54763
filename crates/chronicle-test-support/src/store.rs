//! Test event stores: `EventStore` doubles for tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chronicle_core::error::DomainError;
use chronicle_core::store::{EventStore, StoredEvent};
use uuid::Uuid;

/// A read issued against a [`RecordingEventStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadCall {
    /// `read_all(aggregate_id)`.
    All(Uuid),
    /// `read_up_to(aggregate_id, version)`.
    UpTo(Uuid, i64),
    /// `read_since(aggregate_id, version)`.
    Since(Uuid, i64),
}

/// An event store that delegates to `inner` and records every call.
pub struct RecordingEventStore {
    inner: Arc<dyn EventStore>,
    reads: Mutex<Vec<ReadCall>>,
    appended: Mutex<Vec<(Uuid, i64, Vec<StoredEvent>)>>,
}

impl RecordingEventStore {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: Arc<dyn EventStore>) -> Self {
        Self {
            inner,
            reads: Mutex::new(Vec::new()),
            appended: Mutex::new(Vec::new()),
        }
    }

    /// Returns every read issued so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn reads(&self) -> Vec<ReadCall> {
        self.reads.lock().unwrap().clone()
    }

    /// Returns every append attempted so far as
    /// `(aggregate_id, expected_version, events)`, including rejected ones.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn appended_events(&self) -> Vec<(Uuid, i64, Vec<StoredEvent>)> {
        self.appended.lock().unwrap().clone()
    }

    fn record(&self, call: ReadCall) {
        self.reads.lock().unwrap().push(call);
    }
}

impl std::fmt::Debug for RecordingEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingEventStore")
            .field("reads", &self.reads)
            .field("appended", &self.appended)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventStore for RecordingEventStore {
    async fn append(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        self.appended
            .lock()
            .unwrap()
            .push((aggregate_id, expected_version, events.to_vec()));
        self.inner.append(aggregate_id, expected_version, events).await
    }

    async fn read_all(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        self.record(ReadCall::All(aggregate_id));
        self.inner.read_all(aggregate_id).await
    }

    async fn read_up_to(
        &self,
        aggregate_id: Uuid,
        version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.record(ReadCall::UpTo(aggregate_id, version));
        self.inner.read_up_to(aggregate_id, version).await
    }

    async fn read_since(
        &self,
        aggregate_id: Uuid,
        version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.record(ReadCall::Since(aggregate_id, version));
        self.inner.read_since(aggregate_id, version).await
    }
}

/// An event store whose appends wait for `delay` before delegating to
/// `inner`. Reads are not delayed. Useful for cancellation tests.
pub struct SlowEventStore {
    inner: Arc<dyn EventStore>,
    delay: Duration,
}

impl SlowEventStore {
    /// Wraps `inner`, delaying every append by `delay`.
    #[must_use]
    pub fn new(inner: Arc<dyn EventStore>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl std::fmt::Debug for SlowEventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlowEventStore")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventStore for SlowEventStore {
    async fn append(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        tokio::time::sleep(self.delay).await;
        self.inner.append(aggregate_id, expected_version, events).await
    }

    async fn read_all(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        self.inner.read_all(aggregate_id).await
    }

    async fn read_up_to(
        &self,
        aggregate_id: Uuid,
        version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.inner.read_up_to(aggregate_id, version).await
    }

    async fn read_since(
        &self,
        aggregate_id: Uuid,
        version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.inner.read_since(aggregate_id, version).await
    }
}

/// An event store that always returns empty streams and silently accepts
/// appends. Useful for testing "aggregate not found" scenarios and creation
/// commands.
#[derive(Debug)]
pub struct EmptyEventStore;

#[async_trait]
impl EventStore for EmptyEventStore {
    async fn append(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Ok(())
    }

    async fn read_all(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }

    async fn read_up_to(
        &self,
        _aggregate_id: Uuid,
        _version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }

    async fn read_since(
        &self,
        _aggregate_id: Uuid,
        _version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Ok(vec![])
    }
}

/// An event store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventStore;

fn connection_refused() -> DomainError {
    DomainError::Infrastructure("connection refused".into())
}

#[async_trait]
impl EventStore for FailingEventStore {
    async fn append(
        &self,
        _aggregate_id: Uuid,
        _expected_version: i64,
        _events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        Err(connection_refused())
    }

    async fn read_all(&self, _aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        Err(connection_refused())
    }

    async fn read_up_to(
        &self,
        _aggregate_id: Uuid,
        _version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(connection_refused())
    }

    async fn read_since(
        &self,
        _aggregate_id: Uuid,
        _version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(connection_refused())
    }
}
