//! Event store and publisher abstractions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::event::{DomainEvent, Event, EventMetadata, EventPayload};

/// Stored representation of a domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate this event belongs to.
    pub aggregate_id: Uuid,
    /// Event type name for deserialization routing.
    pub event_type: String,
    /// Serialized event payload.
    pub payload: serde_json::Value,
    /// Position within the aggregate stream (1-based).
    pub version: i64,
    /// The save attempt that appended this event.
    pub commit_id: Uuid,
    /// Commit id of the command that caused the event.
    pub causation_id: Uuid,
    /// Correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The principal on whose behalf the event was raised.
    pub who: String,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Serializes a typed event for appending under `commit_id`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if payload serialization fails.
    pub fn encode<P: EventPayload>(event: &Event<P>, commit_id: Uuid) -> Result<Self, DomainError> {
        let meta = event.metadata();
        let payload = serde_json::to_value(&event.payload).map_err(|e| {
            DomainError::Infrastructure(format!("event serialization failed: {e}"))
        })?;
        Ok(Self {
            event_id: meta.event_id,
            aggregate_id: meta.aggregate_id,
            event_type: event.event_type().to_owned(),
            payload,
            version: meta.version,
            commit_id,
            causation_id: meta.causation_id,
            correlation_id: meta.correlation_id,
            who: meta.who.clone(),
            occurred_at: meta.occurred_at,
        })
    }

    /// Deserializes the payload back into a typed event.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if event deserialization fails.
    pub fn decode<P: EventPayload>(&self) -> Result<Event<P>, DomainError> {
        let payload: P = serde_json::from_value(self.payload.clone()).map_err(|e| {
            DomainError::Infrastructure(format!(
                "event deserialization failed for {} (version {}): {e}",
                self.event_type, self.version
            ))
        })?;
        Ok(Event {
            metadata: EventMetadata {
                event_id: self.event_id,
                event_type: self.event_type.clone(),
                aggregate_id: self.aggregate_id,
                version: self.version,
                causation_id: self.causation_id,
                correlation_id: self.correlation_id,
                who: self.who.clone(),
                occurred_at: self.occurred_at,
            },
            payload,
        })
    }
}

/// Append-only, per-aggregate event storage.
///
/// Every read returns events ordered by version ascending. `append` is the
/// authoritative concurrency guard: it must compare the stream's current
/// version with `expected_version` and write the whole batch or nothing.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends `events` if the stream is still at `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConcurrencyConflict` if the stream moved on.
    async fn append(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError>;

    /// Loads the whole stream.
    async fn read_all(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError>;

    /// Loads events with `version <= version`.
    async fn read_up_to(
        &self,
        aggregate_id: Uuid,
        version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError>;

    /// Loads events with `version > version`.
    async fn read_since(
        &self,
        aggregate_id: Uuid,
        version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError>;
}

/// Notification of committed events to the outside world.
///
/// Delivery is at-least-once from the caller's point of view; the event log
/// stays the source of truth if publishing fails.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes one committed event.
    async fn publish(&self, event: &StoredEvent) -> Result<(), DomainError>;
}

/// A publisher that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(&self, _event: &StoredEvent) -> Result<(), DomainError> {
        Ok(())
    }
}
