//! Domain event abstractions.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata attached to every domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Type name for deserialization routing.
    pub event_type: String,
    /// Aggregate/stream this event belongs to.
    pub aggregate_id: Uuid,
    /// 1-based position of this event within the aggregate stream.
    pub version: i64,
    /// Commit id of the command that caused this event.
    pub causation_id: Uuid,
    /// Correlation ID for tracing a command through its effects.
    pub correlation_id: Uuid,
    /// The principal on whose behalf the event was raised.
    pub who: String,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// The payload side of an event: usually an enum with one variant per
/// concrete event type of an aggregate.
pub trait EventPayload:
    Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Returns the stable type tag of this payload (e.g. `"inventory.item_added"`).
    fn event_type(&self) -> &'static str;
}

/// A concrete event type carried inside a payload enum `P`.
///
/// Implementing this for each variant struct lets a router dispatch to an
/// `Apply<E>` impl without the handler re-matching the enum.
pub trait TypedEvent<P>: Sized + 'static {
    /// The type tag shared with `P::event_type()` for this variant.
    const EVENT_TYPE: &'static str;

    /// Borrows this concrete event out of the payload enum, if it holds one.
    fn project(payload: &P) -> Option<&Self>;
}

/// Trait that all domain events implement.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Returns the event type name (used for serialization routing).
    fn event_type(&self) -> &'static str;

    /// Returns the metadata for this event.
    fn metadata(&self) -> &EventMetadata;
}

/// An immutable event: metadata plus a typed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event<P> {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub payload: P,
}

impl<P: EventPayload> Event<P> {
    /// Returns the position of this event in its stream.
    #[must_use]
    pub fn version(&self) -> i64 {
        self.metadata.version
    }

    /// Returns the aggregate this event belongs to.
    #[must_use]
    pub fn aggregate_id(&self) -> Uuid {
        self.metadata.aggregate_id
    }
}

impl<P: EventPayload> DomainEvent for Event<P> {
    fn event_type(&self) -> &'static str {
        self.payload.event_type()
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
