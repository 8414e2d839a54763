//! Aggregate root abstraction.
//!
//! An [`Aggregate`] is the unit of consistency. Its state is only ever
//! changed by routing events through its [`EventRouter`], whether the events
//! are freshly raised by business logic or replayed from the store, so the
//! in-memory state always equals a replay of every event applied so far.

use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::clock::Clock;
use crate::command::CommandMetadata;
use crate::error::DomainError;
use crate::event::{Event, EventMetadata, EventPayload};
use crate::router::EventRouter;
use crate::snapshot::Snapshot;

/// The materialised state of an aggregate type.
pub trait AggregateState:
    Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The payload enum of this aggregate's events.
    type Event: EventPayload;

    /// Stable name of the aggregate type.
    const AGGREGATE_TYPE: &'static str;

    /// Builds the dispatch table used by every instance.
    fn router() -> EventRouter<Self, Self::Event>;
}

/// Event-sourced aggregate: identity, version, state and pending events.
#[derive(Debug)]
pub struct Aggregate<S: AggregateState> {
    id: Uuid,
    version: i64,
    state: S,
    uncommitted_events: Vec<Event<S::Event>>,
    router: EventRouter<S, S::Event>,
}

impl<S: AggregateState> Aggregate<S> {
    /// Creates a bare aggregate at version 0 with default state.
    ///
    /// New aggregates go through a domain factory that raises a creation
    /// event; reconstructed ones are fed history or a snapshot.
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            state: S::default(),
            uncommitted_events: Vec::new(),
            router: S::router(),
        }
    }

    /// Returns the aggregate identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the number of events applied (committed and pending).
    #[must_use]
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Returns the version the aggregate had before its pending events.
    #[allow(clippy::cast_possible_wrap)]
    #[must_use]
    pub fn loaded_version(&self) -> i64 {
        self.version - self.uncommitted_events.len() as i64
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Returns uncommitted events produced by command handling.
    #[must_use]
    pub fn uncommitted_events(&self) -> &[Event<S::Event>] {
        &self.uncommitted_events
    }

    /// Raises a new event caused by the command described by `cause`.
    ///
    /// The event is applied to the state immediately, appended to the pending
    /// events and the version is bumped. Business rules must already have
    /// been checked: a raised event is a fact.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NoHandlerForEvent` if a strict router has no
    /// handler. The aggregate is left untouched in that case.
    pub fn raise(
        &mut self,
        payload: S::Event,
        cause: &CommandMetadata,
        clock: &dyn Clock,
    ) -> Result<&Event<S::Event>, DomainError> {
        let event = Event {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: payload.event_type().to_owned(),
                aggregate_id: self.id,
                version: self.version + 1,
                causation_id: cause.commit_id,
                correlation_id: cause.correlation_id,
                who: cause.who.clone(),
                occurred_at: clock.now(),
            },
            payload,
        };

        self.router.route(&mut self.state, &event.payload)?;
        self.version += 1;
        self.uncommitted_events.push(event);
        Ok(&self.uncommitted_events[self.uncommitted_events.len() - 1])
    }

    /// Replays recorded events without queueing them as pending.
    ///
    /// Events must belong to this aggregate and continue the stream exactly
    /// at `version + 1`, which is 1 for a bare aggregate or the snapshot
    /// version plus one after a restore. An empty slice is accepted.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidHistory` if the aggregate has pending
    /// events, or the stream is foreign or out of order; nothing is applied
    /// in that case. Returns `DomainError::NoHandlerForEvent` from a strict
    /// router, after which the aggregate must be discarded.
    pub fn load_from_history(&mut self, events: &[Event<S::Event>]) -> Result<(), DomainError> {
        if !self.uncommitted_events.is_empty() {
            return Err(self.invalid_history("cannot replay onto an aggregate with pending events"));
        }

        let mut expected = self.version + 1;
        for event in events {
            if event.metadata.aggregate_id != self.id {
                return Err(self.invalid_history(format!(
                    "event {} belongs to aggregate {}",
                    event.metadata.event_id, event.metadata.aggregate_id
                )));
            }
            if event.metadata.version != expected {
                return Err(self.invalid_history(format!(
                    "expected version {expected}, found {}",
                    event.metadata.version
                )));
            }
            expected += 1;
        }

        for event in events {
            self.router.route(&mut self.state, &event.payload)?;
            self.version += 1;
        }
        Ok(())
    }

    /// Clears uncommitted events after persistence. The version is unchanged.
    pub fn mark_committed(&mut self) {
        self.uncommitted_events.clear();
    }

    /// Captures the current state as a snapshot stamped with `clock`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if events are still pending, and
    /// `DomainError::Infrastructure` if the state cannot be serialized.
    pub fn snapshot(&self, clock: &dyn Clock) -> Result<Snapshot, DomainError> {
        if !self.uncommitted_events.is_empty() {
            return Err(DomainError::Validation(format!(
                "cannot snapshot aggregate {} with uncommitted events",
                self.id
            )));
        }
        let state = serde_json::to_value(&self.state).map_err(|e| {
            DomainError::Infrastructure(format!("snapshot serialization failed: {e}"))
        })?;
        Ok(Snapshot {
            aggregate_id: self.id,
            aggregate_type: S::AGGREGATE_TYPE.to_owned(),
            version: self.version,
            state,
            taken_at: clock.now(),
        })
    }

    /// Restores state and version from a snapshot. No events are applied;
    /// the caller replays the tail with `load_from_history`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidHistory` if the aggregate is not bare or
    /// the snapshot belongs to another aggregate or type, and
    /// `DomainError::Infrastructure` if the state cannot be deserialized.
    pub fn restore_from_snapshot(&mut self, snapshot: &Snapshot) -> Result<(), DomainError> {
        if self.version != 0 || !self.uncommitted_events.is_empty() {
            return Err(
                self.invalid_history("snapshots can only be restored onto a bare aggregate"),
            );
        }
        if snapshot.aggregate_id != self.id || snapshot.aggregate_type != S::AGGREGATE_TYPE {
            return Err(self.invalid_history(format!(
                "snapshot of {} {} does not match",
                snapshot.aggregate_type, snapshot.aggregate_id
            )));
        }
        if snapshot.version < 0 {
            return Err(self.invalid_history(format!(
                "snapshot version {} is negative",
                snapshot.version
            )));
        }

        self.state = serde_json::from_value(snapshot.state.clone()).map_err(|e| {
            DomainError::Infrastructure(format!("snapshot deserialization failed: {e}"))
        })?;
        self.version = snapshot.version;
        Ok(())
    }

    fn invalid_history(&self, reason: impl Into<String>) -> DomainError {
        DomainError::InvalidHistory {
            aggregate_id: self.id,
            reason: reason.into(),
        }
    }
}

/// Trait for aggregate roots that the repository can load and save.
///
/// Domain aggregates wrap an [`Aggregate`] and add their business methods;
/// the bare [`Aggregate`] implements this trait too.
pub trait AggregateRoot: Send + Sync + Sized {
    /// The state type of the wrapped aggregate.
    type State: AggregateState;

    /// Wraps a reconstructed aggregate.
    fn from_aggregate(aggregate: Aggregate<Self::State>) -> Self;

    /// Returns the wrapped aggregate.
    fn aggregate(&self) -> &Aggregate<Self::State>;

    /// Returns the wrapped aggregate mutably.
    fn aggregate_mut(&mut self) -> &mut Aggregate<Self::State>;

    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid {
        self.aggregate().id()
    }

    /// Returns the current version (number of events applied).
    fn version(&self) -> i64 {
        self.aggregate().version()
    }

    /// Returns uncommitted events produced by command handling.
    fn uncommitted_events(&self) -> &[Event<<Self::State as AggregateState>::Event>] {
        self.aggregate().uncommitted_events()
    }
}

impl<S: AggregateState> AggregateRoot for Aggregate<S> {
    type State = S;

    fn from_aggregate(aggregate: Aggregate<S>) -> Self {
        aggregate
    }

    fn aggregate(&self) -> &Aggregate<S> {
        self
    }

    fn aggregate_mut(&mut self) -> &mut Aggregate<S> {
        self
    }
}
