//! Aggregate repository.
//!
//! The [`Repository`] loads aggregates by replaying their streams (optionally
//! starting from a snapshot) and saves them by appending their pending
//! events. Saving runs two concurrency checks:
//!
//! 1. a domain check: events committed by other writers since the aggregate
//!    was loaded are compared with the pending ones through the
//!    [`ConflictDetector`]. A conflict aborts the save; commuting events are
//!    kept and the pending events are appended after them;
//! 2. a storage check: the append itself is a compare-and-append on the
//!    stream version, which closes the window between the read in (1) and
//!    the write.
//!
//! When commuting events were appended first, the saved aggregate is rebuilt
//! from the stream so that its state follows stream order.
//!
//! The repository never retries. Both concurrency errors mean "reload and
//! run the command again", which only the command handler can decide.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use uuid::Uuid;

use crate::aggregate::{Aggregate, AggregateRoot, AggregateState};
use crate::clock::{Clock, SystemClock};
use crate::config::RepositoryConfig;
use crate::conflict::ConflictDetector;
use crate::error::DomainError;
use crate::event::{Event, EventPayload};
use crate::snapshot::SnapshotStore;
use crate::store::{EventPublisher, EventStore, StoredEvent};

type PayloadOf<A> = <<A as AggregateRoot>::State as AggregateState>::Event;

/// How a save ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The pending events were appended.
    Appended,
    /// There was nothing to save.
    NothingToCommit,
    /// An earlier attempt with the same commit id had already been stored.
    AlreadyCommitted,
}

/// Result of a successful save.
#[derive(Debug, Clone)]
pub struct CommitReceipt {
    /// The aggregate that was saved.
    pub aggregate_id: Uuid,
    /// The commit id of the save.
    pub commit_id: Uuid,
    /// How the save ended.
    pub outcome: CommitOutcome,
    /// The stream version this commit is part of.
    pub committed_version: i64,
    /// The events stored by this commit.
    pub events: Vec<StoredEvent>,
    /// How many events could not be published.
    pub publish_failures: usize,
    /// The commit is durable but the aggregate could not be refreshed from
    /// the stream. It must be reloaded before further use.
    pub needs_reload: bool,
}

/// Loads and saves event-sourced aggregates of type `A`.
pub struct Repository<A: AggregateRoot> {
    store: Arc<dyn EventStore>,
    publisher: Arc<dyn EventPublisher>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    conflicts: Arc<ConflictDetector<PayloadOf<A>>>,
    config: RepositoryConfig,
    clock: Arc<dyn Clock>,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A: AggregateRoot> Repository<A> {
    /// Creates a repository with the default conflict rules and no snapshots.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            store,
            publisher,
            snapshots: None,
            conflicts: Arc::new(ConflictDetector::new()),
            config: RepositoryConfig::default(),
            clock: Arc::new(SystemClock),
            _aggregate: PhantomData,
        }
    }

    /// Enables snapshot reads (and writes, per the configured policy).
    #[must_use]
    pub fn with_snapshots(mut self, snapshots: Arc<dyn SnapshotStore>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    /// Replaces the conflict rules.
    #[must_use]
    pub fn with_conflict_detector(mut self, conflicts: ConflictDetector<PayloadOf<A>>) -> Self {
        self.conflicts = Arc::new(conflicts);
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: RepositoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the clock used to stamp snapshots.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Loads the aggregate at its latest version.
    ///
    /// A usable snapshot shortcuts the replay to the events after it.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if neither a snapshot nor any
    /// event exists, `DomainError::InvalidHistory` or
    /// `DomainError::NoHandlerForEvent` if replay fails, and store errors as-is.
    #[tracing::instrument(
        skip(self),
        fields(aggregate_type = <A::State as AggregateState>::AGGREGATE_TYPE)
    )]
    pub async fn get_by_id(&self, aggregate_id: Uuid) -> Result<A, DomainError> {
        let mut aggregate = Aggregate::<A::State>::new(aggregate_id);

        let stored = if self.restore_snapshot(&mut aggregate).await {
            self.store
                .read_since(aggregate_id, aggregate.version())
                .await?
        } else {
            self.store.read_all(aggregate_id).await?
        };
        if stored.is_empty() && aggregate.version() == 0 {
            return Err(DomainError::AggregateNotFound(aggregate_id));
        }

        replay(&mut aggregate, &stored)?;
        tracing::debug!(
            version = aggregate.version(),
            replayed = stored.len(),
            "aggregate loaded"
        );
        Ok(A::from_aggregate(aggregate))
    }

    /// Loads the aggregate as it was at `version`, by full replay.
    ///
    /// Asking for a version beyond the head returns the head.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::AggregateNotFound` if no event exists at or
    /// below `version`, and replay or store errors as for `get_by_id`.
    #[tracing::instrument(
        skip(self),
        fields(aggregate_type = <A::State as AggregateState>::AGGREGATE_TYPE)
    )]
    pub async fn get_by_id_at(&self, aggregate_id: Uuid, version: i64) -> Result<A, DomainError> {
        let stored = self.store.read_up_to(aggregate_id, version).await?;
        if stored.is_empty() {
            return Err(DomainError::AggregateNotFound(aggregate_id));
        }

        let mut aggregate = Aggregate::<A::State>::new(aggregate_id);
        replay(&mut aggregate, &stored)?;
        Ok(A::from_aggregate(aggregate))
    }

    /// Persists the aggregate's pending events under `commit_id`, publishes
    /// them and marks the aggregate committed.
    ///
    /// Saving an aggregate without pending events does nothing. Retrying a
    /// save with the same `commit_id` after an unacknowledged success does
    /// not append twice. After a save that landed behind other writers'
    /// events, the aggregate is rebuilt from the stream; if that rebuild
    /// fails the save still succeeds and the receipt sets `needs_reload`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ConflictingCommand` if another writer committed
    /// a conflicting event, `DomainError::ConcurrencyConflict` if the store
    /// rejected the append, and store errors as-is. The aggregate is not
    /// modified on error.
    #[tracing::instrument(
        skip(self, aggregate),
        fields(
            aggregate_type = <A::State as AggregateState>::AGGREGATE_TYPE,
            aggregate_id = %aggregate.aggregate_id(),
        )
    )]
    pub async fn save(
        &self,
        aggregate: &mut A,
        commit_id: Uuid,
    ) -> Result<CommitReceipt, DomainError> {
        let root = aggregate.aggregate_mut();
        let aggregate_id = root.id();
        if root.uncommitted_events().is_empty() {
            return Ok(CommitReceipt {
                aggregate_id,
                commit_id,
                outcome: CommitOutcome::NothingToCommit,
                committed_version: root.version(),
                events: Vec::new(),
                publish_failures: 0,
                needs_reload: false,
            });
        }

        let loaded_version = root.loaded_version();
        let committed_since = self.store.read_since(aggregate_id, loaded_version).await?;

        if committed_since.iter().any(|e| e.commit_id == commit_id) {
            tracing::info!(%commit_id, "commit already stored, skipping append");
            let head = committed_since.last().map_or(loaded_version, |e| e.version);
            root.mark_committed();
            let needs_reload = !self.refresh(root, head).await;
            return Ok(CommitReceipt {
                aggregate_id,
                commit_id,
                outcome: CommitOutcome::AlreadyCommitted,
                committed_version: head,
                events: committed_since
                    .into_iter()
                    .filter(|e| e.commit_id == commit_id)
                    .collect(),
                publish_failures: 0,
                needs_reload,
            });
        }

        let concurrent: Vec<Event<PayloadOf<A>>> = decode_all(&committed_since)?;
        if let Some(pair) = self
            .conflicts
            .find_conflict(root.uncommitted_events(), &concurrent)
        {
            tracing::info!(
                uncommitted_type = pair.uncommitted_type,
                committed_type = pair.committed_type,
                "conflicting concurrent commit"
            );
            return Err(DomainError::ConflictingCommand {
                aggregate_id,
                uncommitted_type: pair.uncommitted_type.to_owned(),
                committed_type: pair.committed_type.to_owned(),
            });
        }

        let head = committed_since.last().map_or(loaded_version, |e| e.version);
        let events = root
            .uncommitted_events()
            .iter()
            .zip(head + 1..)
            .map(|(event, version)| {
                StoredEvent::encode(event, commit_id).map(|mut stored| {
                    stored.version = version;
                    stored
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Err(err) = self.store.append(aggregate_id, head, &events).await {
            if matches!(err, DomainError::ConcurrencyConflict { .. }) {
                tracing::info!(expected_version = head, "lost append race");
            }
            return Err(err);
        }

        root.mark_committed();
        let committed_version = events.last().map_or(head, |e| e.version);
        let needs_reload = if concurrent.is_empty() {
            false
        } else {
            tracing::debug!(
                concurrent = concurrent.len(),
                "appended after non-conflicting concurrent events"
            );
            !self.refresh(root, committed_version).await
        };

        let publish_failures = self.publish(&events).await;
        if !needs_reload {
            self.offer_snapshot(root, loaded_version).await;
        }

        Ok(CommitReceipt {
            aggregate_id,
            commit_id,
            outcome: CommitOutcome::Appended,
            committed_version,
            events,
            publish_failures,
            needs_reload,
        })
    }

    /// Rebuilds `aggregate` from the stream up to `version`, so that its
    /// state applies events in stream order. Leaves the aggregate as it is
    /// and returns `false` if the rebuild fails.
    async fn refresh(&self, aggregate: &mut Aggregate<A::State>, version: i64) -> bool {
        let aggregate_id = aggregate.id();
        let rebuilt = async {
            let stored = self.store.read_up_to(aggregate_id, version).await?;
            let mut fresh = Aggregate::<A::State>::new(aggregate_id);
            replay(&mut fresh, &stored)?;
            Ok::<_, DomainError>(fresh)
        }
        .await;
        match rebuilt {
            Ok(fresh) => {
                *aggregate = fresh;
                true
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    version,
                    "commit stored but aggregate refresh failed, reload required"
                );
                false
            }
        }
    }

    /// Restores the latest usable snapshot. Any failure is a cache miss.
    async fn restore_snapshot(&self, aggregate: &mut Aggregate<A::State>) -> bool {
        let Some(snapshots) = &self.snapshots else {
            return false;
        };
        let snapshot = match snapshots.get(aggregate.id()).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return false,
            Err(err) => {
                tracing::warn!(error = %err, "snapshot read failed, replaying full stream");
                return false;
            }
        };
        match aggregate.restore_from_snapshot(&snapshot) {
            Ok(()) => {
                tracing::debug!(snapshot_version = snapshot.version, "snapshot restored");
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "snapshot unusable, replaying full stream");
                false
            }
        }
    }

    async fn publish(&self, events: &[StoredEvent]) -> usize {
        let mut failures = 0;
        for event in events {
            if let Err(err) = self.publisher.publish(event).await {
                failures += 1;
                tracing::warn!(
                    event_id = %event.event_id,
                    event_type = %event.event_type,
                    error = %err,
                    "event publication failed"
                );
            }
        }
        failures
    }

    async fn offer_snapshot(&self, aggregate: &Aggregate<A::State>, loaded_version: i64) {
        let Some(snapshots) = &self.snapshots else {
            return;
        };
        if !self
            .config
            .snapshot_policy
            .should_snapshot(loaded_version, aggregate.version())
        {
            return;
        }
        let result = match aggregate.snapshot(self.clock.as_ref()) {
            Ok(snapshot) => snapshots.put(snapshot).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => tracing::debug!(version = aggregate.version(), "snapshot stored"),
            Err(err) => tracing::warn!(error = %err, "snapshot write failed"),
        }
    }
}

impl<A: AggregateRoot> Clone for Repository<A> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            publisher: Arc::clone(&self.publisher),
            snapshots: self.snapshots.clone(),
            conflicts: Arc::clone(&self.conflicts),
            config: self.config,
            clock: Arc::clone(&self.clock),
            _aggregate: PhantomData,
        }
    }
}

impl<A: AggregateRoot> fmt::Debug for Repository<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("aggregate_type", &<A::State as AggregateState>::AGGREGATE_TYPE)
            .field("snapshots", &self.snapshots.is_some())
            .field("conflicts", &self.conflicts)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn decode_all<P: EventPayload>(stored: &[StoredEvent]) -> Result<Vec<Event<P>>, DomainError> {
    stored.iter().map(StoredEvent::decode::<P>).collect()
}

fn replay<S: AggregateState>(
    aggregate: &mut Aggregate<S>,
    stored: &[StoredEvent],
) -> Result<(), DomainError> {
    let events = decode_all(stored)?;
    aggregate.load_from_history(&events).inspect_err(|err| {
        if let DomainError::InvalidHistory { .. } = err {
            tracing::error!(error = %err, "event stream failed consistency checks");
        }
    })
}
