//! Domain-level conflict detection between concurrent writers.
//!
//! When a save finds events committed by someone else since the aggregate was
//! loaded, every (pending, committed) pair is checked against a rule keyed by
//! the ordered pair of event types. Pairs without a rule conflict exactly
//! when both events have the same type. One conflicting pair is enough to
//! reject the save.
//!
//! Rules are registered while building the detector and never change
//! afterwards, so a detector can be shared freely between tasks. Registering
//! the same ordered pair twice keeps the last predicate.

use std::collections::HashMap;
use std::fmt;

use crate::event::{DomainEvent, Event, EventPayload};

/// Predicate deciding whether a pending event conflicts with a committed one.
pub type ConflictRule<P> = Box<dyn Fn(&Event<P>, &Event<P>) -> bool + Send + Sync>;

/// The first pair of event types found to conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictingPair {
    /// Type of the pending event.
    pub uncommitted_type: &'static str,
    /// Type of the concurrently committed event.
    pub committed_type: &'static str,
}

/// Lookup of conflict rules keyed by `(uncommitted type, committed type)`.
pub struct ConflictDetector<P> {
    rules: HashMap<(&'static str, &'static str), ConflictRule<P>>,
}

impl<P: EventPayload> ConflictDetector<P> {
    /// Creates a detector that only applies the same-type default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Registers a rule for the ordered pair. Replaces an earlier rule for the
    /// same pair.
    #[must_use]
    pub fn register<F>(
        mut self,
        uncommitted_type: &'static str,
        committed_type: &'static str,
        predicate: F,
    ) -> Self
    where
        F: Fn(&Event<P>, &Event<P>) -> bool + Send + Sync + 'static,
    {
        let key = (uncommitted_type, committed_type);
        if self.rules.insert(key, Box::new(predicate)).is_some() {
            tracing::debug!(
                uncommitted_type,
                committed_type,
                "conflict rule replaced by later registration"
            );
        }
        self
    }

    /// Declares that the ordered pair never conflicts.
    #[must_use]
    pub fn allow(self, uncommitted_type: &'static str, committed_type: &'static str) -> Self {
        self.register(uncommitted_type, committed_type, |_, _| false)
    }

    /// Returns the first conflicting pair, or `None` if the writes commute.
    #[must_use]
    pub fn find_conflict(
        &self,
        uncommitted: &[Event<P>],
        committed: &[Event<P>],
    ) -> Option<ConflictingPair> {
        uncommitted.iter().find_map(|pending| {
            committed.iter().find_map(|other| {
                let key = (pending.event_type(), other.event_type());
                let conflicts = match self.rules.get(&key) {
                    Some(rule) => rule(pending, other),
                    None => key.0 == key.1,
                };
                conflicts.then_some(ConflictingPair {
                    uncommitted_type: key.0,
                    committed_type: key.1,
                })
            })
        })
    }

    /// Returns `true` if any pair conflicts.
    #[must_use]
    pub fn has_conflict(&self, uncommitted: &[Event<P>], committed: &[Event<P>]) -> bool {
        self.find_conflict(uncommitted, committed).is_some()
    }
}

impl<P: EventPayload> Default for ConflictDetector<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for ConflictDetector<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pairs: Vec<_> = self.rules.keys().copied().collect();
        pairs.sort_unstable();
        f.debug_struct("ConflictDetector")
            .field("rules", &pairs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    use super::*;
    use crate::event::EventMetadata;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum SeatEvent {
        Reserved { seat: u32 },
        Released { seat: u32 },
        Renamed,
    }

    impl EventPayload for SeatEvent {
        fn event_type(&self) -> &'static str {
            match self {
                Self::Reserved { .. } => "seat.reserved",
                Self::Released { .. } => "seat.released",
                Self::Renamed => "seat.renamed",
            }
        }
    }

    fn seat_of(event: &Event<SeatEvent>) -> Option<u32> {
        match event.payload {
            SeatEvent::Reserved { seat } | SeatEvent::Released { seat } => Some(seat),
            SeatEvent::Renamed => None,
        }
    }

    fn event(version: i64, payload: SeatEvent) -> Event<SeatEvent> {
        Event {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: payload.event_type().to_owned(),
                aggregate_id: Uuid::nil(),
                version,
                causation_id: Uuid::new_v4(),
                correlation_id: Uuid::new_v4(),
                who: "tester".to_owned(),
                occurred_at: Utc::now(),
            },
            payload,
        }
    }

    #[test]
    fn test_same_type_conflicts_by_default() {
        // Arrange
        let detector = ConflictDetector::<SeatEvent>::new();
        let pending = vec![event(3, SeatEvent::Renamed)];
        let committed = vec![event(3, SeatEvent::Renamed)];

        // Act
        let found = detector.find_conflict(&pending, &committed);

        // Assert
        assert_eq!(
            found,
            Some(ConflictingPair {
                uncommitted_type: "seat.renamed",
                committed_type: "seat.renamed",
            })
        );
    }

    #[test]
    fn test_different_types_do_not_conflict_by_default() {
        let detector = ConflictDetector::<SeatEvent>::new();
        let pending = vec![event(3, SeatEvent::Reserved { seat: 1 })];
        let committed = vec![event(3, SeatEvent::Renamed)];

        assert!(!detector.has_conflict(&pending, &committed));
    }

    #[test]
    fn test_registered_rule_overrides_default() {
        // Arrange
        let detector = ConflictDetector::<SeatEvent>::new().register(
            "seat.reserved",
            "seat.reserved",
            |pending, committed| seat_of(pending) == seat_of(committed),
        );
        let pending = vec![event(3, SeatEvent::Reserved { seat: 1 })];
        let other_seat = vec![event(3, SeatEvent::Reserved { seat: 2 })];
        let same_seat = vec![event(3, SeatEvent::Reserved { seat: 1 })];

        // Act / Assert
        assert!(!detector.has_conflict(&pending, &other_seat));
        assert!(detector.has_conflict(&pending, &same_seat));
    }

    #[test]
    fn test_rules_are_keyed_by_ordered_pair() {
        // Arrange
        let detector = ConflictDetector::<SeatEvent>::new().register(
            "seat.released",
            "seat.reserved",
            |_, _| true,
        );
        let reserved = vec![event(3, SeatEvent::Reserved { seat: 1 })];
        let released = vec![event(3, SeatEvent::Released { seat: 1 })];

        // Act / Assert
        assert!(detector.has_conflict(&released, &reserved));
        assert!(!detector.has_conflict(&reserved, &released));
    }

    #[test]
    fn test_last_registration_wins() {
        let detector = ConflictDetector::<SeatEvent>::new()
            .register("seat.renamed", "seat.renamed", |_, _| true)
            .allow("seat.renamed", "seat.renamed");
        let pending = vec![event(3, SeatEvent::Renamed)];
        let committed = vec![event(3, SeatEvent::Renamed)];

        assert!(!detector.has_conflict(&pending, &committed));
    }

    #[test]
    fn test_single_conflicting_pair_is_enough() {
        // Arrange
        let detector = ConflictDetector::<SeatEvent>::new();
        let pending = vec![
            event(3, SeatEvent::Reserved { seat: 1 }),
            event(4, SeatEvent::Renamed),
        ];
        let committed = vec![
            event(3, SeatEvent::Released { seat: 9 }),
            event(4, SeatEvent::Renamed),
        ];

        // Act
        let found = detector.find_conflict(&pending, &committed);

        // Assert
        assert_eq!(
            found.map(|pair| pair.uncommitted_type),
            Some("seat.renamed")
        );
    }

    #[test]
    fn test_nothing_committed_means_no_conflict() {
        let detector = ConflictDetector::<SeatEvent>::new();
        let pending = vec![event(1, SeatEvent::Renamed)];

        assert!(!detector.has_conflict(&pending, &[]));
    }
}
