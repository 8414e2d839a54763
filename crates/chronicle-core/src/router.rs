//! Event routing.
//!
//! An [`EventRouter`] is a dispatch table from an event type tag to the
//! function that mutates aggregate state. It is built once, when the
//! aggregate is constructed, through either of two interchangeable paths:
//!
//! - convention: [`EventRouter::on`] picks up the state's [`Apply<E>`] impl
//!   for a concrete event type `E`;
//! - explicit: [`EventRouter::register`] stores a closure under a type tag.
//!
//! Both produce the same kind of table entry, so an aggregate may mix them.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use crate::error::DomainError;
use crate::event::{EventPayload, TypedEvent};

/// State mutation for one concrete event type.
///
/// Implementations must only touch the state itself: routing runs both during
/// replay and during live changes, so it may not perform I/O.
pub trait Apply<E> {
    /// Mutates the state to reflect `event`.
    fn apply(&mut self, event: &E);
}

/// What to do with an event type that has no handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoutingMode {
    /// Fail with `DomainError::NoHandlerForEvent`.
    #[default]
    Strict,
    /// Skip the event. Useful when old aggregates must tolerate newer event
    /// types in their streams.
    Lenient,
}

/// Outcome of a successful `route` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// A handler ran.
    Applied,
    /// No handler exists and the router is lenient.
    Ignored,
}

type Handler<S, P> = Box<dyn Fn(&mut S, &P) -> bool + Send + Sync>;

/// Dispatch table from event type tag to state mutation.
pub struct EventRouter<S, P> {
    aggregate_type: &'static str,
    mode: RoutingMode,
    handlers: HashMap<&'static str, Handler<S, P>>,
    _payload: PhantomData<fn(&P)>,
}

impl<S, P> EventRouter<S, P>
where
    S: 'static,
    P: EventPayload,
{
    /// Creates an empty, strict router for the given aggregate type.
    #[must_use]
    pub fn new(aggregate_type: &'static str) -> Self {
        Self {
            aggregate_type,
            mode: RoutingMode::Strict,
            handlers: HashMap::new(),
            _payload: PhantomData,
        }
    }

    /// Sets the behaviour for unknown event types.
    #[must_use]
    pub fn with_mode(mut self, mode: RoutingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Registers the state's `Apply<E>` impl under `E::EVENT_TYPE`.
    #[must_use]
    pub fn on<E>(mut self) -> Self
    where
        E: TypedEvent<P>,
        S: Apply<E>,
    {
        self.insert(
            E::EVENT_TYPE,
            Box::new(|state: &mut S, payload: &P| match E::project(payload) {
                Some(event) => {
                    state.apply(event);
                    true
                }
                None => false,
            }),
        );
        self
    }

    /// Registers `handler` under `event_type`.
    #[must_use]
    pub fn register<F>(mut self, event_type: &'static str, handler: F) -> Self
    where
        F: Fn(&mut S, &P) + Send + Sync + 'static,
    {
        self.insert(
            event_type,
            Box::new(move |state: &mut S, payload: &P| {
                handler(state, payload);
                true
            }),
        );
        self
    }

    fn insert(&mut self, event_type: &'static str, handler: Handler<S, P>) {
        if self.handlers.insert(event_type, handler).is_some() {
            tracing::debug!(
                aggregate_type = self.aggregate_type,
                event_type,
                "replacing previously registered event handler"
            );
        }
    }

    /// Returns the aggregate type this router serves.
    #[must_use]
    pub fn aggregate_type(&self) -> &'static str {
        self.aggregate_type
    }

    /// Returns the configured routing mode.
    #[must_use]
    pub fn mode(&self) -> RoutingMode {
        self.mode
    }

    /// Returns `true` if a handler is registered for `event_type`.
    #[must_use]
    pub fn handles(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// Dispatches `payload` to its handler.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NoHandlerForEvent` in strict mode when no handler
    /// accepts the payload.
    pub fn route(&self, state: &mut S, payload: &P) -> Result<Routed, DomainError> {
        let event_type = payload.event_type();
        let applied = self
            .handlers
            .get(event_type)
            .is_some_and(|handler| handler(state, payload));
        if applied {
            return Ok(Routed::Applied);
        }

        match self.mode {
            RoutingMode::Strict => Err(DomainError::NoHandlerForEvent {
                aggregate_type: self.aggregate_type,
                event_type: event_type.to_owned(),
            }),
            RoutingMode::Lenient => {
                tracing::debug!(
                    aggregate_type = self.aggregate_type,
                    event_type,
                    "no handler registered, event ignored"
                );
                Ok(Routed::Ignored)
            }
        }
    }
}

impl<S, P> fmt::Debug for EventRouter<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut event_types: Vec<_> = self.handlers.keys().copied().collect();
        event_types.sort_unstable();
        f.debug_struct("EventRouter")
            .field("aggregate_type", &self.aggregate_type)
            .field("mode", &self.mode)
            .field("event_types", &event_types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Deposited {
        amount: i64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Withdrawn {
        amount: i64,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum LedgerEvent {
        Deposited(Deposited),
        Withdrawn(Withdrawn),
        Frozen,
    }

    impl EventPayload for LedgerEvent {
        fn event_type(&self) -> &'static str {
            match self {
                Self::Deposited(_) => "ledger.deposited",
                Self::Withdrawn(_) => "ledger.withdrawn",
                Self::Frozen => "ledger.frozen",
            }
        }
    }

    impl TypedEvent<LedgerEvent> for Deposited {
        const EVENT_TYPE: &'static str = "ledger.deposited";

        fn project(payload: &LedgerEvent) -> Option<&Self> {
            match payload {
                LedgerEvent::Deposited(e) => Some(e),
                _ => None,
            }
        }
    }

    impl TypedEvent<LedgerEvent> for Withdrawn {
        const EVENT_TYPE: &'static str = "ledger.withdrawn";

        fn project(payload: &LedgerEvent) -> Option<&Self> {
            match payload {
                LedgerEvent::Withdrawn(e) => Some(e),
                _ => None,
            }
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Balance {
        total: i64,
        movements: Vec<i64>,
    }

    impl Apply<Deposited> for Balance {
        fn apply(&mut self, event: &Deposited) {
            self.total += event.amount;
            self.movements.push(event.amount);
        }
    }

    impl Apply<Withdrawn> for Balance {
        fn apply(&mut self, event: &Withdrawn) {
            self.total -= event.amount;
            self.movements.push(-event.amount);
        }
    }

    fn convention_router() -> EventRouter<Balance, LedgerEvent> {
        EventRouter::new("ledger")
            .on::<Deposited>()
            .on::<Withdrawn>()
    }

    fn explicit_router() -> EventRouter<Balance, LedgerEvent> {
        EventRouter::new("ledger")
            .register("ledger.deposited", |state: &mut Balance, payload| {
                if let LedgerEvent::Deposited(e) = payload {
                    state.total += e.amount;
                    state.movements.push(e.amount);
                }
            })
            .register("ledger.withdrawn", |state: &mut Balance, payload| {
                if let LedgerEvent::Withdrawn(e) = payload {
                    state.total -= e.amount;
                    state.movements.push(-e.amount);
                }
            })
    }

    fn history() -> Vec<LedgerEvent> {
        vec![
            LedgerEvent::Deposited(Deposited { amount: 100 }),
            LedgerEvent::Withdrawn(Withdrawn { amount: 30 }),
            LedgerEvent::Deposited(Deposited { amount: 5 }),
        ]
    }

    #[test]
    fn test_convention_router_applies_events_in_order() {
        // Arrange
        let router = convention_router();
        let mut state = Balance::default();

        // Act
        for payload in history() {
            assert_eq!(router.route(&mut state, &payload).unwrap(), Routed::Applied);
        }

        // Assert
        assert_eq!(state.total, 75);
        assert_eq!(state.movements, vec![100, -30, 5]);
    }

    #[test]
    fn test_explicit_and_convention_routers_are_interchangeable() {
        // Arrange
        let mut by_convention = Balance::default();
        let mut by_registration = Balance::default();

        // Act
        for payload in history() {
            convention_router()
                .route(&mut by_convention, &payload)
                .unwrap();
            explicit_router()
                .route(&mut by_registration, &payload)
                .unwrap();
        }

        // Assert
        assert_eq!(by_convention, by_registration);
    }

    #[test]
    fn test_strict_router_rejects_unknown_event() {
        // Arrange
        let router = convention_router();
        let mut state = Balance::default();

        // Act
        let result = router.route(&mut state, &LedgerEvent::Frozen);

        // Assert
        match result {
            Err(DomainError::NoHandlerForEvent {
                aggregate_type,
                event_type,
            }) => {
                assert_eq!(aggregate_type, "ledger");
                assert_eq!(event_type, "ledger.frozen");
            }
            other => panic!("expected NoHandlerForEvent, got {other:?}"),
        }
        assert_eq!(state, Balance::default());
    }

    #[test]
    fn test_lenient_router_ignores_unknown_event() {
        // Arrange
        let router = convention_router().with_mode(RoutingMode::Lenient);
        let mut state = Balance::default();

        // Act
        let routed = router.route(&mut state, &LedgerEvent::Frozen).unwrap();

        // Assert
        assert_eq!(routed, Routed::Ignored);
        assert_eq!(state, Balance::default());
    }

    #[test]
    fn test_default_mode_is_strict() {
        assert_eq!(RoutingMode::default(), RoutingMode::Strict);
        assert_eq!(convention_router().mode(), RoutingMode::Strict);
    }

    #[test]
    fn test_later_registration_replaces_earlier_one() {
        // Arrange
        let router = convention_router().register("ledger.deposited", |state: &mut Balance, _| {
            state.total += 1;
        });
        let mut state = Balance::default();

        // Act
        router
            .route(&mut state, &LedgerEvent::Deposited(Deposited { amount: 100 }))
            .unwrap();

        // Assert
        assert_eq!(state.total, 1);
        assert!(state.movements.is_empty());
    }

    #[test]
    fn test_handles_reports_registered_types() {
        let router = convention_router();

        assert!(router.handles("ledger.deposited"));
        assert!(router.handles("ledger.withdrawn"));
        assert!(!router.handles("ledger.frozen"));
    }
}
