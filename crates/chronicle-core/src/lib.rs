//! Chronicle Core: event-sourced aggregate persistence.
//!
//! Aggregates are rebuilt by replaying their event streams through an
//! [`router::EventRouter`], change state only by raising events, and are
//! saved through a [`repository::Repository`] that checks concurrent
//! writers both at the domain level ([`conflict::ConflictDetector`]) and at
//! the storage level (compare-and-append on the stream version).
//!
//! This crate defines the abstractions and the repository algorithm. Storage
//! backends live in `chronicle-event-store`.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod config;
pub mod conflict;
pub mod error;
pub mod event;
pub mod repository;
pub mod router;
pub mod snapshot;
pub mod store;
