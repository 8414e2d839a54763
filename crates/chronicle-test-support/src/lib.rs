//! Shared test doubles and utilities for Chronicle.

mod clock;
mod logging;
mod publisher;
mod store;

pub use clock::FixedClock;
pub use logging::init_tracing;
pub use publisher::{FailingPublisher, RecordingPublisher};
pub use store::{
    EmptyEventStore, FailingEventStore, ReadCall, RecordingEventStore, SlowEventStore,
};
