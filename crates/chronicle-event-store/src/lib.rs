//! Chronicle event store: collaborator implementations for the repository.
//!
//! - [`in_memory`]: process-local event and snapshot stores for tests and
//!   single-process use.
//! - [`pg_event_store`] and [`pg_snapshot_store`]: `PostgreSQL` persistence.
//! - [`publisher`]: an in-process broadcast publisher.

mod batch;
pub mod config;
pub mod in_memory;
pub mod pg_event_store;
pub mod pg_snapshot_store;
pub mod publisher;
pub mod schema;

pub use config::{ConfigError, PgStoreConfig};
pub use in_memory::{InMemoryEventStore, InMemorySnapshotStore};
pub use pg_event_store::PgEventStore;
pub use pg_snapshot_store::PgSnapshotStore;
pub use publisher::BroadcastEventPublisher;
