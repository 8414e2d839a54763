//! Event store database schema.
//!
//! The DDL lives in the workspace `migrations/` directory: `domain_events`
//! holds every event of every stream, unique on `(aggregate_id, version)`;
//! `aggregate_snapshots` holds the latest snapshot per aggregate.

use sqlx::migrate::Migrator;

/// Embedded migrations for the event and snapshot tables.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");
