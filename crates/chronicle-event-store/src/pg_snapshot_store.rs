//! `PostgreSQL` implementation of the `SnapshotStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chronicle_core::error::DomainError;
use chronicle_core::snapshot::{Snapshot, SnapshotStore};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL-backed snapshot store keeping one row per aggregate.
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    aggregate_id: Uuid,
    aggregate_type: String,
    version: i64,
    state: serde_json::Value,
    taken_at: DateTime<Utc>,
}

impl PgSnapshotStore {
    /// Creates a new `PgSnapshotStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn infrastructure(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("snapshot store: {err}"))
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn get(&self, aggregate_id: Uuid) -> Result<Option<Snapshot>, DomainError> {
        let row = sqlx::query_as::<_, SnapshotRow>(
            "SELECT aggregate_id, aggregate_type, version, state, taken_at \
             FROM aggregate_snapshots WHERE aggregate_id = $1",
        )
        .bind(aggregate_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?;

        Ok(row.map(|row| Snapshot {
            aggregate_id: row.aggregate_id,
            aggregate_type: row.aggregate_type,
            version: row.version,
            state: row.state,
            taken_at: row.taken_at,
        }))
    }

    /// Upserts the snapshot unless a newer one is already stored.
    #[tracing::instrument(
        skip(self, snapshot),
        fields(aggregate_id = %snapshot.aggregate_id, version = snapshot.version)
    )]
    async fn put(&self, snapshot: Snapshot) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO aggregate_snapshots \
             (aggregate_id, aggregate_type, version, state, taken_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (aggregate_id) DO UPDATE SET \
             aggregate_type = EXCLUDED.aggregate_type, \
             version = EXCLUDED.version, \
             state = EXCLUDED.state, \
             taken_at = EXCLUDED.taken_at \
             WHERE aggregate_snapshots.version <= EXCLUDED.version",
        )
        .bind(snapshot.aggregate_id)
        .bind(&snapshot.aggregate_type)
        .bind(snapshot.version)
        .bind(&snapshot.state)
        .bind(snapshot.taken_at)
        .execute(&self.pool)
        .await
        .map_err(infrastructure)?;
        Ok(())
    }
}
