//! `PostgreSQL` implementation of the `EventStore` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chronicle_core::error::DomainError;
use chronicle_core::store::{EventStore, StoredEvent};
use sqlx::PgPool;
use uuid::Uuid;

use crate::batch;

/// PostgreSQL-backed event store.
///
/// An append runs in one transaction: it reads the stream head, compares it
/// with the expected version and inserts the batch. The unique constraint on
/// `(aggregate_id, version)` turns a race between two such transactions into
/// a `ConcurrencyConflict` for the loser.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct EventRow {
    event_id: Uuid,
    aggregate_id: Uuid,
    event_type: String,
    payload: serde_json::Value,
    version: i64,
    commit_id: Uuid,
    causation_id: Uuid,
    correlation_id: Uuid,
    who: String,
    occurred_at: DateTime<Utc>,
}

impl From<EventRow> for StoredEvent {
    fn from(row: EventRow) -> Self {
        Self {
            event_id: row.event_id,
            aggregate_id: row.aggregate_id,
            event_type: row.event_type,
            payload: row.payload,
            version: row.version,
            commit_id: row.commit_id,
            causation_id: row.causation_id,
            correlation_id: row.correlation_id,
            who: row.who,
            occurred_at: row.occurred_at,
        }
    }
}

const SELECT_EVENTS: &str = "SELECT event_id, aggregate_id, event_type, payload, version, \
     commit_id, causation_id, correlation_id, who, occurred_at \
     FROM domain_events";

const HEAD_VERSION: &str =
    "SELECT COALESCE(MAX(version), 0) FROM domain_events WHERE aggregate_id = $1";

const INSERT_EVENT: &str = "INSERT INTO domain_events \
     (event_id, aggregate_id, event_type, payload, version, commit_id, \
      causation_id, correlation_id, who, occurred_at) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)";

impl PgEventStore {
    /// Creates a new `PgEventStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the head version of a stream (0 if it does not exist).
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the query fails.
    pub async fn head_version(&self, aggregate_id: Uuid) -> Result<i64, DomainError> {
        sqlx::query_scalar::<_, i64>(HEAD_VERSION)
            .bind(aggregate_id)
            .fetch_one(&self.pool)
            .await
            .map_err(infrastructure)
    }

    async fn fetch(
        &self,
        sql: &str,
        aggregate_id: Uuid,
        version: Option<i64>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let mut query = sqlx::query_as::<_, EventRow>(sql).bind(aggregate_id);
        if let Some(version) = version {
            query = query.bind(version);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;
        Ok(rows.into_iter().map(StoredEvent::from).collect())
    }
}

fn infrastructure(err: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("event store: {err}"))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl EventStore for PgEventStore {
    #[tracing::instrument(skip(self, events), fields(count = events.len()))]
    async fn append(
        &self,
        aggregate_id: Uuid,
        expected_version: i64,
        events: &[StoredEvent],
    ) -> Result<(), DomainError> {
        if events.is_empty() {
            return Ok(());
        }
        batch::validate(aggregate_id, expected_version, events)?;

        let mut tx = self.pool.begin().await.map_err(infrastructure)?;

        let actual: i64 = sqlx::query_scalar::<_, i64>(HEAD_VERSION)
            .bind(aggregate_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(infrastructure)?;
        if actual != expected_version {
            tracing::debug!(actual, "append rejected, stream moved on");
            return Err(DomainError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        for event in events {
            let inserted = sqlx::query(INSERT_EVENT)
                .bind(event.event_id)
                .bind(event.aggregate_id)
                .bind(&event.event_type)
                .bind(&event.payload)
                .bind(event.version)
                .bind(event.commit_id)
                .bind(event.causation_id)
                .bind(event.correlation_id)
                .bind(&event.who)
                .bind(event.occurred_at)
                .execute(&mut *tx)
                .await;
            if let Err(err) = inserted {
                if !is_unique_violation(&err) {
                    return Err(infrastructure(err));
                }
                drop(tx);
                let actual = self.head_version(aggregate_id).await?;
                tracing::debug!(actual, "append lost the race for the next version");
                return Err(DomainError::ConcurrencyConflict {
                    aggregate_id,
                    expected: expected_version,
                    actual,
                });
            }
        }

        tx.commit().await.map_err(infrastructure)
    }

    async fn read_all(&self, aggregate_id: Uuid) -> Result<Vec<StoredEvent>, DomainError> {
        let sql = format!("{SELECT_EVENTS} WHERE aggregate_id = $1 ORDER BY version");
        self.fetch(&sql, aggregate_id, None).await
    }

    async fn read_up_to(
        &self,
        aggregate_id: Uuid,
        version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let sql =
            format!("{SELECT_EVENTS} WHERE aggregate_id = $1 AND version <= $2 ORDER BY version");
        self.fetch(&sql, aggregate_id, Some(version)).await
    }

    async fn read_since(
        &self,
        aggregate_id: Uuid,
        version: i64,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let sql =
            format!("{SELECT_EVENTS} WHERE aggregate_id = $1 AND version > $2 ORDER BY version");
        self.fetch(&sql, aggregate_id, Some(version)).await
    }
}
