//! Integration tests for `PgEventStore` and `PgSnapshotStore`.
//!
//! These need a running `PostgreSQL` reachable through `DATABASE_URL`:
//! `cargo test -p chronicle-event-store -- --ignored`.

use chrono::Utc;
use chronicle_core::error::DomainError;
use chronicle_core::snapshot::{Snapshot, SnapshotStore};
use chronicle_core::store::{EventStore, StoredEvent};
use chronicle_event_store::{PgEventStore, PgSnapshotStore};
use sqlx::PgPool;
use uuid::Uuid;

/// Helper to build a `StoredEvent` with sensible defaults.
fn make_stored_event(aggregate_id: Uuid, version: i64) -> StoredEvent {
    StoredEvent {
        event_id: Uuid::new_v4(),
        aggregate_id,
        event_type: "test.happened".to_string(),
        payload: serde_json::json!({"key": "value"}),
        version,
        commit_id: Uuid::new_v4(),
        causation_id: Uuid::new_v4(),
        correlation_id: Uuid::new_v4(),
        who: "tester".to_string(),
        occurred_at: Utc::now(),
    }
}

fn make_snapshot(aggregate_id: Uuid, version: i64) -> Snapshot {
    Snapshot {
        aggregate_id,
        aggregate_type: "test".to_string(),
        version,
        state: serde_json::json!({"total": version}),
        taken_at: Utc::now(),
    }
}

// --- read_all ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_read_all_returns_empty_vec_for_nonexistent_aggregate(pool: PgPool) {
    let store = PgEventStore::new(pool);

    let events = store.read_all(Uuid::new_v4()).await.unwrap();

    assert!(events.is_empty());
}

// --- append + read round-trip ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_append_and_read_single_event(pool: PgPool) {
    // Arrange
    let store = PgEventStore::new(pool);
    let aggregate_id = Uuid::new_v4();
    let event = make_stored_event(aggregate_id, 1);

    // Act
    store
        .append(aggregate_id, 0, std::slice::from_ref(&event))
        .await
        .unwrap();

    // Assert
    let loaded = store.read_all(aggregate_id).await.unwrap();
    assert_eq!(loaded.len(), 1);
    let e = &loaded[0];
    assert_eq!(e.event_id, event.event_id);
    assert_eq!(e.event_type, event.event_type);
    assert_eq!(e.payload, event.payload);
    assert_eq!(e.version, 1);
    assert_eq!(e.commit_id, event.commit_id);
    assert_eq!(e.causation_id, event.causation_id);
    assert_eq!(e.correlation_id, event.correlation_id);
    assert_eq!(e.who, "tester");
}

// --- ordering and ranges ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_reads_preserve_version_order(pool: PgPool) {
    // Arrange
    let store = PgEventStore::new(pool);
    let aggregate_id = Uuid::new_v4();
    let events: Vec<_> = (1..=5)
        .map(|v| make_stored_event(aggregate_id, v))
        .collect();
    store.append(aggregate_id, 0, &events).await.unwrap();

    // Act
    let all = store.read_all(aggregate_id).await.unwrap();
    let head = store.read_up_to(aggregate_id, 2).await.unwrap();
    let tail = store.read_since(aggregate_id, 2).await.unwrap();

    // Assert
    let versions = |events: &[StoredEvent]| events.iter().map(|e| e.version).collect::<Vec<_>>();
    assert_eq!(versions(&all), vec![1, 2, 3, 4, 5]);
    assert_eq!(versions(&head), vec![1, 2]);
    assert_eq!(versions(&tail), vec![3, 4, 5]);
    assert_eq!(store.head_version(aggregate_id).await.unwrap(), 5);
}

// --- aggregate isolation ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_aggregate_isolation(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let agg_a = Uuid::new_v4();
    let agg_b = Uuid::new_v4();

    store
        .append(agg_a, 0, &[make_stored_event(agg_a, 1)])
        .await
        .unwrap();
    store
        .append(agg_b, 0, &[make_stored_event(agg_b, 1)])
        .await
        .unwrap();

    let loaded_a = store.read_all(agg_a).await.unwrap();
    let loaded_b = store.read_all(agg_b).await.unwrap();
    assert_eq!(loaded_a.len(), 1);
    assert_eq!(loaded_b.len(), 1);
    assert_eq!(loaded_a[0].aggregate_id, agg_a);
    assert_eq!(loaded_b[0].aggregate_id, agg_b);
}

// --- concurrency ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrency_conflict_on_stale_expected_version(pool: PgPool) {
    // Arrange
    let store = PgEventStore::new(pool);
    let aggregate_id = Uuid::new_v4();
    store
        .append(
            aggregate_id,
            0,
            &[
                make_stored_event(aggregate_id, 1),
                make_stored_event(aggregate_id, 2),
            ],
        )
        .await
        .unwrap();

    // Act
    let result = store
        .append(aggregate_id, 1, &[make_stored_event(aggregate_id, 2)])
        .await;

    // Assert
    match result {
        Err(DomainError::ConcurrencyConflict {
            aggregate_id: conflict_agg_id,
            expected,
            actual,
        }) => {
            assert_eq!(conflict_agg_id, aggregate_id);
            assert_eq!(expected, 1);
            assert_eq!(actual, 2);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_racing_appends_admit_exactly_one(pool: PgPool) {
    // Arrange
    let store = PgEventStore::new(pool);
    let aggregate_id = Uuid::new_v4();
    let first = [make_stored_event(aggregate_id, 1)];
    let second = [make_stored_event(aggregate_id, 1)];

    // Act
    let (a, b) = tokio::join!(
        store.append(aggregate_id, 0, &first),
        store.append(aggregate_id, 0, &second),
    );

    // Assert
    assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
    let loser = if a.is_err() { a } else { b };
    assert!(matches!(
        loser,
        Err(DomainError::ConcurrencyConflict { actual: 1, .. })
    ));
    assert_eq!(store.read_all(aggregate_id).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_append_empty_events_is_noop(pool: PgPool) {
    let store = PgEventStore::new(pool);
    let aggregate_id = Uuid::new_v4();

    store.append(aggregate_id, 0, &[]).await.unwrap();

    assert!(store.read_all(aggregate_id).await.unwrap().is_empty());
}

// --- payload serialization ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_complex_json_payload_round_trip(pool: PgPool) {
    // Arrange
    let store = PgEventStore::new(pool);
    let aggregate_id = Uuid::new_v4();
    let complex_payload = serde_json::json!({
        "nested": {"key": "value", "number": 42},
        "array": [1, "two", null, true, false],
        "empty_object": {},
    });
    let mut event = make_stored_event(aggregate_id, 1);
    event.payload = complex_payload.clone();

    // Act
    store.append(aggregate_id, 0, &[event]).await.unwrap();

    // Assert
    let loaded = store.read_all(aggregate_id).await.unwrap();
    assert_eq!(loaded[0].payload, complex_payload);
}

// --- snapshots ---

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_snapshot_upsert_keeps_the_newest(pool: PgPool) {
    // Arrange
    let snapshots = PgSnapshotStore::new(pool);
    let aggregate_id = Uuid::new_v4();

    // Act
    snapshots
        .put(make_snapshot(aggregate_id, 10))
        .await
        .unwrap();
    snapshots.put(make_snapshot(aggregate_id, 4)).await.unwrap();

    // Assert
    let stored = snapshots.get(aggregate_id).await.unwrap().unwrap();
    assert_eq!(stored.version, 10);
    assert_eq!(stored.state, serde_json::json!({"total": 10}));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_snapshot_missing_is_none(pool: PgPool) {
    let snapshots = PgSnapshotStore::new(pool);

    assert!(snapshots.get(Uuid::new_v4()).await.unwrap().is_none());
}
