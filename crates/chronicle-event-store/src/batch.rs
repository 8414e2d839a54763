//! Checks shared by every store before a batch is written.

use chronicle_core::error::DomainError;
use chronicle_core::store::StoredEvent;
use uuid::Uuid;

/// Rejects batches that would break the stream: foreign events, or versions
/// that do not continue exactly at `expected_version + 1`.
pub(crate) fn validate(
    aggregate_id: Uuid,
    expected_version: i64,
    events: &[StoredEvent],
) -> Result<(), DomainError> {
    let mut next = expected_version + 1;
    for event in events {
        if event.aggregate_id != aggregate_id {
            return Err(DomainError::Validation(format!(
                "event {} belongs to aggregate {}, not {aggregate_id}",
                event.event_id, event.aggregate_id
            )));
        }
        if event.version != next {
            return Err(DomainError::Validation(format!(
                "batch for aggregate {aggregate_id} must continue at version {next}, found {}",
                event.version
            )));
        }
        next += 1;
    }
    Ok(())
}
