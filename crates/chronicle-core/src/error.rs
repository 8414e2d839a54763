//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
///
/// Both concurrency variants are recovered the same way: discard the
/// aggregate, reload it and re-run the command.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A validation error in domain logic, raised before any event exists.
    #[error("validation error: {0}")]
    Validation(String),

    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// An event stream is out of order or belongs to another aggregate.
    #[error("invalid history for aggregate {aggregate_id}: {reason}")]
    InvalidHistory {
        /// The aggregate being reconstructed.
        aggregate_id: Uuid,
        /// What was wrong with the stream.
        reason: String,
    },

    /// Strict routing found no handler for an event type.
    #[error("no handler for event {event_type} on aggregate type {aggregate_type}")]
    NoHandlerForEvent {
        /// The aggregate type whose router was consulted.
        aggregate_type: &'static str,
        /// The unroutable event type.
        event_type: String,
    },

    /// Another writer committed an event that conflicts with a pending one.
    #[error(
        "conflicting command on aggregate {aggregate_id}: pending {uncommitted_type} conflicts with committed {committed_type}"
    )]
    ConflictingCommand {
        /// The aggregate being saved.
        aggregate_id: Uuid,
        /// Type of the pending event.
        uncommitted_type: String,
        /// Type of the concurrently committed event.
        committed_type: String,
    },

    /// Optimistic concurrency conflict at the storage layer.
    #[error(
        "concurrency conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        /// The aggregate that had the conflict.
        aggregate_id: Uuid,
        /// The expected version.
        expected: i64,
        /// The actual version found.
        actual: i64,
    },

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Returns `true` when the caller may reload the aggregate and retry
    /// the whole command.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConflictingCommand { .. } | Self::ConcurrencyConflict { .. }
        )
    }
}
