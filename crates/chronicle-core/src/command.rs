//! Command abstractions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identity and causal metadata carried by every command.
///
/// Commands carry no business logic; this is the part of them the engine
/// copies onto the events they cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMetadata {
    /// The aggregate the command targets.
    pub aggregate_id: Uuid,
    /// Unique id of this command; becomes the causation id of its events.
    pub commit_id: Uuid,
    /// Correlation ID to trace this command through the system.
    pub correlation_id: Uuid,
    /// The principal issuing the command.
    pub who: String,
    /// When the command was issued.
    pub issued_at: DateTime<Utc>,
    /// Free-form properties supplied by the caller.
    pub user_properties: BTreeMap<String, String>,
}

impl CommandMetadata {
    /// Creates metadata for a fresh command. The correlation id starts out
    /// equal to the commit id.
    #[must_use]
    pub fn new(aggregate_id: Uuid, who: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        let commit_id = Uuid::new_v4();
        Self {
            aggregate_id,
            commit_id,
            correlation_id: commit_id,
            who: who.into(),
            issued_at,
            user_properties: BTreeMap::new(),
        }
    }

    /// Continues an existing correlation chain.
    #[must_use]
    pub fn correlated_with(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Attaches a user property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_properties.insert(key.into(), value.into());
        self
    }
}

/// Trait that all commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Identity and causal metadata of this command.
    fn metadata(&self) -> &CommandMetadata;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid {
        self.metadata().correlation_id
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_new_metadata_correlates_with_its_own_commit() {
        let issued_at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();

        let meta = CommandMetadata::new(Uuid::new_v4(), "alice", issued_at);

        assert_eq!(meta.correlation_id, meta.commit_id);
        assert_eq!(meta.who, "alice");
        assert!(meta.user_properties.is_empty());
    }

    #[test]
    fn test_builders_override_correlation_and_add_properties() {
        let issued_at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let correlation_id = Uuid::new_v4();

        let meta = CommandMetadata::new(Uuid::new_v4(), "alice", issued_at)
            .correlated_with(correlation_id)
            .with_property("channel", "web");

        assert_eq!(meta.correlation_id, correlation_id);
        assert_ne!(meta.correlation_id, meta.commit_id);
        assert_eq!(
            meta.user_properties.get("channel").map(String::as_str),
            Some("web")
        );
    }
}
