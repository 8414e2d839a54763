//! In-process event publisher backed by a tokio broadcast channel.
//!
//! Delivery is lossy: a subscriber that falls more than `capacity` events
//! behind sees `RecvError::Lagged` and must rebuild from the event store.

use async_trait::async_trait;
use chronicle_core::error::DomainError;
use chronicle_core::store::{EventPublisher, StoredEvent};
use tokio::sync::broadcast;

/// Default channel capacity.
pub const DEFAULT_CAPACITY: usize = 256;

/// Publishes committed events to every live subscriber.
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<StoredEvent>,
}

impl BroadcastEventPublisher {
    /// Creates a publisher whose channel buffers `capacity` events.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoredEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish(&self, event: &StoredEvent) -> Result<(), DomainError> {
        // No subscribers is not a failure: the log stays the source of truth.
        if self.sender.send(event.clone()).is_err() {
            tracing::trace!(event_id = %event.event_id, "no subscribers for event");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn stored(version: i64) -> StoredEvent {
        StoredEvent {
            event_id: Uuid::new_v4(),
            aggregate_id: Uuid::new_v4(),
            event_type: "test.happened".to_owned(),
            payload: serde_json::json!({}),
            version,
            commit_id: Uuid::new_v4(),
            causation_id: Uuid::new_v4(),
            correlation_id: Uuid::new_v4(),
            who: "tester".to_owned(),
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_events_in_order() {
        // Arrange
        let publisher = BroadcastEventPublisher::default();
        let mut receiver = publisher.subscribe();
        let first = stored(1);
        let second = stored(2);

        // Act
        publisher.publish(&first).await.unwrap();
        publisher.publish(&second).await.unwrap();

        // Assert
        assert_eq!(receiver.recv().await.unwrap(), first);
        assert_eq!(receiver.recv().await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_succeeds() {
        let publisher = BroadcastEventPublisher::new(4);

        let result = publisher.publish(&stored(1)).await;

        assert!(result.is_ok());
    }
}
