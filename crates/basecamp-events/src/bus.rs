//! Event bus for broadcasting events to subscribers.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::event::{EventRecord, SubjectType};
use crate::subscriber::SubscriberRegistry;

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Event bus for broadcasting events to all subscribers.
///
/// The event bus uses a single broadcast channel shared by every
/// subscriber, so total order is preserved per subject trivially: every subscriber observes the same sequence, and
/// [`EventBus::subscribe_topic`] is a client-side filter over that same
/// sequence rather than a separate channel per subject type.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events.
    sender: broadcast::Sender<Arc<EventRecord>>,
    /// Registry for synchronous subscribers.
    registry: SubscriberRegistry,
    /// Channel capacity.
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            registry: SubscriberRegistry::new(),
            capacity,
        }
    }

    /// Publish an event to all subscribers.
    ///
    /// Notifies synchronous subscribers in-line, then broadcasts to async
    /// subscribers. Returns the number of async receivers that received
    /// the event (0 if there were none — not an error, since in-process
    /// subscribers may simply not exist yet).
    pub fn publish(&self, event: EventRecord) -> usize {
        let event = Arc::new(event);

        trace!(event_kind = %event.kind.as_str(), "publishing event");

        self.registry.notify(&event);

        if let Ok(count) = self.sender.send(Arc::clone(&event)) {
            debug!(
                event_kind = %event.kind.as_str(),
                receiver_count = count,
                "event published"
            );
            count
        } else {
            trace!(event_kind = %event.kind.as_str(), "no receivers for event");
            0
        }
    }

    /// Subscribe to every event published on the bus.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            subject_filter: None,
        }
    }

    /// Subscribe to events about a single subject type only (e.g. only
    /// `Workspace` events). The underlying channel is shared, so
    /// per-subject total order is still preserved; events of other
    /// subject types are simply skipped by this receiver.
    #[must_use]
    pub fn subscribe_topic(&self, subject_type: SubjectType) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            subject_filter: Some(subject_type),
        }
    }

    /// Get the synchronous subscriber registry.
    #[must_use]
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    /// Get a mutable reference to the subscriber registry.
    pub fn registry_mut(&mut self) -> &mut SubscriberRegistry {
        &mut self.registry
    }

    /// Get the current number of active async subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        // Shares the sender (same event stream) but starts with a fresh
        // registry — synchronous subscribers are per-handle, not per-stream.
        Self {
            sender: self.sender.clone(),
            registry: SubscriberRegistry::new(),
            capacity: self.capacity,
        }
    }
}

/// Receiver for events from the event bus.
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<EventRecord>>,
    subject_filter: Option<SubjectType>,
}

impl EventReceiver {
    fn matches(&self, event: &EventRecord) -> bool {
        self.subject_filter.is_none_or(|want| want == event.subject_type)
    }

    /// Receive the next matching event.
    ///
    /// Returns `None` if the channel is closed. A slow receiver that
    /// lags behind the channel's capacity logs a warning and continues
    /// from the oldest event still buffered, per `tokio::sync::broadcast`
    /// semantics.
    pub async fn recv(&mut self) -> Option<Arc<EventRecord>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "event receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive the next matching event without blocking.
    pub fn try_recv(&mut self) -> Option<Arc<EventRecord>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "event receiver lagged, events dropped");
                },
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    fn workspace_event() -> EventRecord {
        EventRecord::new(
            EventKind::WorkspaceRunning,
            SubjectType::Workspace,
            "w-1",
            "lifecycle",
            serde_json::json!({}),
        )
    }

    fn budget_event() -> EventRecord {
        EventRecord::new(
            EventKind::BudgetAlertFired,
            SubjectType::Budget,
            "b-1",
            "budget",
            serde_json::json!({}),
        )
    }

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        let count = bus.publish(workspace_event());
        assert_eq!(count, 1);

        let msg = receiver.recv().await.unwrap();
        assert_eq!(msg.kind, EventKind::WorkspaceRunning);
    }

    #[tokio::test]
    async fn subscribe_topic_filters_other_subjects() {
        let bus = EventBus::new();
        let mut workspace_only = bus.subscribe_topic(SubjectType::Workspace);

        bus.publish(budget_event());
        bus.publish(workspace_event());

        let received = workspace_only.recv().await.unwrap();
        assert_eq!(received.subject_type, SubjectType::Workspace);
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let bus = EventBus::new();
        let mut r1 = bus.subscribe();
        let mut r2 = bus.subscribe();

        let count = bus.publish(workspace_event());
        assert_eq!(count, 2);

        assert_eq!(r1.recv().await.unwrap().kind, EventKind::WorkspaceRunning);
        assert_eq!(r2.recv().await.unwrap().kind, EventKind::WorkspaceRunning);
    }

    #[tokio::test]
    async fn no_subscribers_returns_zero() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(workspace_event()), 0);
    }

    #[tokio::test]
    async fn try_recv_empty_then_some() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();
        assert!(receiver.try_recv().is_none());

        bus.publish(workspace_event());
        assert!(receiver.try_recv().is_some());
    }
}
