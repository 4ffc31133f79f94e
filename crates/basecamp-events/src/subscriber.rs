//! Synchronous subscriber registry for the event bus.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::event::EventRecord;

/// A predicate used by [`FilterSubscriber`] to decide which events to
/// forward to its handler closure.
pub type EventFilter = Box<dyn Fn(&EventRecord) -> bool + Send + Sync>;

/// A synchronous subscriber notified in-line as part of [`EventBus::publish`](crate::EventBus::publish).
///
/// Implementations must not block for long: `notify` runs on the
/// publisher's call stack.
pub trait EventSubscriber: Send + Sync {
    /// Called for every published event this subscriber accepts.
    fn on_event(&self, event: &EventRecord);

    /// Whether this subscriber wants to see a given event. Defaults to
    /// accepting everything.
    fn accepts(&self, _event: &EventRecord) -> bool {
        true
    }

    /// A human-readable name used in panic/lag log messages.
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// Opaque handle returned by [`SubscriberRegistry::register`], used to
/// [`SubscriberRegistry::unregister`] later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Registry of synchronous subscribers notified on every publish.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: RwLock<HashMap<SubscriberId, Arc<dyn EventSubscriber>>>,
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("len", &self.len())
            .finish()
    }
}

impl SubscriberRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber, returning a handle to unregister it later.
    pub fn register(&self, subscriber: Arc<dyn EventSubscriber>) -> SubscriberId {
        let id = SubscriberId::new();
        self.subscribers
            .write()
            .expect("subscriber registry lock poisoned")
            .insert(id, subscriber);
        id
    }

    /// Remove a previously registered subscriber. Returns `true` if it
    /// was present.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        self.subscribers
            .write()
            .expect("subscriber registry lock poisoned")
            .remove(&id)
            .is_some()
    }

    /// Notify every subscriber that accepts this event. A subscriber
    /// that panics is isolated (its panic is caught and logged) and does
    /// not prevent other subscribers from being notified.
    pub fn notify(&self, event: &EventRecord) {
        let subscribers = self
            .subscribers
            .read()
            .expect("subscriber registry lock poisoned");

        for subscriber in subscribers.values() {
            if !subscriber.accepts(event) {
                continue;
            }
            let name = subscriber.name().to_string();
            let result = panic::catch_unwind(AssertUnwindSafe(|| subscriber.on_event(event)));
            if result.is_err() {
                tracing::warn!(subscriber = %name, "event subscriber panicked; continuing");
            }
        }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers
            .read()
            .expect("subscriber registry lock poisoned")
            .len()
    }

    /// Whether the registry has no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all subscribers.
    pub fn clear(&self) {
        self.subscribers
            .write()
            .expect("subscriber registry lock poisoned")
            .clear();
    }
}

/// An [`EventSubscriber`] built from a closure, optionally gated by a
/// filter predicate.
pub struct FilterSubscriber<F> {
    name: String,
    handler: F,
    filter: Option<EventFilter>,
}

impl<F> FilterSubscriber<F>
where
    F: Fn(&EventRecord) + Send + Sync,
{
    /// Build a subscriber that calls `handler` for every event.
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
            filter: None,
        }
    }

    /// Restrict this subscriber to events matching `filter`.
    #[must_use]
    pub fn with_filter(mut self, filter: EventFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

impl<F> EventSubscriber for FilterSubscriber<F>
where
    F: Fn(&EventRecord) + Send + Sync,
{
    fn on_event(&self, event: &EventRecord) {
        (self.handler)(event);
    }

    fn accepts(&self, event: &EventRecord) -> bool {
        self.filter.as_ref().is_none_or(|f| f(event))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::SubjectType;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_event() -> EventRecord {
        EventRecord::new(
            crate::event::EventKind::WorkspaceRunning,
            SubjectType::Workspace,
            "w-1",
            "lifecycle",
            serde_json::json!({}),
        )
    }

    #[test]
    fn register_and_notify() {
        let registry = SubscriberRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let sub = FilterSubscriber::new("counter", move |_event| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        registry.register(Arc::new(sub));

        registry.notify(&sample_event());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregister_stops_notifications() {
        let registry = SubscriberRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let id = registry.register(Arc::new(FilterSubscriber::new("counter", move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })));

        assert!(registry.unregister(id));
        registry.notify(&sample_event());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn filter_gates_delivery() {
        let registry = SubscriberRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let sub = FilterSubscriber::new("budget_only", move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })
        .with_filter(Box::new(|e: &EventRecord| e.kind.is_budget_event()));
        registry.register(Arc::new(sub));

        registry.notify(&sample_event());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        let budget_event = EventRecord::new(
            crate::event::EventKind::BudgetAlertFired,
            SubjectType::Budget,
            "b-1",
            "budget",
            serde_json::json!({}),
        );
        registry.notify(&budget_event);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_subscriber_is_isolated() {
        let registry = SubscriberRegistry::new();
        registry.register(Arc::new(FilterSubscriber::new("boom", |_| {
            panic!("deliberate test panic");
        })));
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        registry.register(Arc::new(FilterSubscriber::new("survivor", move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })));

        registry.notify(&sample_event());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_removes_all() {
        let registry = SubscriberRegistry::new();
        registry.register(Arc::new(FilterSubscriber::new("a", |_| {})));
        registry.register(Arc::new(FilterSubscriber::new("b", |_| {})));
        assert_eq!(registry.len(), 2);
        registry.clear();
        assert!(registry.is_empty());
    }
}
