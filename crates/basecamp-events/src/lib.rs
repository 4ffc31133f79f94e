//! In-process event bus for the research-workstation orchestrator:
//! topic-partitioned by subject type, at-least-once delivery to
//! in-process subscribers, total order preserved per subject, no
//! persistence beyond process lifetime.
//!
//! # Example
//!
//! ```rust
//! use basecamp_events::{EventBus, EventRecord, EventKind, SubjectType};
//!
//! # async fn example() {
//! let bus = EventBus::new();
//! let mut receiver = bus.subscribe();
//!
//! bus.publish(EventRecord::new(
//!     EventKind::WorkspaceRunning,
//!     SubjectType::Workspace,
//!     "w-1",
//!     "lifecycle",
//!     serde_json::json!({}),
//! ));
//!
//! let event = receiver.recv().await.unwrap();
//! assert_eq!(event.kind, EventKind::WorkspaceRunning);
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod bus;
mod event;
mod subscriber;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventReceiver};
pub use event::{EventKind, EventRecord, SubjectType};
pub use subscriber::{
    EventFilter, EventSubscriber, FilterSubscriber, SubscriberId, SubscriberRegistry,
};
