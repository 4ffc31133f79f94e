//! Commonly used types for convenient import.
//!
//! ```rust
//! use basecamp_events::prelude::*;
//! ```

pub use crate::{
    DEFAULT_CHANNEL_CAPACITY, EventBus, EventFilter, EventKind, EventReceiver, EventRecord,
    EventSubscriber, FilterSubscriber, SubjectType, SubscriberId, SubscriberRegistry,
};
