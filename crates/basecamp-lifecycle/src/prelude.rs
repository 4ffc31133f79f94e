//! Prelude module — commonly used types for convenient import.
//!
//! Use `use basecamp_lifecycle::prelude::*;` to import all essential
//! types.

pub use crate::engine::LifecycleEngine;
pub use crate::error::{LifecycleError, LifecycleResult};
pub use crate::queue::CommandQueue;
pub use crate::transitions::{LifecycleEvent, is_permitted, next_state};
pub use crate::types::{
    ApplyRequest, LaunchPlan, LaunchRequest, LifecycleCommand, LifecycleOutcome,
};
