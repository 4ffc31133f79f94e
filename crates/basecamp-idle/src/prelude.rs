//! Prelude module — commonly used types for convenient import.
//!
//! Use `use basecamp_idle::prelude::*;` to import all essential types.

pub use crate::activity::{ActivityProbe, FixedActivityProbe};
pub use crate::effective::{effective_policy, system_default_policy};
pub use crate::engine::IdleEngine;
pub use crate::error::{IdleError, IdleResult};
pub use crate::hysteresis::HysteresisTracker;
pub use crate::resolution::{least_destructive, matching_schedules};
pub use crate::window::{TimeWindow, window_permits};
