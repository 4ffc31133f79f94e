//! Idle / hibernation policy engine for the research-workstation
//! orchestrator.
//!
//! [`IdleEngine`] runs the per-scan-tick decision: debounce this
//! workspace's activity reading with [`hysteresis::HysteresisTracker`],
//! resolve its [`effective::effective_policy`] (workspace override >
//! project default > system default), and pick the single
//! least-destructive matching schedule via [`resolution::least_destructive`].
//! What counts as "idle" is delegated to an [`activity::ActivityProbe`]
//! implementation the caller supplies — the engine has no opinion on
//! CPU/network/interactive thresholds, only on debouncing and resolution.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod activity;
pub mod effective;
pub mod engine;
pub mod error;
pub mod hysteresis;
pub mod prelude;
pub mod resolution;
pub mod window;

pub use activity::{ActivityProbe, FixedActivityProbe};
pub use effective::{effective_policy, system_default_policy};
pub use engine::IdleEngine;
pub use error::{IdleError, IdleResult};
pub use hysteresis::HysteresisTracker;
pub use resolution::{least_destructive, matching_schedules};
pub use window::{TimeWindow, window_permits};
