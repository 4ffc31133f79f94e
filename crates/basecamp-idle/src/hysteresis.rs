//! Debounced idle-duration tracking, one entry per workspace.
//!
//! A single idle observation is not enough to act on: two consecutive
//! idle observations are required before the elapsed idle duration is
//! trusted. [`HysteresisTracker`] holds that per-workspace state across
//! scan ticks.

use std::collections::HashMap;

use basecamp_core::ids::WorkspaceId;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy)]
struct WorkspaceIdleState {
    consecutive_idle_ticks: u32,
    idle_since: Option<DateTime<Utc>>,
}

/// Tracks, per workspace, how long the workspace has been continuously
/// idle — but only once at least two consecutive idle ticks have been
/// observed.
#[derive(Debug, Default)]
pub struct HysteresisTracker {
    state: HashMap<WorkspaceId, WorkspaceIdleState>,
}

/// Required consecutive idle observations before the tracker reports a
/// debounced idle duration.
pub const REQUIRED_CONSECUTIVE_IDLE_TICKS: u32 = 2;

impl HysteresisTracker {
    /// A tracker with no workspaces observed yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record this tick's observation for a workspace and return the
    /// debounced idle duration, if hysteresis has been satisfied.
    ///
    /// `now` is the scan tick's timestamp; `first_idle_tick_guess` is used
    /// only the first time a workspace is observed idle, to seed
    /// `idle_since` — in practice the caller passes `now` itself, so the
    /// duration starts accruing from the tick hysteresis is satisfied on,
    /// not retroactively.
    pub fn observe(&mut self, workspace: WorkspaceId, idle_now: bool, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let entry = self.state.entry(workspace).or_insert(WorkspaceIdleState {
            consecutive_idle_ticks: 0,
            idle_since: None,
        });

        if idle_now {
            entry.consecutive_idle_ticks = entry.consecutive_idle_ticks.saturating_add(1);
            if entry.idle_since.is_none() {
                entry.idle_since = Some(now);
            }
        } else {
            entry.consecutive_idle_ticks = 0;
            entry.idle_since = None;
        }

        if entry.consecutive_idle_ticks >= REQUIRED_CONSECUTIVE_IDLE_TICKS {
            entry.idle_since.map(|since| now - since)
        } else {
            None
        }
    }

    /// Drop tracked state for a workspace — called once it leaves
    /// `running`, so a later re-entry into `running` starts fresh.
    pub fn forget(&mut self, workspace: WorkspaceId) {
        self.state.remove(&workspace);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_idle_tick_is_not_debounced() {
        let mut tracker = HysteresisTracker::new();
        let workspace = WorkspaceId::new();
        let now = Utc::now();
        assert!(tracker.observe(workspace, true, now).is_none());
    }

    #[test]
    fn two_consecutive_idle_ticks_debounce() {
        let mut tracker = HysteresisTracker::new();
        let workspace = WorkspaceId::new();
        let t0 = Utc::now();
        tracker.observe(workspace, true, t0);
        let duration = tracker.observe(workspace, true, t0 + chrono::Duration::minutes(1));
        assert!(duration.is_some());
    }

    #[test]
    fn active_tick_resets_the_streak() {
        let mut tracker = HysteresisTracker::new();
        let workspace = WorkspaceId::new();
        let t0 = Utc::now();
        tracker.observe(workspace, true, t0);
        tracker.observe(workspace, false, t0 + chrono::Duration::minutes(1));
        let duration = tracker.observe(workspace, true, t0 + chrono::Duration::minutes(2));
        assert!(duration.is_none());
    }

    #[test]
    fn idle_duration_accrues_from_first_idle_tick() {
        let mut tracker = HysteresisTracker::new();
        let workspace = WorkspaceId::new();
        let t0 = Utc::now();
        tracker.observe(workspace, true, t0);
        let duration = tracker
            .observe(workspace, true, t0 + chrono::Duration::minutes(30))
            .unwrap();
        assert_eq!(duration, chrono::Duration::minutes(30));
    }

    #[test]
    fn forget_clears_state() {
        let mut tracker = HysteresisTracker::new();
        let workspace = WorkspaceId::new();
        let t0 = Utc::now();
        tracker.observe(workspace, true, t0);
        tracker.observe(workspace, true, t0 + chrono::Duration::minutes(1));
        tracker.forget(workspace);
        assert!(tracker.observe(workspace, true, t0 + chrono::Duration::minutes(2)).is_none());
    }

    #[test]
    fn distinct_workspaces_track_independently() {
        let mut tracker = HysteresisTracker::new();
        let a = WorkspaceId::new();
        let b = WorkspaceId::new();
        let t0 = Utc::now();
        tracker.observe(a, true, t0);
        tracker.observe(a, true, t0 + chrono::Duration::minutes(1));
        assert!(tracker.observe(b, true, t0 + chrono::Duration::minutes(1)).is_none());
    }
}
