//! Per-workspace compute cost accumulator.
//!
//! Advances on every state-transition tick and every periodic
//! reconciliation tick: `Δcost = hourly_rate * elapsed_hours *
//! running_fraction`, where `running_fraction` is the portion of the
//! elapsed interval the workspace actually spent in a billable-running
//! state (1.0 for a tick entirely inside `running`, partial for a tick
//! straddling a state transition).

use std::fmt;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The fraction by which a reconciliation figure must differ from the
/// accumulator's own running total before the accumulator adopts it.
pub const RECONCILIATION_DRIFT_THRESHOLD: f64 = 0.05;

/// Outcome of a [`CostAccumulator::reconcile`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReconciliationOutcome {
    /// The provider figure was within the drift threshold; no change.
    WithinDrift {
        /// The observed drift as a fraction of the accumulator's total.
        drift: f64,
    },
    /// The provider figure differed by more than the drift threshold and
    /// was adopted.
    Adopted {
        /// The accumulator's figure before reconciliation.
        previous: f64,
        /// The provider's figure, now the accumulator's new total.
        adopted: f64,
    },
}

/// Snapshot of accumulator state for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostAccumulatorSnapshot {
    /// Accumulated cost in USD.
    pub accumulated_usd: f64,
    /// When the snapshot was taken.
    pub last_updated: DateTime<Utc>,
}

/// Tracks accrued compute cost for a single workspace.
///
/// Thread-safe via internal [`RwLock`]; cheap enough to call from both
/// the per-workspace command loop and the periodic reconciliation scan
/// without additional synchronization.
pub struct CostAccumulator {
    accumulated: RwLock<f64>,
}

impl CostAccumulator {
    /// Start a fresh accumulator at zero.
    #[must_use]
    pub fn new() -> Self {
        Self { accumulated: RwLock::new(0.0) }
    }

    /// Restore an accumulator from a persisted snapshot.
    #[must_use]
    pub fn restore(snapshot: &CostAccumulatorSnapshot) -> Self {
        let accumulated = if snapshot.accumulated_usd.is_finite() {
            snapshot.accumulated_usd.max(0.0)
        } else {
            0.0
        };
        Self { accumulated: RwLock::new(accumulated) }
    }

    /// Advance the accumulator for one tick.
    ///
    /// `elapsed_hours` is the wall-clock duration of the tick expressed in
    /// hours; `running_fraction` (clamped to `[0, 1]`) is the portion of
    /// that tick the workspace was actually in a billable-running state.
    /// Returns the cost delta applied.
    pub fn tick(&self, hourly_rate: f64, elapsed_hours: f64, running_fraction: f64) -> f64 {
        if !hourly_rate.is_finite() || hourly_rate < 0.0 {
            warn!(hourly_rate, "ignoring non-finite or negative hourly rate in cost tick");
            return 0.0;
        }
        if !elapsed_hours.is_finite() || elapsed_hours < 0.0 {
            warn!(elapsed_hours, "ignoring non-finite or negative elapsed duration in cost tick");
            return 0.0;
        }

        let fraction = running_fraction.clamp(0.0, 1.0);
        let delta = hourly_rate * elapsed_hours * fraction;

        if delta > 0.0
            && let Ok(mut accumulated) = self.accumulated.write()
        {
            *accumulated += delta;
        }

        delta
    }

    /// Reconcile against the provider's authoritative cost figure for the
    /// same window. Adopts the provider figure when drift exceeds
    /// [`RECONCILIATION_DRIFT_THRESHOLD`]; the caller is responsible for
    /// publishing the resulting [`basecamp_events::EventKind::CostReconciled`]
    /// event regardless of outcome.
    pub fn reconcile(&self, provider_figure: f64) -> ReconciliationOutcome {
        let provider_figure = if provider_figure.is_finite() { provider_figure.max(0.0) } else { 0.0 };

        let mut accumulated = self.accumulated.write().unwrap_or_else(|e| {
            warn!("CostAccumulator lock poisoned, recovering");
            e.into_inner()
        });

        let drift = if *accumulated > 0.0 {
            (provider_figure - *accumulated).abs() / *accumulated
        } else if provider_figure > 0.0 {
            1.0
        } else {
            0.0
        };

        if drift > RECONCILIATION_DRIFT_THRESHOLD {
            let previous = *accumulated;
            *accumulated = provider_figure;
            ReconciliationOutcome::Adopted { previous, adopted: provider_figure }
        } else {
            ReconciliationOutcome::WithinDrift { drift }
        }
    }

    /// Current accumulated cost in USD.
    #[must_use]
    pub fn accumulated(&self) -> f64 {
        self.accumulated.read().map(|a| *a).unwrap_or(0.0)
    }

    /// Snapshot for persistence.
    #[must_use]
    pub fn snapshot(&self) -> CostAccumulatorSnapshot {
        CostAccumulatorSnapshot { accumulated_usd: self.accumulated(), last_updated: Utc::now() }
    }
}

impl Default for CostAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CostAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CostAccumulator").field("accumulated", &self.accumulated()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_accrues_proportional_to_rate_and_fraction() {
        let acc = CostAccumulator::new();
        let delta = acc.tick(1.0, 1.0 / 60.0, 1.0);
        assert!((delta - 1.0 / 60.0).abs() < 1e-9);
        assert!((acc.accumulated() - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn tick_is_monotone_non_decreasing() {
        let acc = CostAccumulator::new();
        let mut prior = acc.accumulated();
        for _ in 0..5 {
            acc.tick(0.5, 1.0 / 60.0, 1.0);
            let now = acc.accumulated();
            assert!(now >= prior);
            prior = now;
        }
    }

    #[test]
    fn tick_ignores_negative_rate() {
        let acc = CostAccumulator::new();
        acc.tick(-1.0, 1.0, 1.0);
        assert_eq!(acc.accumulated(), 0.0);
    }

    #[test]
    fn running_fraction_is_clamped() {
        let acc = CostAccumulator::new();
        let delta = acc.tick(1.0, 1.0, 2.0);
        assert!((delta - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reconcile_within_drift_leaves_total_unchanged() {
        let acc = CostAccumulator::new();
        acc.tick(1.0, 10.0, 1.0); // accumulated = 10.0
        let outcome = acc.reconcile(10.3); // 3% drift
        assert!(matches!(outcome, ReconciliationOutcome::WithinDrift { .. }));
        assert!((acc.accumulated() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn reconcile_beyond_drift_adopts_provider_figure() {
        let acc = CostAccumulator::new();
        acc.tick(1.0, 10.0, 1.0); // accumulated = 10.0
        let outcome = acc.reconcile(12.0); // 20% drift
        assert!(matches!(
            outcome,
            ReconciliationOutcome::Adopted { previous, adopted }
                if (previous - 10.0).abs() < 1e-9 && (adopted - 12.0).abs() < 1e-9
        ));
        assert!((acc.accumulated() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn reconcile_from_zero_with_nonzero_provider_figure_adopts() {
        let acc = CostAccumulator::new();
        let outcome = acc.reconcile(5.0);
        assert!(matches!(outcome, ReconciliationOutcome::Adopted { .. }));
        assert!((acc.accumulated() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_restore_round_trips() {
        let acc = CostAccumulator::new();
        acc.tick(2.0, 3.0, 1.0);
        let snapshot = acc.snapshot();
        let restored = CostAccumulator::restore(&snapshot);
        assert!((restored.accumulated() - acc.accumulated()).abs() < 1e-9);
    }

    #[test]
    fn restore_clamps_non_finite_snapshot() {
        let snapshot = CostAccumulatorSnapshot { accumulated_usd: f64::NAN, last_updated: Utc::now() };
        let restored = CostAccumulator::restore(&snapshot);
        assert_eq!(restored.accumulated(), 0.0);
    }
}
