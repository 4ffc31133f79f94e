//! Per-volume storage cost accrual.
//!
//! Storage costs are tracked independently of the parent workspace's
//! compute accumulator and keep accruing while the workspace is
//! hibernated, stopped, or has no workspace at all (a detached shared
//! volume still costs money).

use crate::accumulator::CostAccumulator;

/// Accrues cost for a single storage volume. A thin, semantically
/// distinct alias over [`CostAccumulator`]: the math is identical
/// (`rate * elapsed_hours`), but callers should never mix a volume's
/// accumulator into a workspace's compute total — the lifecycle engine
/// bills them as separate line items.
#[derive(Debug, Default)]
pub struct StorageCostAccumulator {
    inner: CostAccumulator,
}

impl StorageCostAccumulator {
    /// Start a fresh accumulator at zero.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: CostAccumulator::new() }
    }

    /// Advance by one tick. Unlike compute accrual there is no
    /// running-fraction term: storage accrues for the full elapsed
    /// duration regardless of the parent workspace's state.
    pub fn tick(&self, hourly_rate: f64, elapsed_hours: f64) -> f64 {
        self.inner.tick(hourly_rate, elapsed_hours, 1.0)
    }

    /// Current accumulated storage cost in USD.
    #[must_use]
    pub fn accumulated(&self) -> f64 {
        self.inner.accumulated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accrues_independent_of_workspace_state() {
        let acc = StorageCostAccumulator::new();
        acc.tick(0.1, 1.0);
        acc.tick(0.1, 1.0);
        assert!((acc.accumulated() - 0.2).abs() < 1e-9);
    }
}
