//! Ties together the rate table and the live per-workspace/per-volume
//! accumulators.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use basecamp_core::ids::{VolumeId, WorkspaceId};
use basecamp_provider::{CloudProvider, CostWindow, TagSelector};
use basecamp_storage::LifecycleMode;
use tracing::info;

use crate::accumulator::{CostAccumulator, ReconciliationOutcome};
use crate::error::PricingResult;
use crate::rate_table::RateTable;
use crate::storage_cost::StorageCostAccumulator;

/// The pricing component: a static rate table plus the live accumulators
/// for every workspace and volume the daemon is currently tracking.
pub struct PricingEngine {
    rates: RateTable,
    workspace_accumulators: RwLock<HashMap<WorkspaceId, Arc<CostAccumulator>>>,
    volume_accumulators: RwLock<HashMap<VolumeId, Arc<StorageCostAccumulator>>>,
}

impl PricingEngine {
    /// Build an engine over the given rate table. Accumulators are
    /// created lazily on first access, so a freshly started daemon and
    /// one resuming from persisted state construct the engine the same
    /// way — restoring prior totals is the caller's job, via
    /// [`CostAccumulator::restore`].
    #[must_use]
    pub fn new(rates: RateTable) -> Self {
        Self {
            rates,
            workspace_accumulators: RwLock::new(HashMap::new()),
            volume_accumulators: RwLock::new(HashMap::new()),
        }
    }

    /// Look up the hourly compute rate for a tuple.
    pub fn rate_for(
        &self,
        instance_type: &str,
        region: &str,
        lifecycle: LifecycleMode,
    ) -> PricingResult<f64> {
        self.rates.rate_for(instance_type, region, lifecycle)
    }

    /// Get or create the compute cost accumulator for a workspace.
    #[must_use]
    pub fn workspace_accumulator(&self, workspace_id: WorkspaceId) -> Arc<CostAccumulator> {
        if let Some(existing) = self.workspace_accumulators.read().unwrap().get(&workspace_id) {
            return Arc::clone(existing);
        }
        let mut accumulators = self.workspace_accumulators.write().unwrap();
        Arc::clone(
            accumulators.entry(workspace_id).or_insert_with(|| Arc::new(CostAccumulator::new())),
        )
    }

    /// Install a previously-restored accumulator, replacing any in-memory
    /// one. Used on daemon startup to seed totals from persisted state.
    pub fn restore_workspace_accumulator(
        &self,
        workspace_id: WorkspaceId,
        accumulator: CostAccumulator,
    ) {
        self.workspace_accumulators
            .write()
            .unwrap()
            .insert(workspace_id, Arc::new(accumulator));
    }

    /// Get or create the storage cost accumulator for a volume.
    #[must_use]
    pub fn volume_accumulator(&self, volume_id: VolumeId) -> Arc<StorageCostAccumulator> {
        if let Some(existing) = self.volume_accumulators.read().unwrap().get(&volume_id) {
            return Arc::clone(existing);
        }
        let mut accumulators = self.volume_accumulators.write().unwrap();
        Arc::clone(
            accumulators
                .entry(volume_id)
                .or_insert_with(|| Arc::new(StorageCostAccumulator::new())),
        )
    }

    /// Advance a workspace's compute accumulator by one tick, creating it
    /// if this is the first tick observed for that workspace.
    pub fn tick_workspace(
        &self,
        workspace_id: WorkspaceId,
        hourly_rate: f64,
        elapsed_hours: f64,
        running_fraction: f64,
    ) -> f64 {
        self.workspace_accumulator(workspace_id).tick(hourly_rate, elapsed_hours, running_fraction)
    }

    /// Advance a volume's storage accumulator by one tick.
    pub fn tick_volume(&self, volume_id: VolumeId, hourly_rate: f64, elapsed_hours: f64) -> f64 {
        self.volume_accumulator(volume_id).tick(hourly_rate, elapsed_hours)
    }

    /// Reconcile a workspace's compute accumulator against the provider's
    /// authoritative cost figure for `window`, logging the outcome either
    /// way.
    pub async fn reconcile_workspace(
        &self,
        workspace_id: WorkspaceId,
        provider: &dyn CloudProvider,
        window: CostWindow,
    ) -> PricingResult<ReconciliationOutcome> {
        let tag_selector = TagSelector::for_workspace(workspace_id.to_string());
        let provider_figure = provider.get_cost_since(&tag_selector, window).await?;

        let outcome = self.workspace_accumulator(workspace_id).reconcile(provider_figure);
        match outcome {
            ReconciliationOutcome::Adopted { previous, adopted } => {
                info!(
                    %workspace_id,
                    previous,
                    adopted,
                    "cost reconciliation drift exceeded threshold, adopted provider figure"
                );
            },
            ReconciliationOutcome::WithinDrift { drift } => {
                info!(%workspace_id, drift, "cost reconciliation within drift threshold");
            },
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_accumulator_is_shared_across_calls() {
        let engine = PricingEngine::new(RateTable::empty());
        let id = WorkspaceId::new();
        engine.tick_workspace(id, 1.0, 1.0, 1.0);
        let accumulator = engine.workspace_accumulator(id);
        assert!((accumulator.accumulated() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn distinct_workspaces_get_distinct_accumulators() {
        let engine = PricingEngine::new(RateTable::empty());
        let a = WorkspaceId::new();
        let b = WorkspaceId::new();
        engine.tick_workspace(a, 1.0, 1.0, 1.0);
        assert_eq!(engine.workspace_accumulator(b).accumulated(), 0.0);
    }

    #[test]
    fn volume_accumulator_accrues_independently_of_workspace() {
        let engine = PricingEngine::new(RateTable::empty());
        let volume_id = VolumeId::new();
        engine.tick_volume(volume_id, 0.05, 2.0);
        assert!((engine.volume_accumulator(volume_id).accumulated() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn restore_seeds_prior_total() {
        let engine = PricingEngine::new(RateTable::empty());
        let id = WorkspaceId::new();
        let prior = CostAccumulator::new();
        prior.tick(1.0, 5.0, 1.0);
        engine.restore_workspace_accumulator(id, prior);
        assert!((engine.workspace_accumulator(id).accumulated() - 5.0).abs() < 1e-9);
    }
}
