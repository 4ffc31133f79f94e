//! Edge-triggered budget evaluation.
//!
//! A [`BudgetEngine`] holds no knowledge of the cost ledger itself —
//! `basecamp-pricing` owns that — it only remembers, per project, which
//! alert and auto-action thresholds are currently "armed" (already fired,
//! waiting for spend to drop back below the threshold) versus ready to
//! fire again. The caller recomputes `spent` from the pricing engine's
//! accumulators and passes it in on every evaluation pass.

use std::collections::HashMap;
use std::sync::RwLock;

use basecamp_core::ids::ProjectId;
use basecamp_storage::Budget;

use crate::types::{BudgetEvaluation, ProjectedMonthly};

/// A threshold rule is identified by its exact `f64` bit pattern — stable
/// because thresholds come from static configuration, never from a
/// computed value.
type RuleKey = u64;

#[derive(Debug, Default)]
struct ProjectCrossingState {
    armed_alerts: std::collections::HashSet<RuleKey>,
    armed_auto_actions: std::collections::HashSet<RuleKey>,
}

/// Tracks per-project, per-threshold crossing state across evaluation
/// passes so alerts and auto-actions are edge-triggered rather than
/// re-firing on every tick the budget stays over threshold.
pub struct BudgetEngine {
    state: RwLock<HashMap<ProjectId, ProjectCrossingState>>,
}

impl BudgetEngine {
    /// Start a fresh engine with no armed thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self { state: RwLock::new(HashMap::new()) }
    }

    /// Evaluate a project's budget against its recomputed spend.
    ///
    /// `days_elapsed_in_period` is the wall-clock time elapsed since the
    /// period started, in days; a value below `1.0` makes the monthly
    /// projection undefined rather than dividing by a near-zero
    /// denominator.
    pub fn evaluate(
        &self,
        project: ProjectId,
        budget: &Budget,
        spent: f64,
        days_elapsed_in_period: f64,
    ) -> BudgetEvaluation {
        let projected_monthly = if days_elapsed_in_period < 1.0 {
            ProjectedMonthly::InsufficientData
        } else {
            ProjectedMonthly::Projected(spent / days_elapsed_in_period * 30.0)
        };

        let fraction_spent = if budget.total_amount > 0.0 { spent / budget.total_amount } else { 0.0 };

        let mut guard = self.state.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let project_state = guard.entry(project).or_default();

        let mut alerts_fired = Vec::new();
        for alert in &budget.alerts {
            if !alert.enabled {
                continue;
            }
            let key = alert.threshold.to_bits();
            let crossed = fraction_spent >= alert.threshold;
            let already_armed = project_state.armed_alerts.contains(&key);

            if crossed && !already_armed {
                project_state.armed_alerts.insert(key);
                alerts_fired.push(alert.clone());
            } else if !crossed && already_armed {
                project_state.armed_alerts.remove(&key);
            }
        }

        let mut auto_actions_triggered = Vec::new();
        for action in &budget.auto_actions {
            if !action.enabled {
                continue;
            }
            let key = action.threshold.to_bits();
            let crossed = fraction_spent >= action.threshold;
            let already_armed = project_state.armed_auto_actions.contains(&key);

            if crossed && !already_armed {
                project_state.armed_auto_actions.insert(key);
                auto_actions_triggered.push(action.clone());
            } else if !crossed && already_armed {
                project_state.armed_auto_actions.remove(&key);
            }
        }

        BudgetEvaluation { spent, projected_monthly, alerts_fired, auto_actions_triggered }
    }

    /// Drop all armed-threshold state for a project — called when a new
    /// budget period starts, so the next evaluation pass re-fires from a
    /// clean slate.
    pub fn reset_period(&self, project: ProjectId) {
        self.state.write().unwrap_or_else(std::sync::PoisonError::into_inner).remove(&project);
    }
}

impl Default for BudgetEngine {
    fn default() -> Self {
        Self::new()
    }
}
