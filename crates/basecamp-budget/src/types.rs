//! Result types for a single budget evaluation pass.

use basecamp_storage::{AutoAction, BudgetAlert, BudgetAutoAction};

/// The projected monthly spend, or why it couldn't be computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectedMonthly {
    /// `spent / days_elapsed * 30`.
    Projected(f64),
    /// Fewer than one day has elapsed in the period; projecting would be
    /// dividing by a near-zero denominator.
    InsufficientData,
}

/// The outcome of evaluating one project's budget against its current
/// spend.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetEvaluation {
    /// Spend recomputed from the cost ledger for the current period.
    pub spent: f64,
    /// Projected full-period spend at the current burn rate.
    pub projected_monthly: ProjectedMonthly,
    /// Alerts that newly crossed their threshold this pass (edge-triggered:
    /// only alerts that were not already armed).
    pub alerts_fired: Vec<BudgetAlert>,
    /// Auto-actions that newly crossed their threshold this pass.
    pub auto_actions_triggered: Vec<BudgetAutoAction>,
}

impl BudgetEvaluation {
    /// Whether any `hibernate_all` or `stop_all` auto-action fired this
    /// pass — the caller should enqueue the corresponding command against
    /// every active workspace in the project.
    #[must_use]
    pub fn requires_workspace_action(&self) -> bool {
        self.auto_actions_triggered
            .iter()
            .any(|a| matches!(a.action, AutoAction::HibernateAll | AutoAction::StopAll))
    }

    /// Whether a `prevent_launch` auto-action fired this pass — the
    /// caller should set the project's launch-blocked flag.
    #[must_use]
    pub fn requires_prevent_launch(&self) -> bool {
        self.auto_actions_triggered.iter().any(|a| a.action == AutoAction::PreventLaunch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_workspace_action_true_for_hibernate_all() {
        let eval = BudgetEvaluation {
            spent: 10.0,
            projected_monthly: ProjectedMonthly::InsufficientData,
            alerts_fired: Vec::new(),
            auto_actions_triggered: vec![BudgetAutoAction {
                threshold: 0.9,
                action: AutoAction::HibernateAll,
                enabled: true,
            }],
        };
        assert!(eval.requires_workspace_action());
        assert!(!eval.requires_prevent_launch());
    }

    #[test]
    fn requires_prevent_launch_true_for_prevent_launch() {
        let eval = BudgetEvaluation {
            spent: 10.0,
            projected_monthly: ProjectedMonthly::InsufficientData,
            alerts_fired: Vec::new(),
            auto_actions_triggered: vec![BudgetAutoAction {
                threshold: 1.0,
                action: AutoAction::PreventLaunch,
                enabled: true,
            }],
        };
        assert!(eval.requires_prevent_launch());
        assert!(!eval.requires_workspace_action());
    }

    #[test]
    fn notify_only_triggers_neither() {
        let eval = BudgetEvaluation {
            spent: 10.0,
            projected_monthly: ProjectedMonthly::InsufficientData,
            alerts_fired: Vec::new(),
            auto_actions_triggered: vec![BudgetAutoAction {
                threshold: 0.5,
                action: AutoAction::NotifyOnly,
                enabled: true,
            }],
        };
        assert!(!eval.requires_workspace_action());
        assert!(!eval.requires_prevent_launch());
    }
}
