//! Background scan loops: idle detection, budget evaluation, and cost
//! reconciliation. Each loop owns a [`tokio::time::interval`]
//! and selects against [`AppState::shutdown`] so the daemon exits cleanly
//! rather than leaving a tick mid-flight.

use std::time::Duration;

use basecamp_lifecycle::LifecycleCommand;
use basecamp_provider::CostWindow;
use basecamp_storage::{IdleAction, LifecycleMode, Project, Workspace, WorkspaceState};
use chrono::{Duration as ChronoDuration, Utc};

use crate::state::{AppState, days_elapsed_in_period};

/// Every `idle_scan_interval_secs`, fetch every running workspace and run
/// it through the idle engine; the least-destructive matching schedule,
/// if any, is dispatched as a lifecycle command.
pub async fn idle_scan_loop(state: AppState) {
    let mut ticker = tokio::time::interval(Duration::from_secs(state.config.idle_scan_interval_secs.max(1)));
    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                tracing::info!("idle scan loop shutting down");
                return;
            }
            _ = ticker.tick() => {
                if let Err(err) = run_idle_scan(&state).await {
                    tracing::warn!(error = %err, "idle scan pass failed");
                }
            }
        }
    }
}

async fn run_idle_scan(state: &AppState) -> Result<(), basecamp_storage::StorageError> {
    let workspaces = state.store.list_all_workspaces().await?;
    let now = Utc::now();
    let mut scanned = 0usize;

    for workspace in workspaces.iter().filter(|w| w.state == WorkspaceState::Running) {
        scanned += 1;
        let schedule = match state.idle.scan_workspace(state.store.as_ref(), workspace, now).await {
            Ok(schedule) => schedule,
            Err(err) => {
                tracing::warn!(workspace = %workspace.id, error = %err, "idle scan failed for workspace");
                continue;
            },
        };

        let Some(schedule) = schedule else { continue };
        let command = match schedule.action {
            IdleAction::Alert => {
                tracing::info!(workspace = %workspace.id, "idle alert threshold crossed");
                continue;
            },
            IdleAction::Hibernate => LifecycleCommand::Hibernate,
            IdleAction::Stop => LifecycleCommand::Stop,
            IdleAction::Terminate => LifecycleCommand::Terminate,
        };

        tracing::info!(workspace = %workspace.id, action = ?schedule.action, "idle schedule firing");
        if let Err(err) = state.lifecycle.execute(workspace.id, command).await {
            tracing::warn!(workspace = %workspace.id, error = %err, "idle-triggered command failed");
        }
    }

    tracing::debug!(scanned, "idle scan pass complete");
    Ok(())
}

/// Every `budget_scan_interval_secs`, recompute spend for every project
/// with a budget attached and evaluate it, dispatching auto-actions that
/// newly crossed threshold.
pub async fn budget_scan_loop(state: AppState) {
    let mut ticker = tokio::time::interval(Duration::from_secs(state.config.budget_scan_interval_secs.max(1)));
    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                tracing::info!("budget scan loop shutting down");
                return;
            }
            _ = ticker.tick() => {
                if let Err(err) = run_budget_scan(&state).await {
                    tracing::warn!(error = %err, "budget scan pass failed");
                }
            }
        }
    }
}

async fn run_budget_scan(state: &AppState) -> Result<(), basecamp_storage::StorageError> {
    let projects = state.store.list_all_projects().await?;
    for project in projects {
        let Some(budget_id) = project.budget else { continue };
        let budget = match state.store.get_budget(budget_id).await {
            Ok(budget) => budget,
            Err(err) => {
                tracing::warn!(project = %project.id, error = %err, "budget lookup failed during scan");
                continue;
            },
        };

        let workspaces = state.store.list_workspaces_by_project(project.id).await?;
        let spent: f64 = workspaces.iter().map(|w| w.accumulated_cost).sum();
        let elapsed = days_elapsed_in_period(budget.period, Utc::now());
        let evaluation = state.budget.evaluate(project.id, &budget, spent, elapsed);

        for alert in &evaluation.alerts_fired {
            tracing::info!(project = %project.id, threshold = alert.threshold, channel = ?alert.channel, "budget alert fired");
        }

        if evaluation.requires_prevent_launch() {
            set_launch_blocked(state, &project, true).await?;
        }
        if evaluation.requires_workspace_action() {
            act_on_budget_crossing(state, &project, &workspaces, &evaluation).await;
        }
    }
    Ok(())
}

async fn set_launch_blocked(
    state: &AppState,
    project: &Project,
    blocked: bool,
) -> Result<(), basecamp_storage::StorageError> {
    if project.launch_blocked == blocked {
        return Ok(());
    }
    let mut project = project.clone();
    project.launch_blocked = blocked;
    state.store.put_project(&project).await
}

async fn act_on_budget_crossing(
    state: &AppState,
    project: &Project,
    workspaces: &[Workspace],
    evaluation: &basecamp_budget::BudgetEvaluation,
) {
    use basecamp_storage::AutoAction;

    let command = evaluation.auto_actions_triggered.iter().find_map(|action| match action.action {
        AutoAction::HibernateAll => Some(LifecycleCommand::Hibernate),
        AutoAction::StopAll => Some(LifecycleCommand::Stop),
        AutoAction::PreventLaunch | AutoAction::NotifyOnly => None,
    });
    let Some(command) = command else { return };

    for workspace in workspaces.iter().filter(|w| w.state == WorkspaceState::Running) {
        tracing::info!(project = %project.id, workspace = %workspace.id, "budget auto-action dispatched");
        if let Err(err) = state.lifecycle.execute(workspace.id, command.clone()).await {
            tracing::warn!(workspace = %workspace.id, error = %err, "budget-triggered command failed");
        }
    }
}

/// Every `cost_reconciliation_interval_secs`, tick every running
/// workspace's compute accumulator forward by one interval's worth of
/// elapsed time, persist the running total, and reconcile against the
/// provider's own billing figure.
pub async fn cost_reconciliation_loop(state: AppState) {
    let interval_secs = state.config.cost_reconciliation_interval_secs.max(1);
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                tracing::info!("cost reconciliation loop shutting down");
                return;
            }
            _ = ticker.tick() => {
                if let Err(err) = run_cost_reconciliation(&state, interval_secs).await {
                    tracing::warn!(error = %err, "cost reconciliation pass failed");
                }
            }
        }
    }
}

async fn run_cost_reconciliation(
    state: &AppState,
    interval_secs: u64,
) -> Result<(), basecamp_storage::StorageError> {
    let elapsed_hours = interval_secs as f64 / 3600.0;
    let now = Utc::now();
    let window = CostWindow { start: now - ChronoDuration::seconds(interval_secs as i64), end: now };

    for mut workspace in state.store.list_all_workspaces().await? {
        let running_fraction = match workspace.state {
            WorkspaceState::Running => 1.0,
            _ => 0.0,
        };
        if running_fraction > 0.0 {
            state.pricing.tick_workspace(workspace.id, workspace.hourly_rate, elapsed_hours, running_fraction);
        }

        if let Err(err) = state
            .pricing
            .reconcile_workspace(workspace.id, state.provider.as_ref(), window)
            .await
        {
            tracing::debug!(workspace = %workspace.id, error = %err, "cost reconciliation call failed");
        }

        let total = state.pricing.workspace_accumulator(workspace.id).accumulated();
        if (total - workspace.accumulated_cost).abs() > f64::EPSILON {
            workspace.accumulated_cost = total;
            state.store.put_workspace(&workspace).await?;
        }
    }

    Ok(())
}
