//! Ties the activity probe, hysteresis tracker, effective-policy
//! resolution, and least-destructive-action selection into the single
//! per-workspace scan step the daemon's idle loop calls every tick.

use std::sync::Mutex;

use basecamp_storage::{IdleSchedule, StateStore, Workspace, WorkspaceState};
use chrono::{DateTime, Utc};

use crate::activity::ActivityProbe;
use crate::effective::effective_policy;
use crate::error::IdleResult;
use crate::hysteresis::HysteresisTracker;
use crate::resolution::{least_destructive, matching_schedules};

/// The idle/hibernation policy engine. Holds no storage or provider
/// handle of its own — `scan_workspace` takes the store it needs for
/// effective-policy resolution, so the engine stays test-cheap to
/// construct.
pub struct IdleEngine<P> {
    probe: P,
    hysteresis: Mutex<HysteresisTracker>,
}

impl<P: ActivityProbe> IdleEngine<P> {
    /// Build an engine around the given activity probe.
    #[must_use]
    pub fn new(probe: P) -> Self {
        Self { probe, hysteresis: Mutex::new(HysteresisTracker::new()) }
    }

    /// Scan one workspace for this tick, returning the single
    /// least-destructive schedule that should fire, if any.
    ///
    /// A workspace not currently `running` is not scanned and has its
    /// hysteresis state dropped, so a later re-entry into `running`
    /// starts the debounce count fresh.
    pub async fn scan_workspace(
        &self,
        store: &dyn StateStore,
        workspace: &Workspace,
        now: DateTime<Utc>,
    ) -> IdleResult<Option<IdleSchedule>> {
        if workspace.state != WorkspaceState::Running {
            self.hysteresis.lock().unwrap_or_else(std::sync::PoisonError::into_inner).forget(workspace.id);
            return Ok(None);
        }

        let idle_now = self.probe.is_idle(workspace.id).await?;
        let debounced = self
            .hysteresis
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .observe(workspace.id, idle_now, now);

        let Some(idle_duration) = debounced else {
            return Ok(None);
        };

        let policy = effective_policy(store, workspace).await?;
        let matches =
            matching_schedules(&policy.schedules, idle_duration, now, workspace.accumulated_cost)?;

        let chosen = least_destructive(&matches);
        if let Some(schedule) = &chosen {
            tracing::info!(
                workspace_id = %workspace.id,
                idle_minutes = idle_duration.num_minutes(),
                action = ?schedule.action,
                "idle schedule matched"
            );
        }
        Ok(chosen)
    }
}

#[cfg(test)]
mod tests {
    use basecamp_core::ids::{IdlePolicyId, TemplateId, WorkspaceId};
    use basecamp_storage::{
        Architecture, Database, IdleAction, IdlePolicy, LifecycleMode, SCHEMA_VERSION, SizeClass,
        SurrealStateStore,
    };

    use super::*;
    use crate::activity::FixedActivityProbe;

    async fn memory_store() -> SurrealStateStore {
        let db = Database::connect_memory().await.unwrap();
        SurrealStateStore::new(db)
    }

    fn running_workspace(policy: IdlePolicyId) -> Workspace {
        Workspace {
            schema_version: SCHEMA_VERSION,
            id: WorkspaceId::new(),
            name: "w".to_string(),
            template_ref: TemplateId::new(),
            size_class: SizeClass::S,
            architecture: Architecture::X86_64,
            lifecycle: LifecycleMode::OnDemand,
            state: WorkspaceState::Running,
            region: "us-east-1".to_string(),
            provider_instance_id: Some("i-test0001".to_string()),
            public_ip: None,
            private_ip: None,
            launched_at: None,
            hourly_rate: 0.0,
            accumulated_cost: 0.0,
            attached_shared_volumes: Vec::new(),
            attached_workspace_volumes: Vec::new(),
            applied_template_layers: Vec::new(),
            idle_policy_ref: Some(policy),
            project_ref: None,
            owner_principal: "researcher@example.com".to_string(),
            provisioning_script_digest: String::new(),
            hibernation_fallback: false,
        }
    }

    #[tokio::test]
    async fn first_idle_tick_never_fires() {
        let store = memory_store().await;
        let policy = IdlePolicy {
            schema_version: SCHEMA_VERSION,
            id: IdlePolicyId::new(),
            name: "p".to_string(),
            schedules: vec![basecamp_storage::IdleSchedule {
                idle_minutes: 0,
                action: IdleAction::Alert,
                time_window: None,
                cost_threshold: None,
            }],
        };
        store.put_idle_policy(&policy).await.unwrap();
        let workspace = running_workspace(policy.id);

        let engine = IdleEngine::new(FixedActivityProbe::always_idle());
        let result = engine.scan_workspace(&store, &workspace, Utc::now()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn second_consecutive_idle_tick_fires_the_matching_schedule() {
        let store = memory_store().await;
        let policy = IdlePolicy {
            schema_version: SCHEMA_VERSION,
            id: IdlePolicyId::new(),
            name: "p".to_string(),
            schedules: vec![basecamp_storage::IdleSchedule {
                idle_minutes: 0,
                action: IdleAction::Hibernate,
                time_window: None,
                cost_threshold: None,
            }],
        };
        store.put_idle_policy(&policy).await.unwrap();
        let workspace = running_workspace(policy.id);

        let engine = IdleEngine::new(FixedActivityProbe::always_idle());
        let t0 = Utc::now();
        engine.scan_workspace(&store, &workspace, t0).await.unwrap();
        let result =
            engine.scan_workspace(&store, &workspace, t0 + chrono::Duration::minutes(1)).await.unwrap();
        assert_eq!(result.unwrap().action, IdleAction::Hibernate);
    }

    #[tokio::test]
    async fn active_workspace_never_fires() {
        let store = memory_store().await;
        let policy = IdlePolicy {
            schema_version: SCHEMA_VERSION,
            id: IdlePolicyId::new(),
            name: "p".to_string(),
            schedules: vec![basecamp_storage::IdleSchedule {
                idle_minutes: 0,
                action: IdleAction::Alert,
                time_window: None,
                cost_threshold: None,
            }],
        };
        store.put_idle_policy(&policy).await.unwrap();
        let workspace = running_workspace(policy.id);

        let engine = IdleEngine::new(FixedActivityProbe::always_active());
        let t0 = Utc::now();
        engine.scan_workspace(&store, &workspace, t0).await.unwrap();
        let result =
            engine.scan_workspace(&store, &workspace, t0 + chrono::Duration::minutes(1)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn non_running_workspace_is_never_scanned() {
        let store = memory_store().await;
        let policy = IdlePolicy {
            schema_version: SCHEMA_VERSION,
            id: IdlePolicyId::new(),
            name: "p".to_string(),
            schedules: Vec::new(),
        };
        store.put_idle_policy(&policy).await.unwrap();
        let mut workspace = running_workspace(policy.id);
        workspace.state = WorkspaceState::Stopped;

        let engine = IdleEngine::new(FixedActivityProbe::always_idle());
        let result = engine.scan_workspace(&store, &workspace, Utc::now()).await.unwrap();
        assert!(result.is_none());
    }
}
