//! Resolves the effective [`IdlePolicy`] for a workspace: workspace
//! override, then project default, then the system fallback.

use basecamp_storage::{IdlePolicy, StateStore, Workspace};

use crate::error::IdleResult;

/// The built-in fallback policy applied when neither the workspace nor
/// its project name an override: alert at 2 hours idle, hibernate at 8.
#[must_use]
pub fn system_default_policy() -> IdlePolicy {
    IdlePolicy {
        schema_version: basecamp_storage::SCHEMA_VERSION,
        id: basecamp_core::ids::IdlePolicyId::new(),
        name: "system-default".to_string(),
        schedules: vec![
            basecamp_storage::IdleSchedule {
                idle_minutes: 120,
                action: basecamp_storage::IdleAction::Alert,
                time_window: None,
                cost_threshold: None,
            },
            basecamp_storage::IdleSchedule {
                idle_minutes: 480,
                action: basecamp_storage::IdleAction::Hibernate,
                time_window: None,
                cost_threshold: None,
            },
        ],
    }
}

/// Resolve the policy that applies to `workspace`: its own
/// `idle_policy_ref` if set, else its project's `default_idle_policy` if
/// the workspace belongs to one and that's set, else the system default.
pub async fn effective_policy(
    store: &dyn StateStore,
    workspace: &Workspace,
) -> IdleResult<IdlePolicy> {
    if let Some(id) = workspace.idle_policy_ref {
        return Ok(store.get_idle_policy(id).await?);
    }

    if let Some(project_id) = workspace.project_ref {
        let project = store.get_project(project_id).await?;
        if let Some(id) = project.default_idle_policy {
            return Ok(store.get_idle_policy(id).await?);
        }
    }

    Ok(system_default_policy())
}

#[cfg(test)]
mod tests {
    use basecamp_storage::{Database, SurrealStateStore};

    use super::*;

    async fn memory_store() -> SurrealStateStore {
        let db = Database::connect_memory().await.unwrap();
        SurrealStateStore::new(db)
    }

    fn bare_workspace() -> Workspace {
        basecamp_storage::Workspace {
            schema_version: basecamp_storage::SCHEMA_VERSION,
            id: basecamp_core::ids::WorkspaceId::new(),
            name: "w".to_string(),
            template_ref: basecamp_core::ids::TemplateId::new(),
            size_class: basecamp_storage::SizeClass::S,
            architecture: basecamp_storage::Architecture::X86_64,
            lifecycle: basecamp_storage::LifecycleMode::OnDemand,
            state: basecamp_storage::WorkspaceState::Running,
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
            idle_policy_ref: None,
            project_ref: None,
            owner_principal: "researcher@example.com".to_string(),
            provisioning_script_digest: String::new(),
            hibernation_fallback: false,
        }
    }

    #[tokio::test]
    async fn falls_back_to_system_default_with_no_overrides() {
        let store = memory_store().await;
        let workspace = bare_workspace();
        let policy = effective_policy(&store, &workspace).await.unwrap();
        assert_eq!(policy.name, "system-default");
    }

    #[tokio::test]
    async fn workspace_override_wins_over_system_default() {
        let store = memory_store().await;
        let mut workspace = bare_workspace();

        let custom = IdlePolicy {
            schema_version: basecamp_storage::SCHEMA_VERSION,
            id: basecamp_core::ids::IdlePolicyId::new(),
            name: "workspace-custom".to_string(),
            schedules: Vec::new(),
        };
        store.put_idle_policy(&custom).await.unwrap();
        workspace.idle_policy_ref = Some(custom.id);

        let policy = effective_policy(&store, &workspace).await.unwrap();
        assert_eq!(policy.name, "workspace-custom");
    }

    #[tokio::test]
    async fn project_default_wins_over_system_default() {
        let store = memory_store().await;
        let mut workspace = bare_workspace();

        let project_policy = IdlePolicy {
            schema_version: basecamp_storage::SCHEMA_VERSION,
            id: basecamp_core::ids::IdlePolicyId::new(),
            name: "project-default".to_string(),
            schedules: Vec::new(),
        };
        store.put_idle_policy(&project_policy).await.unwrap();

        let project = basecamp_storage::Project {
            schema_version: basecamp_storage::SCHEMA_VERSION,
            id: basecamp_core::ids::ProjectId::new(),
            name: "p".to_string(),
            owner: "researcher@example.com".to_string(),
            members: Vec::new(),
            status: "active".to_string(),
            budget: None,
            default_idle_policy: Some(project_policy.id),
            launch_blocked: false,
        };
        store.put_project(&project).await.unwrap();
        workspace.project_ref = Some(project.id);

        let policy = effective_policy(&store, &workspace).await.unwrap();
        assert_eq!(policy.name, "project-default");
    }
}
