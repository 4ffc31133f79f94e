//! Builder functions for the persisted entity types, with sensible
//! defaults so a test only has to override the fields it cares about.

use basecamp_core::ids::{BudgetId, IdlePolicyId, ProjectId, TemplateId, VolumeId, WorkspaceId};
use basecamp_storage::{
    Architecture, Budget, BudgetPeriod, IdlePolicy, LifecycleMode, Member, PackageManager, Project,
    ProjectRole, SCHEMA_VERSION, Template, Workspace, WorkspaceState,
};
use chrono::Utc;

/// A runnable, unprovisioned workspace with a random ID, owned by
/// `"researcher@example.com"` in no project.
#[must_use]
pub fn test_workspace() -> Workspace {
    Workspace {
        schema_version: SCHEMA_VERSION,
        id: WorkspaceId::new(),
        name: "test-workspace".to_string(),
        template_ref: TemplateId::new(),
        size_class: basecamp_storage::SizeClass::M,
        architecture: Architecture::X86_64,
        lifecycle: LifecycleMode::OnDemand,
        state: WorkspaceState::Provisioning,
        region: "us-east-1".to_string(),
        provider_instance_id: None,
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

/// A workspace already in `Running` state, launched an hour ago, for
/// tests that exercise idle/billing logic rather than provisioning.
#[must_use]
pub fn test_running_workspace() -> Workspace {
    let mut ws = test_workspace();
    ws.state = WorkspaceState::Running;
    ws.provider_instance_id = Some("i-test0001".to_string());
    ws.launched_at = Some(Utc::now() - chrono::Duration::hours(1));
    ws.public_ip = Some("203.0.113.10".to_string());
    ws.private_ip = Some("10.0.0.10".to_string());
    ws.hourly_rate = 0.25;
    ws
}

/// A project owned by `"researcher@example.com"`, with no budget and no
/// additional members.
#[must_use]
pub fn test_project() -> Project {
    Project {
        schema_version: SCHEMA_VERSION,
        id: ProjectId::new(),
        name: "test-project".to_string(),
        owner: "researcher@example.com".to_string(),
        members: vec![Member { principal: "researcher@example.com".to_string(), role: ProjectRole::Owner }],
        status: "active".to_string(),
        budget: None,
        default_idle_policy: None,
        launch_blocked: false,
    }
}

/// A minimal, apt-provisioned template with no packages and no
/// inheritance.
#[must_use]
pub fn test_template() -> Template {
    Template {
        schema_version: SCHEMA_VERSION,
        id: TemplateId::new(),
        name: "base".to_string(),
        description: "test template".to_string(),
        base_image: "ubuntu-22.04".to_string(),
        inherits: None,
        package_manager: PackageManager::Apt,
        packages: Vec::new(),
        services: Vec::new(),
        users: Vec::new(),
        ports: Vec::new(),
        instance_type_map: Default::default(),
        cost_per_hour_map: Default::default(),
    }
}

/// A template with a conda-indicative package list, for package-manager
/// auto-selection tests.
#[must_use]
pub fn test_conda_template() -> Template {
    let mut template = test_template();
    template.name = "pytorch-gpu".to_string();
    template.package_manager = PackageManager::Auto;
    template.packages = vec!["pytorch".to_string(), "numpy".to_string()];
    template
}

/// An idle policy with a single "hibernate after 30 minutes idle" rule.
#[must_use]
pub fn test_idle_policy() -> IdlePolicy {
    IdlePolicy {
        schema_version: SCHEMA_VERSION,
        id: IdlePolicyId::new(),
        name: "default".to_string(),
        schedules: vec![basecamp_storage::IdleSchedule {
            idle_minutes: 30,
            action: basecamp_storage::IdleAction::Hibernate,
            time_window: None,
            cost_threshold: None,
        }],
    }
}

/// A project budget with a $100 monthly cap and no alerts or auto-actions
/// configured.
#[must_use]
pub fn test_budget(project: ProjectId) -> Budget {
    Budget {
        schema_version: SCHEMA_VERSION,
        id: BudgetId::new(),
        project_ref: project,
        total_amount: 100.0,
        period: BudgetPeriod::Monthly,
        monthly_cap: Some(100.0),
        daily_cap: None,
        end_date: None,
        alerts: Vec::new(),
        auto_actions: Vec::new(),
    }
}

/// A fresh, unattached workspace-kind volume in `us-east-1`.
#[must_use]
pub fn test_workspace_volume() -> basecamp_storage::StorageVolume {
    basecamp_storage::StorageVolume::Workspace {
        schema_version: SCHEMA_VERSION,
        id: VolumeId::new(),
        name: "scratch".to_string(),
        region: "us-east-1".to_string(),
        state: "available".to_string(),
        creation_time: Utc::now(),
        size_gb: 100,
        volume_type: "gp3".to_string(),
        iops: None,
        throughput: None,
        attached_to: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_starts_in_provisioning() {
        let ws = test_workspace();
        assert_eq!(ws.state, WorkspaceState::Provisioning);
        assert_eq!(ws.owner_principal, "researcher@example.com");
    }

    #[test]
    fn test_running_workspace_has_a_launch_time_in_the_past() {
        let ws = test_running_workspace();
        assert_eq!(ws.state, WorkspaceState::Running);
        assert!(ws.launched_at.unwrap() < Utc::now());
    }

    #[test]
    fn test_project_owner_is_also_a_member() {
        let project = test_project();
        assert!(project.members.iter().any(|m| m.principal == project.owner));
    }

    #[test]
    fn test_budget_references_its_project() {
        let project = test_project();
        let budget = test_budget(project.id);
        assert_eq!(budget.project_ref, project.id);
    }

    #[test]
    fn test_conda_template_carries_conda_indicative_packages() {
        let template = test_conda_template();
        assert!(template.packages.contains(&"pytorch".to_string()));
    }
}
