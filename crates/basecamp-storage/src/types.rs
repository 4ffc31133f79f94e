//! Persisted entity types.
//!
//! These are the record shapes the state store reads and writes. Every
//! entity carries a `schema_version` so the daemon can evolve the wire
//! format without an offline migration step: a store implementation
//! that sees an older version is free to upgrade it in place on read.

use basecamp_core::ids::{BudgetId, IdlePolicyId, ProjectId, TemplateId, VolumeId, WorkspaceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version stamped on newly constructed entities.
pub const SCHEMA_VERSION: u32 = 1;

/// Instance size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    Xs,
    S,
    M,
    L,
    Xl,
    GpuS,
    GpuM,
    GpuL,
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture {
    X86_64,
    Arm64,
}

/// Spot vs. on-demand pricing/preemption model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleMode {
    OnDemand,
    Spot,
}

/// Workspace state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceState {
    Requested,
    Provisioning,
    Running,
    Stopping,
    Stopped,
    Hibernating,
    Hibernated,
    Terminating,
    Terminated,
    /// Launch failed before reaching `running`; terminal.
    ProvisioningFailed,
    /// Provider reports an error state, or polling exceeded its deadline;
    /// requires operator intervention.
    Stuck,
    /// The provider reports the instance gone without the engine having
    /// initiated termination; terminal.
    TerminatedUnexpectedly,
}

impl WorkspaceState {
    /// Billing-relevant: the hourly compute rate is zero in these states
    /// (storage cost continues to accrue separately).
    #[must_use]
    pub fn is_billable_idle(self) -> bool {
        matches!(
            self,
            Self::Stopped
                | Self::Hibernated
                | Self::Terminated
                | Self::ProvisioningFailed
                | Self::TerminatedUnexpectedly
        )
    }

    /// Whether this state admits no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Terminated | Self::ProvisioningFailed | Self::TerminatedUnexpectedly)
    }
}

/// Record of a template application against a live workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedTemplateLayer {
    pub template_ref: TemplateId,
    pub applied_at: DateTime<Utc>,
    pub package_manager_used: PackageManager,
    pub packages_installed_count: u32,
    pub services_configured_count: u32,
    pub users_added_count: u32,
    pub rollback_checkpoint_id: String,
}

/// A managed cloud compute instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub schema_version: u32,
    pub id: WorkspaceId,
    pub name: String,
    pub template_ref: TemplateId,
    pub size_class: SizeClass,
    pub architecture: Architecture,
    pub lifecycle: LifecycleMode,
    pub state: WorkspaceState,
    pub region: String,
    /// The cloud provider's own identifier for the running instance.
    /// `None` until the launch algorithm's `LaunchVM` call returns; every
    /// `CloudProvider` call that acts on a live instance needs this.
    pub provider_instance_id: Option<String>,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
    pub launched_at: Option<DateTime<Utc>>,
    pub hourly_rate: f64,
    pub accumulated_cost: f64,
    pub attached_shared_volumes: Vec<VolumeId>,
    pub attached_workspace_volumes: Vec<VolumeId>,
    pub applied_template_layers: Vec<AppliedTemplateLayer>,
    pub idle_policy_ref: Option<IdlePolicyId>,
    pub project_ref: Option<ProjectId>,
    pub owner_principal: String,
    pub provisioning_script_digest: String,
    pub hibernation_fallback: bool,
}

impl Workspace {
    /// Record the effects of a `rollback_to(checkpoint)`: layers with
    /// index >= the checkpoint's index are dropped.
    pub fn rollback_to(&mut self, checkpoint_id: &str) {
        if let Some(pos) = self
            .applied_template_layers
            .iter()
            .position(|l| l.rollback_checkpoint_id == checkpoint_id)
        {
            self.applied_template_layers.truncate(pos);
        }
    }
}

/// Volume discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeKind {
    Shared,
    Workspace,
}

/// A mount of a shared volume onto a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeMount {
    pub workspace_id: WorkspaceId,
    pub path: String,
}

/// Storage volume: shared (network-filesystem) or workspace (block
/// device). Kind-specific fields are total, not optional, behind the
/// explicit discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageVolume {
    Shared {
        schema_version: u32,
        id: VolumeId,
        name: String,
        region: String,
        state: String,
        creation_time: DateTime<Utc>,
        size_bytes: Option<u64>,
        mounted_on: Vec<VolumeMount>,
        /// The provider's own identifier for this volume, passed back to
        /// `CloudProvider` on every mount/unmount/delete call — distinct
        /// from `id`, which is this volume's surrogate key in the store.
        provider_volume_id: String,
    },
    Workspace {
        schema_version: u32,
        id: VolumeId,
        name: String,
        region: String,
        state: String,
        creation_time: DateTime<Utc>,
        size_gb: u32,
        volume_type: String,
        iops: Option<u32>,
        throughput: Option<u32>,
        attached_to: Option<WorkspaceId>,
        /// The provider's own identifier for this volume, passed back to
        /// `CloudProvider` on every attach/detach/delete call.
        provider_volume_id: String,
    },
}

impl StorageVolume {
    #[must_use]
    pub fn id(&self) -> VolumeId {
        match self {
            Self::Shared { id, .. } | Self::Workspace { id, .. } => *id,
        }
    }

    #[must_use]
    pub fn kind(&self) -> VolumeKind {
        match self {
            Self::Shared { .. } => VolumeKind::Shared,
            Self::Workspace { .. } => VolumeKind::Workspace,
        }
    }

    /// Whether this volume currently has any attachment/mount, which
    /// blocks deletion.
    #[must_use]
    pub fn has_active_attachment(&self) -> bool {
        match self {
            Self::Shared { mounted_on, .. } => !mounted_on.is_empty(),
            Self::Workspace { attached_to, .. } => attached_to.is_some(),
        }
    }
}

/// Project membership role. Ordered: `Viewer < Member < Admin < Owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRole {
    Viewer,
    Member,
    Admin,
    Owner,
}

/// A project member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub principal: String,
    pub role: ProjectRole,
}

/// Collaboration and billing scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub schema_version: u32,
    pub id: ProjectId,
    pub name: String,
    pub owner: String,
    pub members: Vec<Member>,
    pub status: String,
    pub budget: Option<BudgetId>,
    /// Idle policy applied to every workspace in this project that has no
    /// workspace-level override. `None` falls through to the system
    /// default policy.
    pub default_idle_policy: Option<IdlePolicyId>,
    /// Set by the budget engine when a `prevent_launch` auto-action has
    /// crossed threshold; consulted by the lifecycle engine on launch.
    pub launch_blocked: bool,
}

/// Budget period over which `total_amount` applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    Project,
    Monthly,
    Weekly,
    Daily,
}

/// Notification channel for a budget alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertChannel {
    Email,
    Chat,
    Webhook,
}

/// An alert threshold rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAlert {
    pub threshold: f64,
    pub channel: AlertChannel,
    pub recipients: Vec<String>,
    pub enabled: bool,
}

/// Automated cost-saving action taken when a budget threshold is crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoAction {
    HibernateAll,
    StopAll,
    PreventLaunch,
    NotifyOnly,
}

/// An auto-action threshold rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAutoAction {
    pub threshold: f64,
    pub action: AutoAction,
    pub enabled: bool,
}

/// Budget attached to a project. `spent`/`remaining`/`projected_monthly`/
/// `days_until_exhausted` are derived, not persisted — see
/// `basecamp-budget`'s accumulator for how they're recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub schema_version: u32,
    pub id: BudgetId,
    pub project_ref: ProjectId,
    pub total_amount: f64,
    pub period: BudgetPeriod,
    pub monthly_cap: Option<f64>,
    pub daily_cap: Option<f64>,
    pub end_date: Option<DateTime<Utc>>,
    pub alerts: Vec<BudgetAlert>,
    pub auto_actions: Vec<BudgetAutoAction>,
}

/// Package manager used to provision a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageManager {
    Auto,
    Conda,
    Spack,
    Apt,
}

/// A service to enable on the workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: String,
    pub port: u16,
    pub enable: bool,
}

/// A user to create on the workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSpec {
    pub name: String,
    pub groups: Vec<String>,
    pub ssh_key_refs: Vec<String>,
}

/// A provisioning recipe, optionally inheriting from a parent template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub schema_version: u32,
    pub id: TemplateId,
    pub name: String,
    pub description: String,
    pub base_image: String,
    pub inherits: Option<String>,
    pub package_manager: PackageManager,
    pub packages: Vec<String>,
    pub services: Vec<ServiceSpec>,
    pub users: Vec<UserSpec>,
    pub ports: Vec<u16>,
    pub instance_type_map: std::collections::BTreeMap<String, String>,
    pub cost_per_hour_map: std::collections::BTreeMap<String, f64>,
}

/// Action taken when an idle schedule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleAction {
    Alert,
    Hibernate,
    Stop,
    Terminate,
}

/// A single idle rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdleSchedule {
    pub idle_minutes: u32,
    pub action: IdleAction,
    pub time_window: Option<String>,
    pub cost_threshold: Option<f64>,
}

/// A named set of idle rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlePolicy {
    pub schema_version: u32,
    pub id: IdlePolicyId,
    pub name: String,
    pub schedules: Vec<IdleSchedule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn billable_idle_states() {
        assert!(WorkspaceState::Stopped.is_billable_idle());
        assert!(WorkspaceState::Hibernated.is_billable_idle());
        assert!(WorkspaceState::Terminated.is_billable_idle());
        assert!(!WorkspaceState::Running.is_billable_idle());
        assert!(!WorkspaceState::Provisioning.is_billable_idle());
    }

    #[test]
    fn role_lattice_ordering() {
        assert!(ProjectRole::Viewer < ProjectRole::Member);
        assert!(ProjectRole::Member < ProjectRole::Admin);
        assert!(ProjectRole::Admin < ProjectRole::Owner);
    }

    #[test]
    fn idle_action_least_destructive_ordering() {
        assert!(IdleAction::Alert < IdleAction::Hibernate);
        assert!(IdleAction::Hibernate < IdleAction::Stop);
        assert!(IdleAction::Stop < IdleAction::Terminate);
    }

    #[test]
    fn volume_kind_matches_discriminator() {
        let v = StorageVolume::Workspace {
            schema_version: SCHEMA_VERSION,
            id: VolumeId::default(),
            name: "scratch".into(),
            region: "us-east-1".into(),
            state: "available".into(),
            creation_time: Utc::now(),
            size_gb: 100,
            volume_type: "gp3".into(),
            iops: None,
            throughput: None,
            attached_to: None,
            provider_volume_id: "vol-test0001".into(),
        };
        assert_eq!(v.kind(), VolumeKind::Workspace);
        assert!(!v.has_active_attachment());
    }

    #[test]
    fn rollback_truncates_layers_at_checkpoint() {
        let mut ws = Workspace {
            schema_version: SCHEMA_VERSION,
            id: WorkspaceId::default(),
            name: "ws-1".into(),
            template_ref: TemplateId::default(),
            size_class: SizeClass::M,
            architecture: Architecture::X86_64,
            lifecycle: LifecycleMode::OnDemand,
            state: WorkspaceState::Running,
            region: "us-east-1".into(),
            provider_instance_id: Some("i-abc123".into()),
            public_ip: None,
            private_ip: None,
            launched_at: Some(Utc::now()),
            hourly_rate: 0.5,
            accumulated_cost: 1.0,
            attached_shared_volumes: vec![],
            attached_workspace_volumes: vec![],
            applied_template_layers: vec![],
            idle_policy_ref: None,
            project_ref: None,
            owner_principal: "alice".into(),
            provisioning_script_digest: "abc".into(),
            hibernation_fallback: true,
        };

        for i in 0..3 {
            ws.applied_template_layers.push(AppliedTemplateLayer {
                template_ref: TemplateId::default(),
                applied_at: Utc::now(),
                package_manager_used: PackageManager::Apt,
                packages_installed_count: 1,
                services_configured_count: 0,
                users_added_count: 0,
                rollback_checkpoint_id: format!("ckpt-{i}"),
            });
        }

        ws.rollback_to("ckpt-1");
        assert_eq!(ws.applied_template_layers.len(), 1);
        assert_eq!(
            ws.applied_template_layers[0].rollback_checkpoint_id,
            "ckpt-0"
        );
    }
}
