//! Command and plan shapes the lifecycle engine accepts and returns.

use basecamp_core::ids::{CheckpointId, IdlePolicyId, ProjectId, TemplateId, VolumeId, WorkspaceId};
use basecamp_storage::{Architecture, LifecycleMode, PackageManager, SizeClass};

/// A request to launch a new workspace.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    /// The workspace's name, unique within `project`.
    pub name: String,
    /// The project the workspace belongs to.
    pub project: ProjectId,
    /// The template to resolve and provision.
    pub template_name: String,
    pub size_class: SizeClass,
    pub architecture: Architecture,
    pub lifecycle: LifecycleMode,
    /// An explicit package-manager choice overriding the template's own
    /// declaration. Rejected with
    /// [`crate::error::LifecycleError::UnsupportedPackageManager`] if it
    /// does not match what the template would otherwise resolve to.
    pub package_manager_override: Option<PackageManager>,
    pub region: String,
    pub owner_principal: String,
    pub shared_volumes: Vec<VolumeId>,
    pub workspace_volumes: Vec<VolumeId>,
    pub idle_policy_ref: Option<IdlePolicyId>,
    /// When set, steps 4-9 of the launch algorithm never run: the engine
    /// returns the plan it would have executed, with no side effects.
    pub dry_run: bool,
}

/// The resolved plan a dry-run launch returns instead of executing.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchPlan {
    pub instance_type: String,
    pub estimated_hourly_rate: f64,
    pub script_digest: String,
    pub shared_volumes: Vec<VolumeId>,
    pub workspace_volumes: Vec<VolumeId>,
}

/// Options for an [`LifecycleCommand::Apply`], mirroring
/// [`basecamp_template::ApplyOptions`] plus the template selection that
/// option set leaves to its caller.
#[derive(Debug, Clone)]
pub struct ApplyRequest {
    pub template_name: String,
    pub package_manager_override: Option<PackageManager>,
    pub dry_run: bool,
    pub force: bool,
}

/// A state-changing (or, for `Apply`/`Rollback`, side-effecting) command
/// the lifecycle engine can execute against a workspace.
#[derive(Debug, Clone)]
pub enum LifecycleCommand {
    /// Creates a new workspace; the only command with no existing
    /// workspace id to target.
    Launch(LaunchRequest),
    Stop,
    Start,
    Hibernate,
    Resume,
    Terminate,
    Apply(ApplyRequest),
    Rollback {
        checkpoint: CheckpointId,
    },
    SaveAsTemplate {
        new_template_name: String,
    },
}

impl LifecycleCommand {
    /// This command's [`crate::transitions::LifecycleEvent`] label, for
    /// error messages and logging.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Launch(_) => "Launch",
            Self::Stop => "Stop",
            Self::Start => "Start",
            Self::Hibernate => "Hibernate",
            Self::Resume => "Resume",
            Self::Terminate => "Terminate",
            Self::Apply(_) => "Apply",
            Self::Rollback { .. } => "Rollback",
            Self::SaveAsTemplate { .. } => "SaveAsTemplate",
        }
    }

    /// Whether this command should pre-empt whatever else is queued for
    /// the same workspace.
    #[must_use]
    pub fn is_terminate(&self) -> bool {
        matches!(self, Self::Terminate)
    }
}

/// The result of successfully executing a [`LifecycleCommand`].
#[derive(Debug, Clone)]
pub enum LifecycleOutcome {
    Launched {
        workspace_id: WorkspaceId,
    },
    DryRunPlanned(LaunchPlan),
    Stopped,
    Started,
    Hibernated {
        /// Set when the provider rejected hibernation and the engine
        /// fell back to `Stop`; the workspace ends in `stopped`, not
        /// `hibernated`.
        fallback_to_stop: bool,
    },
    Resumed,
    Terminating,
    Applied(basecamp_template::ApplyPlan),
    RolledBack(basecamp_template::RollbackOutcome),
    SavedAsTemplate {
        template_id: TemplateId,
    },
}
