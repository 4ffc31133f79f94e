//! Error taxonomy for the workspace lifecycle engine.

use basecamp_core::OrchestratorError;
use basecamp_core::ids::{ProjectId, WorkspaceId};
use basecamp_storage::{PackageManager, WorkspaceState};

/// Errors the lifecycle engine can return.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The requested command is not valid from the workspace's current
    /// state.
    #[error("workspace {workspace} cannot accept {command} from state {from:?}")]
    IllegalTransition {
        /// The workspace the command targeted.
        workspace: WorkspaceId,
        /// The state it was in when the command arrived.
        from: WorkspaceState,
        /// The command's name, for logging and API error messages.
        command: &'static str,
    },

    /// A `Terminate` already queued or in flight for this workspace
    /// pre-empted this command before it could run.
    #[error("workspace {0} is terminating; command pre-empted")]
    Preempted(WorkspaceId),

    /// A workspace with this name already exists in the project.
    #[error("workspace name {name:?} already exists in project {project}")]
    NameConflict {
        /// The project the name clashed in.
        project: ProjectId,
        /// The clashing name.
        name: String,
    },

    /// The project has an active `prevent_launch` budget auto-action.
    #[error("launch blocked: project {0} has an active prevent_launch budget auto-action")]
    LaunchBlocked(ProjectId),

    /// Provisioning did not reach `running` before its deadline.
    #[error("provisioning of workspace {workspace} exceeded its {deadline_secs}s deadline")]
    ProvisioningTimeout {
        /// The workspace that timed out.
        workspace: WorkspaceId,
        /// The configured deadline.
        deadline_secs: u64,
    },

    /// An explicit package-manager override named a manager the template
    /// was not declared to support.
    #[error("template declares {declared:?}; override to {requested:?} is unsupported")]
    UnsupportedPackageManager {
        /// The manager the template itself declares.
        declared: PackageManager,
        /// The manager the caller asked to override to.
        requested: PackageManager,
    },

    /// No entry in the template's `instance_type_map` covers the
    /// requested size class and architecture.
    #[error("template has no instance type for size/architecture key {key:?}")]
    NoInstanceType {
        /// The `"{size_class}:{architecture}"` key that was looked up.
        key: String,
    },

    /// Template resolution, diffing, or application failed.
    #[error(transparent)]
    Template(#[from] basecamp_template::TemplateError),

    /// The cloud provider rejected or failed an operation.
    #[error(transparent)]
    Provider(#[from] basecamp_provider::ProviderError),

    /// Rate lookup or cost reconciliation failed.
    #[error(transparent)]
    Pricing(#[from] basecamp_pricing::PricingError),

    /// The underlying state store failed.
    #[error("underlying state store error: {0}")]
    Storage(#[from] basecamp_storage::StorageError),
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;

impl From<LifecycleError> for OrchestratorError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::IllegalTransition { workspace, from, command } => {
                OrchestratorError::conflict(
                    format!("workspace:{workspace}:state"),
                    format!("{command} is not valid from {from:?}"),
                )
            },
            LifecycleError::Preempted(workspace) => OrchestratorError::conflict(
                format!("workspace:{workspace}:state"),
                "pre-empted by a Terminate command",
            ),
            LifecycleError::NameConflict { project, name } => OrchestratorError::conflict(
                format!("project:{project}:workspace_name"),
                format!("{name:?} already exists"),
            ),
            LifecycleError::LaunchBlocked(project) => OrchestratorError::PreconditionFailed {
                reason: format!(
                    "project {project} has an active prevent_launch budget auto-action"
                ),
            },
            LifecycleError::ProvisioningTimeout { deadline_secs, .. } => OrchestratorError::Timeout {
                elapsed_ms: deadline_secs.saturating_mul(1000),
                deadline_ms: deadline_secs.saturating_mul(1000),
            },
            LifecycleError::UnsupportedPackageManager { requested, .. } => {
                OrchestratorError::invalid_argument(
                    "package_manager_override",
                    format!("{requested:?} is not supported by this template"),
                )
            },
            LifecycleError::NoInstanceType { key } => OrchestratorError::invalid_argument(
                "size_class/architecture",
                format!("no instance type configured for {key:?}"),
            ),
            LifecycleError::Template(source) => source.into(),
            LifecycleError::Provider(source) => source.into(),
            LifecycleError::Pricing(source) => source.into(),
            LifecycleError::Storage(source) => OrchestratorError::Internal(source.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_transition_maps_to_conflict() {
        let err = LifecycleError::IllegalTransition {
            workspace: WorkspaceId::new(),
            from: WorkspaceState::Stopped,
            command: "Hibernate",
        };
        let mapped: OrchestratorError = err.into();
        assert_eq!(mapped.code(), "conflict");
    }

    #[test]
    fn launch_blocked_maps_to_precondition_failed() {
        let err = LifecycleError::LaunchBlocked(ProjectId::new());
        let mapped: OrchestratorError = err.into();
        assert_eq!(mapped.code(), "precondition_failed");
    }

    #[test]
    fn storage_error_maps_to_internal_not_into() {
        let err = LifecycleError::Storage(basecamp_storage::StorageError::NotFound("x".into()));
        let mapped: OrchestratorError = err.into();
        assert_eq!(mapped.code(), "internal");
    }
}
