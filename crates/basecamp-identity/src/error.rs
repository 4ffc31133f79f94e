use basecamp_core::OrchestratorError;

/// Errors from project membership and identity operations.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("project not found: {0}")]
    ProjectNotFound(basecamp_core::ids::ProjectId),

    #[error("{principal} is already a member of project {project}")]
    AlreadyMember {
        principal: String,
        project: basecamp_core::ids::ProjectId,
    },

    #[error("{principal} is not a member of project {project}")]
    NotMember {
        principal: String,
        project: basecamp_core::ids::ProjectId,
    },

    #[error("project {project} must retain exactly one owner; cannot remove {principal}")]
    LastOwner {
        principal: String,
        project: basecamp_core::ids::ProjectId,
    },

    #[error(
        "{principal} owns artifacts in project {project}; pass force=true to remove destructively"
    )]
    OwnedArtifactsRemain {
        principal: String,
        project: basecamp_core::ids::ProjectId,
    },

    #[error("underlying state store error: {0}")]
    Storage(#[from] basecamp_storage::StorageError),
}

pub type IdentityResult<T> = std::result::Result<T, IdentityError>;

impl From<IdentityError> for OrchestratorError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::ProjectNotFound(id) => {
                OrchestratorError::not_found("project", id.to_string())
            },
            IdentityError::AlreadyMember { principal, project } => OrchestratorError::conflict(
                format!("project:{project}:member"),
                format!("{principal} is already a member"),
            ),
            IdentityError::NotMember { principal, project } => OrchestratorError::invalid_argument(
                "principal",
                format!("{principal} is not a member of project {project}"),
            ),
            IdentityError::LastOwner { principal, project } => OrchestratorError::conflict(
                format!("project:{project}:owner"),
                format!("cannot remove last owner {principal}"),
            ),
            IdentityError::OwnedArtifactsRemain { principal, project } => {
                OrchestratorError::conflict(
                    format!("project:{project}:member"),
                    format!("{principal} still owns artifacts; pass force=true"),
                )
            },
            IdentityError::Storage(e) => OrchestratorError::Internal(e.to_string()),
        }
    }
}
