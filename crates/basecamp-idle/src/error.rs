//! Idle engine error types.

use basecamp_core::OrchestratorError;

/// Errors from idle scanning and activity probing.
#[derive(Debug, thiserror::Error)]
pub enum IdleError {
    /// The activity probe failed to report a workspace's current state.
    #[error("activity probe failed for workspace {workspace}: {reason}")]
    ProbeFailed {
        /// The workspace being probed.
        workspace: basecamp_core::ids::WorkspaceId,
        /// What went wrong.
        reason: String,
    },

    /// A schedule's `time_window` string could not be parsed.
    #[error("invalid time window {window:?}: {reason}")]
    InvalidTimeWindow {
        /// The offending window string.
        window: String,
        /// Why it failed to parse.
        reason: String,
    },

    /// Underlying state store error while resolving the effective policy.
    #[error("underlying state store error: {0}")]
    Storage(#[from] basecamp_storage::StorageError),
}

/// Result type for idle engine operations.
pub type IdleResult<T> = std::result::Result<T, IdleError>;

impl From<IdleError> for OrchestratorError {
    fn from(err: IdleError) -> Self {
        match err {
            IdleError::ProbeFailed { workspace, reason } => {
                OrchestratorError::Internal(format!("activity probe failed for {workspace}: {reason}"))
            },
            IdleError::InvalidTimeWindow { window, reason } => {
                OrchestratorError::invalid_argument("time_window", format!("{window:?}: {reason}"))
            },
            IdleError::Storage(source) => OrchestratorError::Internal(source.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basecamp_core::ids::WorkspaceId;

    #[test]
    fn probe_failed_maps_to_internal() {
        let err = IdleError::ProbeFailed { workspace: WorkspaceId::new(), reason: "timeout".into() };
        let mapped: OrchestratorError = err.into();
        assert_eq!(mapped.code(), "internal");
    }

    #[test]
    fn invalid_time_window_maps_to_invalid_argument() {
        let err = IdleError::InvalidTimeWindow { window: "bogus".into(), reason: "not HH:MM-HH:MM".into() };
        let mapped: OrchestratorError = err.into();
        assert_eq!(mapped.code(), "invalid_argument");
    }
}
