//! The orchestrator-wide error taxonomy.
//!
//! Every component crate returns [`OrchestratorError`] at its public
//! boundary. Each variant carries the structured fields a caller needs to
//! react programmatically; the [`Display`](std::fmt::Display) impl (via
//! `thiserror`) renders the human message. [`OrchestratorError::code`]
//! returns a stable machine code suitable for API responses and logs.

use thiserror::Error;

/// Errors that can occur anywhere in the orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. `"workspace"`, `"project"`, `"template"`.
        kind: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// A name clash, illegal state transition, or concurrent modification.
    #[error("conflict on {resource}: {reason}")]
    Conflict {
        /// The resource in conflict, e.g. `"workspace:name"`.
        resource: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The request violates a schema, range, or enum constraint.
    #[error("invalid argument {field}: {message}")]
    InvalidArgument {
        /// The offending field.
        field: String,
        /// Human-readable explanation.
        message: String,
    },

    /// The caller could not be authenticated.
    #[error("unauthorized: {reason}")]
    Unauthorized {
        /// Reason authentication failed.
        reason: String,
    },

    /// The caller is authenticated but lacks the required role.
    #[error("forbidden: {reason}")]
    Forbidden {
        /// Reason the action is forbidden.
        reason: String,
    },

    /// A precondition (e.g. a budget auto-action) blocked the operation.
    #[error("precondition failed: {reason}")]
    PreconditionFailed {
        /// Reason the precondition failed.
        reason: String,
    },

    /// The cloud provider returned an error.
    #[error("provider error ({provider_code}): {message}")]
    ProviderError {
        /// The provider's own error code, surfaced verbatim.
        provider_code: String,
        /// Human-readable message.
        message: String,
        /// Whether the operation is safe to retry.
        retryable: bool,
    },

    /// The operation exceeded its deadline.
    #[error("timeout after {elapsed_ms}ms (deadline {deadline_ms}ms)")]
    Timeout {
        /// Elapsed time in milliseconds before the timeout fired.
        elapsed_ms: u64,
        /// The configured deadline in milliseconds.
        deadline_ms: u64,
    },

    /// An invariant was violated. Never expected; never swallowed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// A stable machine-readable code for API responses and log fields.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::PreconditionFailed { .. } => "precondition_failed",
            Self::ProviderError { .. } => "provider_error",
            Self::Timeout { .. } => "timeout",
            Self::Internal(_) => "internal",
        }
    }

    /// A remediation hint, where one is useful. `None` otherwise.
    #[must_use]
    pub fn remediation_hint(&self) -> Option<&'static str> {
        match self {
            Self::PreconditionFailed { .. } => {
                Some("check the project's budget auto-actions before retrying")
            },
            Self::Timeout { .. } => Some("the operation may have completed; re-check entity state"),
            Self::ProviderError { retryable: true, .. } => {
                Some("transient provider error; safe to retry with backoff")
            },
            _ => None,
        }
    }

    /// Whether this error, if it originated from a provider call, should be
    /// retried with backoff rather than surfaced immediately.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderError { retryable: true, .. })
    }

    /// Construct a [`OrchestratorError::NotFound`].
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }

    /// Construct a [`OrchestratorError::Conflict`].
    pub fn conflict(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Conflict {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Construct a [`OrchestratorError::InvalidArgument`].
    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type for orchestrator operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_stable_per_variant() {
        assert_eq!(OrchestratorError::not_found("workspace", "w-1").code(), "not_found");
        assert_eq!(
            OrchestratorError::conflict("workspace:name", "already exists").code(),
            "conflict"
        );
        assert_eq!(OrchestratorError::Internal("boom".into()).code(), "internal");
    }

    #[test]
    fn provider_error_retryability() {
        let transient = OrchestratorError::ProviderError {
            provider_code: "Throttling".into(),
            message: "rate limited".into(),
            retryable: true,
        };
        assert!(transient.is_retryable());

        let permanent = OrchestratorError::ProviderError {
            provider_code: "InvalidInstanceType".into(),
            message: "no such instance type".into(),
            retryable: false,
        };
        assert!(!permanent.is_retryable());
    }

    #[test]
    fn display_messages_are_human_readable() {
        let err = OrchestratorError::not_found("template", "gpu-base");
        assert_eq!(err.to_string(), "template not found: gpu-base");
    }
}
