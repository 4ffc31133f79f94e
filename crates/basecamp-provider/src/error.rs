//! Structured error taxonomy for cloud provider operations.

use basecamp_core::OrchestratorError;
use thiserror::Error;

/// Errors a [`crate::CloudProvider`] implementation can return.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider rejected the request as malformed (bad image ref,
    /// unknown instance type, out-of-range volume size).
    #[error("invalid provider request: {0}")]
    InvalidRequest(String),

    /// The referenced instance, volume, or image does not exist at the
    /// provider.
    #[error("{kind} not found at provider: {id}")]
    NotFound {
        /// `"instance"`, `"volume"`, or `"image"`.
        kind: &'static str,
        /// The provider-side identifier.
        id: String,
    },

    /// The provider returned an error response. `retryable` distinguishes
    /// throttling/transient failures from permanent ones.
    #[error("provider error ({code}): {message}")]
    Provider {
        /// The provider's own error code, surfaced verbatim.
        code: String,
        /// Human-readable message.
        message: String,
        /// Whether the caller should retry with backoff.
        retryable: bool,
    },

    /// The operation did not complete before its deadline.
    #[error("provider operation timed out after {elapsed_ms}ms")]
    Timeout {
        /// Elapsed time in milliseconds.
        elapsed_ms: u64,
    },

    /// The operation was cancelled via its [`tokio_util::sync::CancellationToken`].
    #[error("provider operation cancelled")]
    Cancelled,

    /// No hourly rate or cost figure is known for the requested tuple.
    #[error("pricing unknown for {0}")]
    PricingUnknown(String),

    /// The underlying HTTP transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Result type for [`crate::CloudProvider`] operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    /// Whether the failure is safe to retry with backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { retryable, .. } => *retryable,
            Self::Timeout { .. } | Self::Transport(_) => true,
            _ => false,
        }
    }
}

impl From<ProviderError> for OrchestratorError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidRequest(message) => {
                Self::InvalidArgument { field: "provider_spec".into(), message }
            },
            ProviderError::NotFound { kind, id } => Self::NotFound { kind, id },
            ProviderError::Provider { code, message, retryable } => {
                Self::ProviderError { provider_code: code, message, retryable }
            },
            ProviderError::Timeout { elapsed_ms } => {
                Self::Timeout { elapsed_ms, deadline_ms: elapsed_ms }
            },
            ProviderError::Cancelled => {
                Self::Internal("provider operation cancelled".into())
            },
            ProviderError::PricingUnknown(tuple) => Self::InvalidArgument {
                field: "instance_type/region/lifecycle".into(),
                message: format!("no rate known for {tuple}"),
            },
            ProviderError::Transport(source) => Self::ProviderError {
                provider_code: "transport_error".into(),
                message: source.to_string(),
                retryable: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_are_retryable_when_marked() {
        let throttled = ProviderError::Provider {
            code: "Throttling".into(),
            message: "too many requests".into(),
            retryable: true,
        };
        assert!(throttled.is_retryable());

        let invalid = ProviderError::InvalidRequest("bad image ref".into());
        assert!(!invalid.is_retryable());
    }

    #[test]
    fn not_found_maps_to_orchestrator_not_found() {
        let err = ProviderError::NotFound { kind: "instance", id: "i-123".into() };
        let mapped: OrchestratorError = err.into();
        assert_eq!(mapped.code(), "not_found");
    }
}
