//! Storage error types.

use basecamp_core::error::OrchestratorError;

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested key or item was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A storage operation failed.
    #[error("storage error: {0}")]
    Internal(String),

    /// Connection to the storage backend failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The namespace or key is invalid.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for OrchestratorError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(id) => OrchestratorError::not_found("entity", id),
            StorageError::InvalidKey(key) => {
                OrchestratorError::invalid_argument("key", key)
            },
            StorageError::Internal(msg) | StorageError::Connection(msg)
            | StorageError::Serialization(msg) => OrchestratorError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_not_found() {
        let mapped: OrchestratorError = StorageError::NotFound("workspace:w-1".into()).into();
        assert_eq!(mapped.code(), "not_found");
    }

    #[test]
    fn connection_failure_maps_to_internal() {
        let mapped: OrchestratorError = StorageError::Connection("refused".into()).into();
        assert_eq!(mapped.code(), "internal");
    }
}
