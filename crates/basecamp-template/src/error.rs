//! Error taxonomy for template discovery, resolution, and application.

use basecamp_core::OrchestratorError;

/// Errors from template discovery, resolution, and layered application.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// A template search directory exists but could not be read.
    #[error("failed to read template directory {path}: {message}")]
    DirectoryReadFailed {
        /// The directory that failed.
        path: String,
        /// Underlying OS error message.
        message: String,
    },

    /// A template file exists but could not be read.
    #[error("failed to read template file {path}: {message}")]
    FileReadFailed {
        /// The file that failed.
        path: String,
        /// Underlying OS error message.
        message: String,
    },

    /// A template file could not be parsed as valid TOML or failed schema
    /// validation.
    #[error("failed to parse template file {path}: {message}")]
    ParseFailed {
        /// The file that failed.
        path: String,
        /// Parser or validation error message.
        message: String,
    },

    /// The same template name was defined twice at the same search
    /// priority, with neither directory taking precedence.
    #[error("duplicate template {name:?} defined in both {first_path} and {second_path}")]
    DuplicateTemplate {
        /// The clashing template name.
        name: String,
        /// The first directory it was found in.
        first_path: String,
        /// The second directory it was found in.
        second_path: String,
    },

    /// A template declared `inherits` on a name that does not resolve.
    #[error("template {name:?} inherits from unknown template {parent:?}")]
    UnknownParent {
        /// The template that declared the broken inheritance.
        name: String,
        /// The unresolvable parent name.
        parent: String,
    },

    /// The inheritance chain loops back on itself.
    #[error("inheritance cycle detected: {}", chain.join(" -> "))]
    InheritanceCycle {
        /// The chain of template names, in traversal order, ending where it
        /// first repeats.
        chain: Vec<String>,
    },

    /// The requested template name is not present in the resolved set.
    #[error("template not found: {0}")]
    NotFound(String),

    /// `apply` hit a package already installed at a different version and
    /// `force` was not set.
    #[error("conflict on package {package}: installed at {installed}, template wants {wanted}")]
    VersionConflict {
        /// The conflicting package name.
        package: String,
        /// The version currently applied.
        installed: String,
        /// The version the target template requests.
        wanted: String,
    },

    /// The checkpoint named in a `rollback` call is not in the workspace's
    /// applied-layer history.
    #[error("rollback checkpoint not found: {0}")]
    CheckpointNotFound(String),
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

impl From<TemplateError> for OrchestratorError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::DirectoryReadFailed { path, message }
            | TemplateError::FileReadFailed { path, message } => {
                OrchestratorError::Internal(format!("{path}: {message}"))
            },
            TemplateError::ParseFailed { path, message } => {
                OrchestratorError::invalid_argument("template", format!("{path}: {message}"))
            },
            TemplateError::DuplicateTemplate { name, first_path, second_path } => {
                OrchestratorError::conflict(
                    format!("template:{name}"),
                    format!("defined in both {first_path} and {second_path}"),
                )
            },
            TemplateError::UnknownParent { name, parent } => OrchestratorError::invalid_argument(
                "inherits",
                format!("template {name:?} inherits from unknown template {parent:?}"),
            ),
            TemplateError::InheritanceCycle { chain } => OrchestratorError::invalid_argument(
                "inherits",
                format!("inheritance cycle: {}", chain.join(" -> ")),
            ),
            TemplateError::NotFound(name) => OrchestratorError::not_found("template", name),
            TemplateError::VersionConflict { package, installed, wanted } => {
                OrchestratorError::conflict(
                    format!("package:{package}"),
                    format!("installed at {installed}, template wants {wanted}; pass force=true"),
                )
            },
            TemplateError::CheckpointNotFound(id) => {
                OrchestratorError::not_found("rollback_checkpoint", id)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_orchestrator_not_found() {
        let err: OrchestratorError = TemplateError::NotFound("pytorch-gpu".into()).into();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn version_conflict_maps_to_conflict() {
        let err: OrchestratorError = TemplateError::VersionConflict {
            package: "numpy".into(),
            installed: "1.24".into(),
            wanted: "1.26".into(),
        }
        .into();
        assert_eq!(err.code(), "conflict");
    }
}
