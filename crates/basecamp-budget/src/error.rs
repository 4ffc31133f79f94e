//! Budget evaluation error types.

use basecamp_core::OrchestratorError;
use basecamp_core::ids::ProjectId;

/// Errors from budget evaluation.
#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    /// No budget is attached to this project.
    #[error("project {0} has no budget configured")]
    NoBudget(ProjectId),
}

/// Result type for budget operations.
pub type BudgetResult<T> = std::result::Result<T, BudgetError>;

impl From<BudgetError> for OrchestratorError {
    fn from(err: BudgetError) -> Self {
        match err {
            BudgetError::NoBudget(project) => {
                OrchestratorError::not_found("budget", project.to_string())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_budget_maps_to_not_found() {
        let err = BudgetError::NoBudget(ProjectId::new());
        let mapped: OrchestratorError = err.into();
        assert_eq!(mapped.code(), "not_found");
    }
}
