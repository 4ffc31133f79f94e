//! Commonly used types for convenient import.
//!
//! ```rust
//! use basecamp_core::prelude::*;
//! ```

pub use crate::{
    BudgetId, CheckpointId, EventId, IdlePolicyId, OrchestratorError, OrchestratorHome,
    OrchestratorResult, ProjectId, RetryConfig, RetryOutcome, TemplateId, Version, VolumeId,
    WorkspaceId, retry,
};
