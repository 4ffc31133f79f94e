//! Budget evaluation for the research-workstation orchestrator.
//!
//! [`BudgetEngine`] evaluates a project's [`basecamp_storage::Budget`]
//! against spend recomputed from the cost ledger (owned by
//! `basecamp-pricing`), edge-triggering alerts and auto-actions exactly
//! once per upward threshold crossing per period. It does not talk to the
//! cost ledger, the event bus, or the workspace lifecycle engine itself —
//! the caller recomputes `spent`, passes it to
//! [`BudgetEngine::evaluate`], and is responsible for publishing the
//! resulting events and enqueuing any workspace commands the evaluation's
//! [`BudgetEvaluation::requires_workspace_action`] or
//! [`BudgetEvaluation::requires_prevent_launch`] call for.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod engine;
pub mod error;
pub mod prelude;
pub mod types;

pub use engine::BudgetEngine;
pub use error::{BudgetError, BudgetResult};
pub use types::{BudgetEvaluation, ProjectedMonthly};
