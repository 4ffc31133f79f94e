//! Prelude module — commonly used types for convenient import.
//!
//! Use `use basecamp_budget::prelude::*;` to import all essential types.

pub use crate::engine::BudgetEngine;
pub use crate::error::{BudgetError, BudgetResult};
pub use crate::types::{BudgetEvaluation, ProjectedMonthly};
