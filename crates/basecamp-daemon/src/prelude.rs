//! Prelude module — commonly used types for convenient import.
//!
//! Use `use basecamp_daemon::prelude::*;` to import all essential types.

pub use crate::error::ApiError;
pub use crate::routes::build_router;
pub use crate::scan_loops::{budget_scan_loop, cost_reconciliation_loop, idle_scan_loop};
pub use crate::state::AppState;
