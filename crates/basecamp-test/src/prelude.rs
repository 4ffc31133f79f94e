//! Prelude module — commonly used types for convenient import.
//!
//! Use `use basecamp_test::prelude::*;` to import all essential types.

pub use crate::fake_provider::FakeProvider;
pub use crate::fixtures::{
    test_budget, test_conda_template, test_idle_policy, test_project, test_running_workspace,
    test_template, test_workspace, test_workspace_volume,
};
pub use crate::wiring::{test_event_bus, test_store};
