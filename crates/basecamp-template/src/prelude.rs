//! Prelude module — commonly used types for convenient import.
//!
//! Use `use basecamp_template::prelude::*;` to import all essential types.

pub use crate::{
    ApplyOptions, ApplyPlan, PackageConflict, ResolvedTemplate, RollbackOutcome, TemplateDiff,
    TemplateDirectories, TemplateError, TemplateResolver, TemplateResult,
};
