//! Prelude module — commonly used types for convenient import.
//!
//! Use `use basecamp_identity::prelude::*;` to import all essential types.

pub use crate::{
    IdentityError, IdentityResult, Member, Project, ProjectRole, ProjectService, UnixIdentity,
    assign_identity,
};
