//! Project membership and identity for the research-workstation
//! orchestrator.
//!
//! Provides:
//! - [`ProjectService`], project creation and membership management
//!   (add/remove/role-change) over the shared [`basecamp_storage::StateStore`].
//! - [`allocator::assign_identity`], deterministic UID/GID assignment per
//!   `(project, principal)` pair, stable across workspaces so shared-volume
//!   permissions stay consistent for a user no matter which workspace they
//!   mount from.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use basecamp_identity::prelude::*;
//! use basecamp_storage::{Database, SurrealStateStore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect_memory().await?;
//! let service = ProjectService::new(Arc::new(SurrealStateStore::new(db)));
//!
//! let project = service.create_project("genomics", "alice").await?;
//! service.add_member(project.id, "bob", ProjectRole::Member).await?;
//!
//! let identity = assign_identity(project.id, "bob");
//! println!("bob is uid {} gid {} in project {}", identity.uid, identity.gid, project.id);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod allocator;
pub mod error;
pub mod prelude;
pub mod projects;

pub use allocator::{UnixIdentity, assign_identity};
pub use error::{IdentityError, IdentityResult};
pub use projects::ProjectService;
// Re-exported for callers that only depend on this crate, not basecamp-storage directly.
pub use basecamp_storage::{Member, Project, ProjectRole};
