//! Persistent state store for the research workstation orchestrator.
//!
//! Provides typed `get`/`put`/`delete` per entity kind — [`Workspace`],
//! [`StorageVolume`], [`Project`], [`Template`], [`IdlePolicy`],
//! [`Budget`] — plus the secondary indices the lifecycle engine and
//! budget engine need (workspace-by-name, workspace-by-project,
//! volume-by-attachment, project-by-member), over a single-writer
//! `SurrealDB` connection.
//!
//! # Scaling
//!
//! | Deployment | Backend |
//! |------------|---------|
//! | Single daemon (default) | `SurrealDB` embedded, `SurrealKV` storage |
//! | Tests | `SurrealDB` embedded, in-memory storage (`mem://`) |
//!
//! Same API at both tiers: scaling is a connection-string change, not a
//! code change.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use db::Database;
pub use error::{StorageError, StorageResult};
pub use store::{StateStore, SurrealStateStore};
pub use types::{
    AlertChannel, Architecture, AppliedTemplateLayer, AutoAction, Budget, BudgetAlert,
    BudgetAutoAction, BudgetPeriod, IdleAction, IdlePolicy, IdleSchedule, LifecycleMode, Member,
    PackageManager, Project, ProjectRole, ServiceSpec, SizeClass, StorageVolume, Template,
    UserSpec, VolumeKind, VolumeMount, Workspace, WorkspaceState, SCHEMA_VERSION,
};
