//! Template discovery, inheritance resolution, package-manager selection,
//! and provisioning for the research-workstation orchestrator.
//!
//! - [`discovery`]: scan zero or more priority-ordered directories for
//!   template definitions, resolving name clashes by priority.
//! - [`resolver`]: walk a template's inheritance chain into a flattened
//!   [`types::ResolvedTemplate`], with cycle detection.
//! - [`package_manager`]: decide conda vs. spack vs. apt-equivalent.
//! - [`script`]: purely functional, byte-stable provisioning script and
//!   secrets sidecar generation.
//! - [`diff`]/[`apply`]/[`rollback`]: layered application of a template
//!   over a workspace that may already have one applied.
//! - [`engine`]: the [`engine::TemplateResolver`] facade tying the above
//!   together into the Template Resolver component.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod apply;
pub mod diff;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod package_manager;
pub mod prelude;
pub mod resolver;
pub mod rollback;
pub mod script;
pub mod types;

pub use apply::{ApplyOptions, ApplyPlan};
pub use diff::{PackageConflict, TemplateDiff};
pub use discovery::TemplateDirectories;
pub use engine::TemplateResolver;
pub use error::{TemplateError, TemplateResult};
pub use rollback::RollbackOutcome;
pub use types::{ProvisioningScript, ResolvedTemplate};
