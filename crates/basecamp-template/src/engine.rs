//! The Template Resolver component: owns the search directories, the
//! discovered-and-cached raw template set, and exposes resolution,
//! script generation, diffing, applying, and rollback as one surface.

use std::collections::HashMap;

use basecamp_storage::{PackageManager, Template};
use tracing::info;

use crate::discovery::{TemplateDirectories, discover_templates};
use crate::error::TemplateResult;
use crate::resolver::resolve;
use crate::types::ResolvedTemplate;

/// The Template Resolver: discovers templates from disk, resolves
/// inheritance and package-manager selection, and is the single entry
/// point callers should hold on to rather than calling the `discovery`/
/// `resolver` module functions directly.
pub struct TemplateResolver {
    dirs: TemplateDirectories,
    templates: HashMap<String, Template>,
}

impl TemplateResolver {
    /// Scan `dirs` once and cache the result. Call [`Self::refresh`] to
    /// re-scan after templates on disk change.
    pub fn new(dirs: TemplateDirectories) -> TemplateResult<Self> {
        let templates = discover_templates(&dirs)?;
        info!(count = templates.len(), "template resolver initialized");
        Ok(Self { dirs, templates })
    }

    /// Re-scan the configured search directories, replacing the cached
    /// template set.
    pub fn refresh(&mut self) -> TemplateResult<()> {
        self.templates = discover_templates(&self.dirs)?;
        info!(count = self.templates.len(), "template resolver refreshed");
        Ok(())
    }

    /// The names currently visible after priority resolution.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    /// The raw, not-yet-inheritance-resolved template record for `name`,
    /// if discovered. Callers that need the persisted `Template::id`
    /// (e.g. to stamp `Workspace::template_ref`) use this instead of
    /// `resolve`, whose output has already flattened inheritance away.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    /// Resolve `name`'s full inheritance chain and package-manager
    /// selection.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::TemplateError::NotFound`],
    /// [`crate::error::TemplateError::UnknownParent`], or
    /// [`crate::error::TemplateError::InheritanceCycle`] as appropriate.
    pub fn resolve(
        &self,
        name: &str,
        package_manager_override: Option<PackageManager>,
    ) -> TemplateResult<ResolvedTemplate> {
        resolve(name, &self.templates, package_manager_override)
    }
}
