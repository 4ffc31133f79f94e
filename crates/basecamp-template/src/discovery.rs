//! Scan template search directories in priority order and load the raw
//! (possibly still-inheriting) template definitions they contain.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use basecamp_storage::Template;
use tracing::{debug, info, warn};

use crate::error::{TemplateError, TemplateResult};

/// Standard template file names recognized inside a template directory
/// entry, checked in this order.
pub const TEMPLATE_FILE_NAMES: &[&str] = &["TEMPLATE.toml", "template.toml"];

/// An ordered list of template search directories, highest priority
/// first. A workspace-local directory (if any) should come first, then
/// the user-level directory, then the system-level one: the most
/// specific definition wins.
#[derive(Debug, Clone, Default)]
pub struct TemplateDirectories {
    dirs: Vec<PathBuf>,
}

impl TemplateDirectories {
    /// Start with no search directories.
    #[must_use]
    pub fn new() -> Self {
        Self { dirs: Vec::new() }
    }

    /// Append a directory at the next-lowest priority. Missing directories
    /// are not an error here; they are skipped silently at scan time.
    #[must_use]
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dirs.push(dir.into());
        self
    }

    /// The configured directories, highest priority first.
    #[must_use]
    pub fn as_slice(&self) -> &[PathBuf] {
        &self.dirs
    }
}

/// One discovered template together with the directory it came from, for
/// duplicate-detection diagnostics.
struct Found {
    template: Template,
    source_dir: PathBuf,
    priority: usize,
}

/// Scan every configured directory and produce the set of templates
/// visible after priority resolution, keyed by name.
///
/// A name found in more than one directory is resolved silently in favor
/// of the higher-priority (lower index) directory. A name found twice
/// *within the same directory* is a hard [`TemplateError::DuplicateTemplate`],
/// since neither definition can claim precedence over the other.
pub fn discover_templates(dirs: &TemplateDirectories) -> TemplateResult<HashMap<String, Template>> {
    let mut by_name: HashMap<String, Found> = HashMap::new();

    for (priority, dir) in dirs.as_slice().iter().enumerate() {
        if !dir.exists() {
            debug!(path = %dir.display(), "template directory does not exist, skipping");
            continue;
        }

        info!(path = %dir.display(), priority, "scanning template directory");
        for (name, template) in load_templates_from_dir(dir)? {
            match by_name.get(&name) {
                Some(existing) if existing.priority == priority => {
                    return Err(TemplateError::DuplicateTemplate {
                        name,
                        first_path: existing.source_dir.display().to_string(),
                        second_path: dir.display().to_string(),
                    });
                },
                Some(existing) => {
                    debug!(
                        name = %name,
                        overridden_by = %dir.display(),
                        overridden_dir = %existing.source_dir.display(),
                        "lower-priority template definition ignored"
                    );
                },
                None => {
                    by_name.insert(
                        name,
                        Found { template, source_dir: dir.clone(), priority },
                    );
                },
            }
        }
    }

    Ok(by_name.into_iter().map(|(name, found)| (name, found.template)).collect())
}

/// Load every template definition directly inside `dir`. Each file is one
/// template; the template's `name` field (not the file name) is the key
/// used for inheritance and overrides.
fn load_templates_from_dir(dir: &Path) -> TemplateResult<Vec<(String, Template)>> {
    let mut out = Vec::new();

    let entries = std::fs::read_dir(dir).map_err(|e| TemplateError::DirectoryReadFailed {
        path: dir.display().to_string(),
        message: e.to_string(),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| TemplateError::DirectoryReadFailed {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;
        let path = entry.path();

        let is_template_file = path.is_file()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| TEMPLATE_FILE_NAMES.contains(&n));

        if !is_template_file {
            continue;
        }

        let template = load_template_file(&path)?;
        out.push((template.name.clone(), template));
    }

    Ok(out)
}

/// Parse a single template definition file.
fn load_template_file(path: &Path) -> TemplateResult<Template> {
    let content = std::fs::read_to_string(path).map_err(|e| TemplateError::FileReadFailed {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let template: Template = toml::from_str(&content).map_err(|e| TemplateError::ParseFailed {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    if template.name.trim().is_empty() {
        return Err(TemplateError::ParseFailed {
            path: path.display().to_string(),
            message: "template name must not be empty".into(),
        });
    }

    Ok(template)
}

#[cfg(test)]
mod tests {
    use basecamp_core::ids::TemplateId;
    use basecamp_storage::PackageManager;
    use tempfile::TempDir;

    use super::*;

    fn write_template(dir: &Path, file_name: &str, name: &str, inherits: Option<&str>) {
        let template = Template {
            schema_version: 1,
            id: TemplateId::default(),
            name: name.to_string(),
            description: String::new(),
            base_image: "ubuntu-22.04".into(),
            inherits: inherits.map(str::to_string),
            package_manager: PackageManager::Auto,
            packages: Vec::new(),
            services: Vec::new(),
            users: Vec::new(),
            ports: Vec::new(),
            instance_type_map: Default::default(),
            cost_per_hour_map: Default::default(),
        };
        std::fs::write(dir.join(file_name), toml::to_string_pretty(&template).unwrap()).unwrap();
    }

    #[test]
    fn missing_directories_are_skipped_not_errors() {
        let dirs = TemplateDirectories::new().with_dir("/nonexistent/basecamp/templates");
        let found = discover_templates(&dirs).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn higher_priority_directory_overrides_lower() {
        let high = TempDir::new().unwrap();
        let low = TempDir::new().unwrap();
        write_template(high.path(), "TEMPLATE.toml", "base", None);
        write_template(low.path(), "TEMPLATE.toml", "base", None);

        let dirs = TemplateDirectories::new().with_dir(high.path()).with_dir(low.path());
        let found = discover_templates(&dirs).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn duplicate_within_same_directory_errors() {
        let dir = TempDir::new().unwrap();
        write_template(dir.path(), "TEMPLATE.toml", "base", None);
        write_template(dir.path(), "template.toml", "base", None);

        let dirs = TemplateDirectories::new().with_dir(dir.path());
        let err = discover_templates(&dirs).unwrap_err();
        assert!(matches!(err, TemplateError::DuplicateTemplate { .. }));
    }

    #[test]
    fn non_template_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("README.md"), "not a template").unwrap();
        write_template(dir.path(), "TEMPLATE.toml", "base", None);

        let dirs = TemplateDirectories::new().with_dir(dir.path());
        let found = discover_templates(&dirs).unwrap();
        assert_eq!(found.len(), 1);
    }
}
