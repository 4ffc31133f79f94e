//! Compute the incremental delta between a resolved template and whatever
//! layer (if any) is currently applied to a workspace.

use basecamp_storage::{ServiceSpec, UserSpec};

use crate::types::ResolvedTemplate;

/// A package name clashing at a different version between the currently
/// applied layer and the target template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageConflict {
    /// The bare package name (without a version qualifier).
    pub package: String,
    /// The version string currently applied.
    pub installed_version: String,
    /// The version string the target template requests.
    pub wanted_version: String,
}

/// The human-readable-and-machine-executable result of
/// [`diff`](crate::diff::diff): what changes applying `target` over
/// `current` would make.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateDiff {
    /// Packages present in the target but not (at a matching version) in
    /// the current layer.
    pub packages_to_install: Vec<String>,
    /// Packages present in the current layer but absent from the target.
    pub packages_to_remove: Vec<String>,
    /// Services the target wants enabled that the current layer does not
    /// already have enabled identically.
    pub services_to_enable: Vec<ServiceSpec>,
    /// Services the current layer has that the target no longer declares.
    pub services_to_disable: Vec<ServiceSpec>,
    /// Users the target declares that the current layer does not have.
    pub users_to_add: Vec<UserSpec>,
    /// Packages present in both but at conflicting versions. Non-empty
    /// conflicts block `apply` unless `force` is set.
    pub conflicts: Vec<PackageConflict>,
}

impl TemplateDiff {
    /// True when applying this diff would be a no-op.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages_to_install.is_empty()
            && self.packages_to_remove.is_empty()
            && self.services_to_enable.is_empty()
            && self.services_to_disable.is_empty()
            && self.users_to_add.is_empty()
            && self.conflicts.is_empty()
    }

    /// A human-readable multi-line summary, one change per line.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut lines = Vec::new();
        for pkg in &self.packages_to_install {
            lines.push(format!("+ install {pkg}"));
        }
        for pkg in &self.packages_to_remove {
            lines.push(format!("- remove {pkg}"));
        }
        for svc in &self.services_to_enable {
            lines.push(format!("+ enable service {}", svc.name));
        }
        for svc in &self.services_to_disable {
            lines.push(format!("- disable service {}", svc.name));
        }
        for user in &self.users_to_add {
            lines.push(format!("+ add user {}", user.name));
        }
        for conflict in &self.conflicts {
            lines.push(format!(
                "! conflict: {} installed at {}, template wants {}",
                conflict.package, conflict.installed_version, conflict.wanted_version
            ));
        }
        lines.join("\n")
    }
}

/// Split a `name==version` package spec into its parts. A spec with no
/// `==` is treated as unversioned (empty version string), which compares
/// equal to itself but never conflicts.
fn split_spec(spec: &str) -> (&str, &str) {
    match spec.split_once("==") {
        Some((name, version)) => (name, version),
        None => (spec, ""),
    }
}

/// Compute the diff between the workspace's currently applied layer (if
/// any) and the `target` template it should end up matching.
#[must_use]
pub fn diff(target: &ResolvedTemplate, current: Option<&ResolvedTemplate>) -> TemplateDiff {
    let empty: Vec<String> = Vec::new();
    let current_packages = current.map_or(&empty, |c| &c.packages);
    let empty_services: Vec<ServiceSpec> = Vec::new();
    let current_services = current.map_or(&empty_services, |c| &c.services);
    let empty_users: Vec<UserSpec> = Vec::new();
    let current_users = current.map_or(&empty_users, |c| &c.users);

    let mut packages_to_install = Vec::new();
    let mut conflicts = Vec::new();

    for target_spec in &target.packages {
        let (target_name, target_version) = split_spec(target_spec);
        match current_packages.iter().find(|spec| split_spec(spec).0 == target_name) {
            None => packages_to_install.push(target_spec.clone()),
            Some(current_spec) => {
                let (_, current_version) = split_spec(current_spec);
                if current_spec != target_spec && !target_version.is_empty() && !current_version.is_empty()
                {
                    conflicts.push(PackageConflict {
                        package: target_name.to_string(),
                        installed_version: current_version.to_string(),
                        wanted_version: target_version.to_string(),
                    });
                }
            },
        }
    }

    let packages_to_remove = current_packages
        .iter()
        .filter(|spec| !target.packages.iter().any(|t| split_spec(t).0 == split_spec(spec).0))
        .cloned()
        .collect();

    let services_to_enable = target
        .services
        .iter()
        .filter(|svc| !current_services.contains(svc))
        .cloned()
        .collect();

    let services_to_disable = current_services
        .iter()
        .filter(|svc| !target.services.iter().any(|t| t.name == svc.name))
        .cloned()
        .collect();

    let users_to_add =
        target.users.iter().filter(|u| !current_users.iter().any(|c| c.name == u.name)).cloned().collect();

    TemplateDiff {
        packages_to_install,
        packages_to_remove,
        services_to_enable,
        services_to_disable,
        users_to_add,
        conflicts,
    }
}
