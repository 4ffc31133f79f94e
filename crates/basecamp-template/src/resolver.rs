//! Walk a template's `inherits` chain into a flattened
//! [`ResolvedTemplate`], detecting cycles along the way.

use std::collections::{BTreeMap, HashMap};

use basecamp_storage::{PackageManager, ServiceSpec, Template, UserSpec};

use crate::error::{TemplateError, TemplateResult};
use crate::package_manager::select_package_manager;
use crate::types::ResolvedTemplate;

/// Resolve `name` against the discovered template set, walking its
/// `inherits` chain root-first and merging fields so that the
/// most-derived template wins on conflicts.
///
/// `package_manager_override` takes precedence over every template's own
/// declaration (spec: explicit caller override > declared manager >
/// auto-selection).
pub fn resolve(
    name: &str,
    templates: &HashMap<String, Template>,
    package_manager_override: Option<PackageManager>,
) -> TemplateResult<ResolvedTemplate> {
    let chain = inheritance_chain(name, templates)?;

    // `chain` is most-derived first; fold root-to-derived so later
    // (more specific) entries win on scalar fields and extend on
    // collections.
    let mut base_image = String::new();
    let mut declared_manager = PackageManager::Auto;
    let mut packages: Vec<String> = Vec::new();
    let mut services: Vec<ServiceSpec> = Vec::new();
    let mut users: Vec<UserSpec> = Vec::new();
    let mut ports: Vec<u16> = Vec::new();
    let mut instance_type_map: BTreeMap<String, String> = BTreeMap::new();
    let mut cost_per_hour_map: BTreeMap<String, f64> = BTreeMap::new();

    for link_name in chain.iter().rev() {
        let t = &templates[link_name];

        if !t.base_image.is_empty() {
            base_image = t.base_image.clone();
        }
        if t.package_manager != PackageManager::Auto {
            declared_manager = t.package_manager;
        }

        for pkg in &t.packages {
            if !packages.contains(pkg) {
                packages.push(pkg.clone());
            }
        }

        for svc in &t.services {
            if let Some(existing) = services.iter_mut().find(|s| s.name == svc.name) {
                *existing = svc.clone();
            } else {
                services.push(svc.clone());
            }
        }

        for user in &t.users {
            if let Some(existing) = users.iter_mut().find(|u| u.name == user.name) {
                for group in &user.groups {
                    if !existing.groups.contains(group) {
                        existing.groups.push(group.clone());
                    }
                }
                for key in &user.ssh_key_refs {
                    if !existing.ssh_key_refs.contains(key) {
                        existing.ssh_key_refs.push(key.clone());
                    }
                }
            } else {
                users.push(user.clone());
            }
        }

        for port in &t.ports {
            if !ports.contains(port) {
                ports.push(*port);
            }
        }

        instance_type_map.extend(t.instance_type_map.clone());
        cost_per_hour_map.extend(t.cost_per_hour_map.clone());
    }

    let package_manager = select_package_manager(package_manager_override, declared_manager, &packages);

    Ok(ResolvedTemplate {
        name: name.to_string(),
        base_image,
        package_manager,
        packages,
        services,
        users,
        ports,
        instance_type_map,
        cost_per_hour_map,
        source_chain: chain,
    })
}

/// Produce the inheritance chain for `name`, most-derived first, erroring
/// on an unknown parent or a cycle.
fn inheritance_chain(
    name: &str,
    templates: &HashMap<String, Template>,
) -> TemplateResult<Vec<String>> {
    let mut chain = Vec::new();
    let mut current = name.to_string();

    loop {
        if chain.contains(&current) {
            let mut cycle = chain.clone();
            cycle.push(current);
            return Err(TemplateError::InheritanceCycle { chain: cycle });
        }

        let template = templates
            .get(&current)
            .ok_or_else(|| TemplateError::NotFound(current.clone()))?;
        chain.push(current.clone());

        match &template.inherits {
            Some(parent) if !templates.contains_key(parent) => {
                return Err(TemplateError::UnknownParent {
                    name: current,
                    parent: parent.clone(),
                });
            },
            Some(parent) => current = parent.clone(),
            None => break,
        }
    }

    Ok(chain)
}

#[cfg(test)]
mod tests {
    use basecamp_core::ids::TemplateId;

    use super::*;

    fn template(name: &str, inherits: Option<&str>, packages: Vec<&str>) -> Template {
        Template {
            schema_version: 1,
            id: TemplateId::default(),
            name: name.to_string(),
            description: String::new(),
            base_image: if inherits.is_none() { "ubuntu-22.04".into() } else { String::new() },
            inherits: inherits.map(str::to_string),
            package_manager: PackageManager::Auto,
            packages: packages.into_iter().map(str::to_string).collect(),
            services: Vec::new(),
            users: Vec::new(),
            ports: Vec::new(),
            instance_type_map: BTreeMap::new(),
            cost_per_hour_map: BTreeMap::new(),
        }
    }

    #[test]
    fn child_inherits_parent_base_image() {
        let mut map = HashMap::new();
        map.insert("base".into(), template("base", None, vec!["curl"]));
        map.insert("child".into(), template("child", Some("base"), vec!["numpy"]));

        let resolved = resolve("child", &map, None).unwrap();
        assert_eq!(resolved.base_image, "ubuntu-22.04");
        assert_eq!(resolved.packages, vec!["curl", "numpy"]);
        assert_eq!(resolved.source_chain, vec!["child", "base"]);
    }

    #[test]
    fn self_inheritance_is_a_cycle() {
        let mut map = HashMap::new();
        map.insert("loop".into(), template("loop", Some("loop"), vec![]));
        let err = resolve("loop", &map, None).unwrap_err();
        assert!(matches!(err, TemplateError::InheritanceCycle { .. }));
    }

    #[test]
    fn mutual_cycle_is_detected() {
        let mut map = HashMap::new();
        map.insert("a".into(), template("a", Some("b"), vec![]));
        map.insert("b".into(), template("b", Some("a"), vec![]));
        let err = resolve("a", &map, None).unwrap_err();
        assert!(matches!(err, TemplateError::InheritanceCycle { .. }));
    }

    #[test]
    fn unknown_parent_errors() {
        let mut map = HashMap::new();
        map.insert("child".into(), template("child", Some("missing"), vec![]));
        let err = resolve("child", &map, None).unwrap_err();
        assert!(matches!(err, TemplateError::UnknownParent { .. }));
    }

    #[test]
    fn unknown_template_name_errors() {
        let map = HashMap::new();
        let err = resolve("ghost", &map, None).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(_)));
    }
}
