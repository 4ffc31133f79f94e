//! Layered application of a resolved template onto a (possibly already
//! provisioned) workspace.

use basecamp_core::ids::CheckpointId;
use basecamp_storage::Architecture;

use crate::diff::{TemplateDiff, diff};
use crate::error::{TemplateError, TemplateResult};
use crate::script::{self, ProvisioningScript};
use crate::types::ResolvedTemplate;

/// Options controlling how `apply` behaves.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    /// Compute and return the plan without generating a script or
    /// minting a rollback checkpoint.
    pub dry_run: bool,
    /// Override a version conflict by reinstalling the conflicting
    /// packages at the target's requested version.
    pub force: bool,
}

/// The result of `apply`: the diff that was (or would be) applied, the
/// generated provisioning step when not a dry run, and the checkpoint
/// that a later `rollback` can target.
#[derive(Debug, Clone)]
pub struct ApplyPlan {
    /// The incremental change this application makes.
    pub diff: TemplateDiff,
    /// `None` in dry-run mode; otherwise the script that performs the
    /// incremental step.
    pub script: Option<ProvisioningScript>,
    /// `None` in dry-run mode; otherwise the checkpoint this application
    /// can later be rolled back to.
    pub checkpoint_id: Option<CheckpointId>,
}

/// Compute the diff between `current` and `target` and, unless
/// `options.dry_run` is set, generate the incremental provisioning script
/// and mint a rollback checkpoint.
///
/// A version conflict fails the call unless `options.force` is set, in
/// which case the conflicting packages are folded into the install step
/// at the target's requested version.
///
/// # Errors
///
/// Returns [`TemplateError::VersionConflict`] for the first unresolved
/// conflict when `force` is not set.
pub fn apply(
    target: &ResolvedTemplate,
    current: Option<&ResolvedTemplate>,
    architecture: Architecture,
    options: ApplyOptions,
) -> TemplateResult<ApplyPlan> {
    let mut plan_diff = diff(target, current);

    if !plan_diff.conflicts.is_empty() {
        if !options.force {
            let conflict = plan_diff.conflicts[0].clone();
            return Err(TemplateError::VersionConflict {
                package: conflict.package,
                installed: conflict.installed_version,
                wanted: conflict.wanted_version,
            });
        }
        for conflict in &plan_diff.conflicts {
            plan_diff
                .packages_to_install
                .push(format!("{}=={}", conflict.package, conflict.wanted_version));
        }
        plan_diff.conflicts.clear();
    }

    if options.dry_run {
        return Ok(ApplyPlan { diff: plan_diff, script: None, checkpoint_id: None });
    }

    let script = script::generate(target, architecture);
    Ok(ApplyPlan { diff: plan_diff, script: Some(script), checkpoint_id: Some(CheckpointId::new()) })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use basecamp_storage::PackageManager;

    use super::*;

    fn resolved(packages: Vec<&str>) -> ResolvedTemplate {
        ResolvedTemplate {
            name: "t".into(),
            base_image: "ubuntu-22.04".into(),
            package_manager: PackageManager::Apt,
            packages: packages.into_iter().map(str::to_string).collect(),
            services: Vec::new(),
            users: Vec::new(),
            ports: Vec::new(),
            instance_type_map: BTreeMap::new(),
            cost_per_hour_map: BTreeMap::new(),
            source_chain: vec!["t".into()],
        }
    }

    #[test]
    fn dry_run_emits_no_script_or_checkpoint() {
        let target = resolved(vec!["curl"]);
        let plan = apply(&target, None, Architecture::X86_64, ApplyOptions { dry_run: true, force: false })
            .unwrap();
        assert!(plan.script.is_none());
        assert!(plan.checkpoint_id.is_none());
        assert_eq!(plan.diff.packages_to_install, vec!["curl"]);
    }

    #[test]
    fn non_dry_run_produces_script_and_checkpoint() {
        let target = resolved(vec!["curl"]);
        let plan = apply(&target, None, Architecture::X86_64, ApplyOptions::default()).unwrap();
        assert!(plan.script.is_some());
        assert!(plan.checkpoint_id.is_some());
    }

    #[test]
    fn conflict_without_force_errors() {
        let target = resolved(vec!["numpy==1.26"]);
        let current = resolved(vec!["numpy==1.24"]);
        let err =
            apply(&target, Some(&current), Architecture::X86_64, ApplyOptions::default()).unwrap_err();
        assert!(matches!(err, TemplateError::VersionConflict { .. }));
    }

    #[test]
    fn conflict_with_force_reinstalls() {
        let target = resolved(vec!["numpy==1.26"]);
        let current = resolved(vec!["numpy==1.24"]);
        let plan = apply(
            &target,
            Some(&current),
            Architecture::X86_64,
            ApplyOptions { dry_run: false, force: true },
        )
        .unwrap();
        assert!(plan.diff.conflicts.is_empty());
        assert!(plan.diff.packages_to_install.contains(&"numpy==1.26".to_string()));
    }
}
