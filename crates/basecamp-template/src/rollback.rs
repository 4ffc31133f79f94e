//! Rolling back an applied template layer. The guiding invariant is that
//! `rollback` never leaves a workspace unreachable: a step the package
//! manager cannot cleanly reverse is reported as residual delta rather
//! than attempted and left half-done.

use basecamp_storage::PackageManager;

use crate::diff::TemplateDiff;

/// Packages whose spack install leaves environment-modules state behind
/// that `spack uninstall` does not clean up (module files, generated
/// compiler wrapper scripts). Matched by prefix.
const SPACK_RESIDUAL_INDICATORS: &[&str] = &["cuda-toolkit", "openmpi", "mpich"];

/// The outcome of attempting to roll back an applied layer.
#[derive(Debug, Clone, PartialEq)]
pub enum RollbackOutcome {
    /// Every package, service, and user the layer added was cleanly
    /// reversed.
    FullyRolledBack,
    /// Some part of the layer could not be cleanly reversed by its
    /// package manager. The workspace remains reachable; `residual`
    /// describes what is left in place.
    PartiallyRolledBack {
        /// What remains applied after the best-effort rollback.
        residual: TemplateDiff,
    },
}

/// Evaluate whether `package_manager` can cleanly reverse a layer that
/// installed `packages`, and report the outcome.
///
/// Apt and conda installs are modeled as always cleanly reversible
/// (`apt-get remove`/`conda remove` fully undo their own install step).
/// Spack installs of HPC toolchains that register environment-modules
/// state are not: those packages are surfaced as residual delta rather
/// than silently left half-removed.
#[must_use]
pub fn rollback(package_manager: PackageManager, packages: &[String]) -> RollbackOutcome {
    if package_manager != PackageManager::Spack {
        return RollbackOutcome::FullyRolledBack;
    }

    let residual_packages: Vec<String> = packages
        .iter()
        .filter(|pkg| SPACK_RESIDUAL_INDICATORS.iter().any(|indicator| pkg.starts_with(indicator)))
        .cloned()
        .collect();

    if residual_packages.is_empty() {
        RollbackOutcome::FullyRolledBack
    } else {
        RollbackOutcome::PartiallyRolledBack {
            residual: TemplateDiff { packages_to_remove: residual_packages, ..TemplateDiff::default() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apt_rollback_is_always_clean() {
        let outcome = rollback(PackageManager::Apt, &["anything".to_string()]);
        assert_eq!(outcome, RollbackOutcome::FullyRolledBack);
    }

    #[test]
    fn conda_rollback_is_always_clean() {
        let outcome = rollback(PackageManager::Conda, &["pytorch".to_string()]);
        assert_eq!(outcome, RollbackOutcome::FullyRolledBack);
    }

    #[test]
    fn spack_hpc_toolchain_leaves_residual() {
        let outcome = rollback(PackageManager::Spack, &["openmpi@4.1".to_string()]);
        match outcome {
            RollbackOutcome::PartiallyRolledBack { residual } => {
                assert_eq!(residual.packages_to_remove, vec!["openmpi@4.1".to_string()]);
            },
            RollbackOutcome::FullyRolledBack => panic!("expected partial rollback"),
        }
    }

    #[test]
    fn spack_plain_library_rolls_back_cleanly() {
        let outcome = rollback(PackageManager::Spack, &["zlib".to_string()]);
        assert_eq!(outcome, RollbackOutcome::FullyRolledBack);
    }
}
