//! Package manager selection: explicit override, then the template's own
//! declaration, then auto-selection from the package list.

use basecamp_storage::PackageManager;

/// Packages whose presence indicates a conda-managed scientific Python
/// stack. Matched by prefix so that e.g. `pytorch-cuda` still counts as
/// `pytorch`.
const CONDA_INDICATORS: &[&str] =
    &["numpy", "scipy", "pandas", "pytorch", "tensorflow", "jupyter", "scikit-learn", "jax", "conda"];

/// Packages whose presence indicates an HPC workload better served by
/// environment-modules-style package management than conda or apt.
const SPACK_INDICATORS: &[&str] =
    &["openmpi", "mpich", "slurm", "lapack", "openblas", "petsc", "hdf5", "fftw", "cuda-toolkit"];

/// Decide which package manager provisions a resolved template.
///
/// Precedence: `override_manager` (an explicit caller choice) wins
/// unconditionally; otherwise `declared` wins if the template set one
/// explicitly (not [`PackageManager::Auto`]); otherwise the package list
/// is inspected: any conda indicator selects conda, any HPC indicator
/// (checked only if no conda indicator matched) selects spack, and
/// everything else falls back to the apt-equivalent system manager.
#[must_use]
pub fn select_package_manager(
    override_manager: Option<PackageManager>,
    declared: PackageManager,
    packages: &[String],
) -> PackageManager {
    if let Some(manager) = override_manager {
        return manager;
    }
    if declared != PackageManager::Auto {
        return declared;
    }

    let matches_any = |indicators: &[&str]| {
        packages
            .iter()
            .any(|pkg| indicators.iter().any(|indicator| pkg.starts_with(indicator)))
    };

    if matches_any(CONDA_INDICATORS) {
        PackageManager::Conda
    } else if matches_any(SPACK_INDICATORS) {
        PackageManager::Spack
    } else {
        PackageManager::Apt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packages(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn explicit_override_wins_over_everything() {
        let result = select_package_manager(
            Some(PackageManager::Apt),
            PackageManager::Conda,
            &packages(&["numpy"]),
        );
        assert_eq!(result, PackageManager::Apt);
    }

    #[test]
    fn declared_manager_wins_over_auto_selection() {
        let result = select_package_manager(None, PackageManager::Spack, &packages(&["numpy"]));
        assert_eq!(result, PackageManager::Spack);
    }

    #[test]
    fn conda_packages_trigger_conda() {
        let result = select_package_manager(None, PackageManager::Auto, &packages(&["pytorch-cuda"]));
        assert_eq!(result, PackageManager::Conda);
    }

    #[test]
    fn hpc_packages_trigger_spack() {
        let result = select_package_manager(None, PackageManager::Auto, &packages(&["openmpi-4.1"]));
        assert_eq!(result, PackageManager::Spack);
    }

    #[test]
    fn plain_packages_fall_back_to_apt() {
        let result = select_package_manager(None, PackageManager::Auto, &packages(&["curl", "vim"]));
        assert_eq!(result, PackageManager::Apt);
    }

    #[test]
    fn conda_indicator_takes_priority_over_spack_indicator() {
        let result =
            select_package_manager(None, PackageManager::Auto, &packages(&["numpy", "openmpi"]));
        assert_eq!(result, PackageManager::Conda);
    }
}
