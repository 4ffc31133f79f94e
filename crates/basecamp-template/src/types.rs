//! Resolved-template shapes that sit downstream of the raw,
//! possibly-still-inheriting [`Template`](basecamp_storage::Template)
//! definitions on disk.

use std::collections::BTreeMap;

use basecamp_storage::{PackageManager, ServiceSpec, UserSpec};
use serde::{Deserialize, Serialize};

/// A template with its full inheritance chain flattened and its package
/// manager decided. This is what script generation and diffing operate
/// on; it never has an `inherits` field because there is nothing left to
/// resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTemplate {
    /// The template's own name (the most-derived one in the chain).
    pub name: String,
    /// Base image reference, taken from the most-derived template that set
    /// one (children may leave it unset to inherit the parent's).
    pub base_image: String,
    /// The package manager that will provision this template, after
    /// override/declared/auto-selection has been applied.
    pub package_manager: PackageManager,
    /// Packages to install, parent-first, de-duplicated by keeping the
    /// most-derived occurrence's position.
    pub packages: Vec<String>,
    /// Services to enable, parent-first, de-duplicated by name (child
    /// wins on conflicting fields).
    pub services: Vec<ServiceSpec>,
    /// Users to create, parent-first, de-duplicated by name (child wins,
    /// with group/key lists unioned).
    pub users: Vec<UserSpec>,
    /// Ports to open, parent-first, de-duplicated.
    pub ports: Vec<u16>,
    /// Instance-type overrides, parent-first with child entries winning.
    pub instance_type_map: BTreeMap<String, String>,
    /// Hourly cost overrides, parent-first with child entries winning.
    pub cost_per_hour_map: BTreeMap<String, f64>,
    /// The inheritance chain, most-derived first, ending at the root
    /// template that declares no `inherits`. Used for diagnostics and to
    /// make script generation's provenance auditable.
    pub source_chain: Vec<String>,
}

/// A fully generated provisioning artifact: the script itself, a secrets
/// sidecar kept out of the script body, and a content digest suitable for
/// [`basecamp_storage::Workspace::provisioning_script_digest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningScript {
    /// The generated shell script body.
    pub script: String,
    /// Secret references the script expects to be materialized out of
    /// band (e.g. SSH public keys); never the secret values themselves.
    pub secrets_sidecar: String,
    /// BLAKE3 digest of `script`, hex-encoded. Identical resolved
    /// templates, architectures, and package managers always produce the
    /// same digest.
    pub digest: String,
}
