//! Purely functional provisioning script generation. Identical inputs —
//! the resolved template, architecture, and package manager — always
//! produce byte-identical output; nothing here reads the clock, touches
//! the filesystem, or generates randomness.

use basecamp_storage::{Architecture, PackageManager};

use crate::types::{ProvisioningScript, ResolvedTemplate};

/// Generate a provisioning script and its secrets sidecar for a resolved
/// template.
///
/// The script installs packages, enables services, and creates users; it
/// references secrets (SSH keys) only by an opaque placeholder name, with
/// the actual references recorded in the returned `secrets_sidecar` so
/// the script body itself never carries a secret value.
#[must_use]
pub fn generate(resolved: &ResolvedTemplate, architecture: Architecture) -> ProvisioningScript {
    let mut script = String::new();
    script.push_str("#!/usr/bin/env bash\n");
    script.push_str("set -euo pipefail\n\n");
    script.push_str(&format!("# template: {}\n", resolved.name));
    script.push_str(&format!("# architecture: {}\n", architecture_label(architecture)));
    script.push_str(&format!("# package_manager: {}\n\n", package_manager_label(resolved.package_manager)));

    if !resolved.packages.is_empty() {
        script.push_str(&install_block(resolved.package_manager, &resolved.packages));
        script.push('\n');
    }

    for service in &resolved.services {
        script.push_str(&service_block(service));
    }
    if !resolved.services.is_empty() {
        script.push('\n');
    }

    for user in &resolved.users {
        script.push_str(&user_block(user));
    }
    if !resolved.users.is_empty() {
        script.push('\n');
    }

    if !resolved.ports.is_empty() {
        script.push_str(&firewall_block(&resolved.ports));
    }

    let secrets_sidecar = secrets_sidecar(resolved);
    let digest = blake3::hash(script.as_bytes()).to_hex().to_string();

    ProvisioningScript { script, secrets_sidecar, digest }
}

fn architecture_label(architecture: Architecture) -> &'static str {
    match architecture {
        Architecture::X86_64 => "x86_64",
        Architecture::Arm64 => "arm64",
    }
}

fn package_manager_label(manager: PackageManager) -> &'static str {
    match manager {
        PackageManager::Auto => "auto",
        PackageManager::Conda => "conda",
        PackageManager::Spack => "spack",
        PackageManager::Apt => "apt",
    }
}

fn install_block(manager: PackageManager, packages: &[String]) -> String {
    let joined = packages.join(" ");
    match manager {
        PackageManager::Conda => {
            format!("conda install --yes --name base {joined}\n")
        },
        PackageManager::Spack => {
            format!("spack install {joined}\nspack load {joined}\n")
        },
        PackageManager::Apt | PackageManager::Auto => {
            format!("apt-get update\napt-get install --yes {joined}\n")
        },
    }
}

fn service_block(service: &basecamp_storage::ServiceSpec) -> String {
    let mut block = format!("# service: {} (port {})\n", service.name, service.port);
    if service.enable {
        block.push_str(&format!("systemctl enable --now {}\n", service.name));
    } else {
        block.push_str(&format!("systemctl disable --now {} || true\n", service.name));
    }
    block
}

fn user_block(user: &basecamp_storage::UserSpec) -> String {
    let mut block = String::new();
    let groups = if user.groups.is_empty() { String::new() } else { format!(" --groups {}", user.groups.join(",")) };
    block.push_str(&format!("useradd --create-home{groups} {}\n", user.name));
    for (index, _) in user.ssh_key_refs.iter().enumerate() {
        block.push_str(&format!(
            "install -d -m 700 /home/{name}/.ssh\n\
             echo \"$(basecamp_secret SSH_KEY_{name}_{index})\" >> /home/{name}/.ssh/authorized_keys\n",
            name = user.name,
            index = index,
        ));
    }
    block
}

fn firewall_block(ports: &[u16]) -> String {
    let mut block = String::from("# firewall\n");
    for port in ports {
        block.push_str(&format!("ufw allow {port}\n"));
    }
    block
}

/// Build the sidecar listing every secret reference the script expects to
/// find materialized under `basecamp_secret NAME` at provisioning time.
/// The sidecar never holds a secret value, only its reference name — the
/// actual lookup happens out of band, on the workspace host.
fn secrets_sidecar(resolved: &ResolvedTemplate) -> String {
    let mut lines = Vec::new();
    for user in &resolved.users {
        for (index, key_ref) in user.ssh_key_refs.iter().enumerate() {
            lines.push(format!("SSH_KEY_{}_{index}={key_ref}", user.name));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use basecamp_storage::{ServiceSpec, UserSpec};

    use super::*;

    fn sample() -> ResolvedTemplate {
        ResolvedTemplate {
            name: "pytorch-gpu".into(),
            base_image: "ubuntu-22.04".into(),
            package_manager: PackageManager::Conda,
            packages: vec!["pytorch".into(), "numpy".into()],
            services: vec![ServiceSpec { name: "jupyter".into(), port: 8888, enable: true }],
            users: vec![UserSpec {
                name: "researcher".into(),
                groups: vec!["sudo".into()],
                ssh_key_refs: vec!["vault://ssh/researcher".into()],
            }],
            ports: vec![8888, 22],
            instance_type_map: BTreeMap::new(),
            cost_per_hour_map: BTreeMap::new(),
            source_chain: vec!["pytorch-gpu".into()],
        }
    }

    #[test]
    fn identical_inputs_produce_byte_identical_scripts() {
        let a = generate(&sample(), Architecture::X86_64);
        let b = generate(&sample(), Architecture::X86_64);
        assert_eq!(a.script, b.script);
        assert_eq!(a.digest, b.digest);
    }

    #[test]
    fn different_architecture_changes_the_digest() {
        let a = generate(&sample(), Architecture::X86_64);
        let b = generate(&sample(), Architecture::Arm64);
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn secrets_sidecar_never_contains_the_script_body() {
        let artifact = generate(&sample(), Architecture::X86_64);
        assert!(artifact.secrets_sidecar.contains("vault://ssh/researcher"));
        assert!(!artifact.script.contains("vault://ssh/researcher"));
    }

    #[test]
    fn conda_manager_uses_conda_install() {
        let artifact = generate(&sample(), Architecture::X86_64);
        assert!(artifact.script.contains("conda install"));
    }
}
