//! Configuration types for the orchestrator daemon.
//!
//! This type has no dependencies on other internal crates — it mirrors the
//! fields the daemon actually consumes and every field
//! defaults to a production-sane value, so an empty TOML file produces a
//! working configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the orchestrator daemon.
///
/// Loaded from a layered TOML chain (defaults → system → user → env) with
/// per-field source tracking; see [`crate::loader::load`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cloud region the daemon provisions workspaces into (e.g. `us-east-1`).
    pub region: String,

    /// Named cloud credential/profile the provider abstraction authenticates
    /// with. Never a literal secret value — only a profile name or ARN.
    pub cloud_profile: String,

    /// Address the REST API server binds to.
    pub listen_addr: String,

    /// Port the REST API server binds to.
    pub listen_port: u16,

    /// Directory holding the SurrealKV state store.
    pub state_dir: PathBuf,

    /// Ordered template search directories. Later entries take priority
    /// over earlier ones when a template name collides.
    pub template_dirs: Vec<PathBuf>,

    /// `tracing` log level filter (`trace`, `debug`, `info`, `warn`, `error`,
    /// or a full `env-filter` directive string).
    pub log_level: String,

    /// Log output format (`pretty`, `compact`, `json`, `full`).
    pub log_format: String,

    /// How often the idle policy engine scans running workspaces, in seconds.
    pub idle_scan_interval_secs: u64,

    /// How often the budget engine scans project spend against thresholds,
    /// in seconds.
    pub budget_scan_interval_secs: u64,

    /// How often the pricing engine reconciles accrued cost against the
    /// provider's billing API, in seconds.
    pub cost_reconciliation_interval_secs: u64,

    /// Maximum time a workspace may remain in `provisioning` before the
    /// lifecycle engine considers the launch failed, in seconds.
    pub provisioning_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_owned(),
            cloud_profile: "default".to_owned(),
            listen_addr: "127.0.0.1".to_owned(),
            listen_port: 8947,
            state_dir: PathBuf::from("~/.basecamp/state"),
            template_dirs: Vec::new(),
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
            idle_scan_interval_secs: 60,
            budget_scan_interval_secs: 300,
            cost_reconciliation_interval_secs: 60,
            provisioning_timeout_secs: 900,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = Config::default();
        assert_eq!(config.listen_port, 8947);
        assert_eq!(config.idle_scan_interval_secs, 60);
        assert_eq!(config.budget_scan_interval_secs, 300);
        assert_eq!(config.cost_reconciliation_interval_secs, 60);
        assert_eq!(config.provisioning_timeout_secs, 900);
    }

    #[test]
    fn roundtrips_through_toml() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn empty_table_deserializes_to_defaults() {
        let parsed: Config = toml::from_str("").unwrap();
        assert_eq!(parsed, Config::default());
    }
}
