use std::collections::HashMap;

/// Which configuration layer a value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in defaults (`defaults.toml`).
    Defaults,
    /// System-wide configuration (`/etc/basecamp/config.toml`).
    System,
    /// User-level configuration (`$BASECAMP_HOME/config.toml`).
    User,
    /// Environment variable (`BASECAMP_*`) fallback.
    Environment,
}

impl std::fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defaults => write!(f, "defaults"),
            Self::System => write!(f, "system (/etc/basecamp/config.toml)"),
            Self::User => write!(f, "user ($BASECAMP_HOME/config.toml)"),
            Self::Environment => write!(f, "environment variable"),
        }
    }
}

/// Tracks which layer set each field's value, keyed by dotted field path
/// (e.g. `"idle_scan_interval_secs"`). Surfaced by `GET /status`.
pub type FieldSources = HashMap<String, ConfigLayer>;
