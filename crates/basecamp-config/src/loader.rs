//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge `/etc/basecamp/config.toml` (system)
//! 3. Merge `$BASECAMP_HOME/config.toml` (user, default `~/.basecamp/config.toml`)
//! 4. Apply env var (`BASECAMP_*`) fallbacks for fields no file layer set
//! 5. Resolve `${VAR}` references, restricted to `BASECAMP_*` and cloud
//!    credential variables
//! 6. Deserialize the merged tree → `Config`
//! 7. Validate
//! 8. Return `ResolvedConfig`

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars, resolve_env_references_restricted};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking};
use crate::show::ResolvedConfig;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB), to bound memory use on a
/// misconfigured or malicious file.
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load the daemon configuration with layered file precedence.
///
/// `home_override` provides an alternate home directory for user-level
/// config discovery, bypassing `$BASECAMP_HOME` resolution.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, or if the
/// final merged configuration fails validation.
pub fn load(home_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let env_vars = collect_env_vars();

    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<embedded defaults>"),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();

    record_defaults(&merged, "", &mut field_sources);

    // System config.
    let system_path = PathBuf::from("/etc/basecamp/config.toml");
    if let Some(overlay) = try_load_file(&system_path)? {
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::System,
            &mut field_sources,
        );
        loaded_files.push(system_path.display().to_string());
        info!(path = %system_path.display(), "loaded system config");
    }

    // User config: $BASECAMP_HOME/config.toml, or the override if given.
    let user_path = if let Some(home) = home_override {
        home.join("config.toml")
    } else {
        basecamp_core::OrchestratorHome::resolve()
            .map(|h| h.root().join("config.toml"))
            .unwrap_or_else(|_| PathBuf::from("config.toml"))
    };

    if let Some(mut overlay) = try_load_file(&user_path)? {
        resolve_env_references_restricted(&mut overlay, &env_vars);
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::User,
            &mut field_sources,
        );
        loaded_files.push(user_path.display().to_string());
        info!(path = %user_path.display(), "loaded user config");
    }

    // Apply env var fallbacks for fields no file layer set.
    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, &env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    resolve_env_references_restricted(&mut merged, &env_vars);

    let config: Config = merged
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseError {
            path: PathBuf::from("<merged config>"),
            source: e,
        })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a config from a specific file path (no layering).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let metadata = std::fs::metadata(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::FileTooLarge {
            path: path.to_path_buf(),
            limit_bytes: MAX_CONFIG_FILE_SIZE,
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Try to load a file, returning `None` if it doesn't exist.
///
/// Reads the file in a single pass (no separate exists/metadata probe) to
/// avoid a TOCTOU race between checking and reading.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::FileTooLarge {
            path: path.to_path_buf(),
            limit_bytes: MAX_CONFIG_FILE_SIZE,
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(Some(value))
}

/// Mark all leaf values in the defaults tree with the `Defaults` layer.
fn record_defaults(val: &toml::Value, prefix: &str, sources: &mut FieldSources) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            record_defaults(child, &path, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), ConfigLayer::Defaults);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_and_deserialize() {
        let val: toml::Value = toml::from_str(DEFAULTS_TOML).unwrap();
        assert!(val.as_table().unwrap().contains_key("region"));

        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config.listen_port, 8947);
    }

    #[test]
    fn load_with_home_override_merges_user_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "region = \"eu-west-1\"\n").unwrap();

        let resolved = load(Some(dir.path())).unwrap();
        assert_eq!(resolved.config.region, "eu-west-1");
        assert_eq!(resolved.loaded_files.len(), 1);
        assert_eq!(
            resolved.field_sources.get("region"),
            Some(&ConfigLayer::User)
        );
    }

    #[test]
    fn load_with_empty_home_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = load(Some(dir.path())).unwrap();
        assert_eq!(resolved.config, Config::default());
        assert!(resolved.loaded_files.is_empty());
    }

    #[test]
    fn load_file_nonexistent() {
        let result = load_file(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn try_load_file_missing_returns_none() {
        let result = try_load_file(Path::new("/nonexistent/config.toml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn record_defaults_tracks_nested_leaves() {
        let val: toml::Value = toml::from_str("region = \"us-east-1\"\nlisten_port = 8947\n").unwrap();
        let mut sources = FieldSources::new();
        record_defaults(&val, "", &mut sources);

        assert_eq!(sources.get("region"), Some(&ConfigLayer::Defaults));
        assert_eq!(sources.get("listen_port"), Some(&ConfigLayer::Defaults));
    }

    #[test]
    fn oversized_config_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("huge.toml");
        let data = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        std::fs::write(&file_path, data).unwrap();

        let result = try_load_file(&file_path);
        assert!(matches!(result, Err(ConfigError::FileTooLarge { .. })));
    }
}
