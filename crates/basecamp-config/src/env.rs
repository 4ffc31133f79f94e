//! Environment variable fallback and `${VAR}` reference resolution.
//!
//! Env vars are a **fallback**, not an override — they only apply to fields
//! no config file layer has already set.

use std::collections::HashMap;
use std::fmt::Write as _;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// All supported `BASECAMP_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "BASECAMP_REGION",
        field_path: "region",
    },
    EnvMapping {
        var_name: "BASECAMP_CLOUD_PROFILE",
        field_path: "cloud_profile",
    },
    EnvMapping {
        var_name: "BASECAMP_LISTEN_ADDR",
        field_path: "listen_addr",
    },
    EnvMapping {
        var_name: "BASECAMP_LISTEN_PORT",
        field_path: "listen_port",
    },
    EnvMapping {
        var_name: "BASECAMP_STATE_DIR",
        field_path: "state_dir",
    },
    EnvMapping {
        var_name: "BASECAMP_LOG_LEVEL",
        field_path: "log_level",
    },
    EnvMapping {
        var_name: "BASECAMP_LOG_FORMAT",
        field_path: "log_format",
    },
    EnvMapping {
        var_name: "BASECAMP_IDLE_SCAN_INTERVAL_SECS",
        field_path: "idle_scan_interval_secs",
    },
    EnvMapping {
        var_name: "BASECAMP_BUDGET_SCAN_INTERVAL_SECS",
        field_path: "budget_scan_interval_secs",
    },
    EnvMapping {
        var_name: "BASECAMP_COST_RECONCILIATION_INTERVAL_SECS",
        field_path: "cost_reconciliation_interval_secs",
    },
    EnvMapping {
        var_name: "BASECAMP_PROVISIONING_TIMEOUT_SECS",
        field_path: "provisioning_timeout_secs",
    },
];

/// Apply environment variable fallbacks to fields that were **not** set by
/// any config file layer.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if sources.contains_key(mapping.field_path) {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );

            set_field_from_string(merged, mapping.field_path, val);
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Resolve `${VAR}` references within string values in the config tree.
///
/// Only string values are processed. References that don't resolve are left
/// as-is (with a debug log).
pub fn resolve_env_references<S: ::std::hash::BuildHasher>(
    val: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) {
    match val {
        toml::Value::String(s) => {
            *s = resolve_string_refs(s, env_vars);
        },
        toml::Value::Table(table) => {
            let keys: Vec<String> = table.keys().cloned().collect();
            for key in keys {
                if let Some(child) = table.get_mut(&key) {
                    resolve_env_references(child, env_vars);
                }
            }
        },
        toml::Value::Array(arr) => {
            for child in arr.iter_mut() {
                resolve_env_references(child, env_vars);
            }
        },
        _ => {},
    }
}

/// Resolve `${VAR}` references using only `BASECAMP_*` and cloud-credential
/// prefixed environment variables.
///
/// Cloud-credential variables are recognized by the common prefixes used by
/// the major providers' SDKs (`AWS_`, `AZURE_`, `GOOGLE_`, `GCP_`).
pub fn resolve_env_references_restricted<S: ::std::hash::BuildHasher>(
    val: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) {
    let restricted: HashMap<String, String> = env_vars
        .iter()
        .filter(|(k, _)| is_interpolation_allowed(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    resolve_env_references(val, &restricted);
}

fn is_interpolation_allowed(var_name: &str) -> bool {
    const CLOUD_PREFIXES: &[&str] = &["AWS_", "AZURE_", "GOOGLE_", "GCP_"];
    var_name.starts_with("BASECAMP_") || CLOUD_PREFIXES.iter().any(|p| var_name.starts_with(p))
}

/// Replace `${VAR}` references in a string with their env var values.
fn resolve_string_refs<S: ::std::hash::BuildHasher>(
    input: &str,
    env_vars: &HashMap<String, String, S>,
) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_name = String::new();
            let mut closed = false;

            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                var_name.push(ch);
            }

            if closed && !var_name.is_empty() {
                if let Some(val) = env_vars.get(&var_name) {
                    result.push_str(val);
                } else {
                    debug!(var = var_name, "unresolved env var reference in config");
                    let _ = write!(result, "${{{var_name}}}");
                }
            } else {
                result.push('$');
                result.push('{');
                result.push_str(&var_name);
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Set a field in the TOML tree from a string value, coercing to the
/// known type for the given field path.
fn set_field_from_string(root: &mut toml::Value, path: &str, val: &str) {
    let toml_val = coerce_to_toml_value(path, val);

    if let Some(table) = root.as_table_mut() {
        table.insert(path.to_owned(), toml_val);
    }
}

/// Coerce a string env var value to the appropriate TOML type for a
/// known top-level field.
fn coerce_to_toml_value(path: &str, val: &str) -> toml::Value {
    if matches!(
        path,
        "listen_port"
            | "idle_scan_interval_secs"
            | "budget_scan_interval_secs"
            | "cost_reconciliation_interval_secs"
            | "provisioning_timeout_secs"
    ) && let Ok(i) = val.parse::<i64>()
    {
        return toml::Value::Integer(i);
    }

    toml::Value::String(val.to_owned())
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn applies_unset_field_fallback() {
        let mut merged: toml::Value = toml::from_str("region = \"us-east-1\"").unwrap();
        let mut sources = FieldSources::new();
        let env = make_env(&[("BASECAMP_LOG_LEVEL", "debug")]);

        let count = apply_env_fallbacks(&mut merged, &mut sources, &env);

        assert_eq!(count, 1);
        assert_eq!(merged["log_level"].as_str().unwrap(), "debug");
        assert_eq!(sources.get("log_level"), Some(&ConfigLayer::Environment));
    }

    #[test]
    fn skips_already_set_field() {
        let mut merged: toml::Value = toml::from_str("log_level = \"warn\"").unwrap();
        let mut sources = FieldSources::new();
        sources.insert("log_level".to_owned(), ConfigLayer::User);

        let env = make_env(&[("BASECAMP_LOG_LEVEL", "debug")]);
        let count = apply_env_fallbacks(&mut merged, &mut sources, &env);

        assert_eq!(count, 0);
        assert_eq!(merged["log_level"].as_str().unwrap(), "warn");
    }

    #[test]
    fn coerces_numeric_field() {
        let mut merged: toml::Value = toml::from_str("").unwrap();
        let mut sources = FieldSources::new();
        let env = make_env(&[("BASECAMP_LISTEN_PORT", "9000")]);

        apply_env_fallbacks(&mut merged, &mut sources, &env);

        assert_eq!(merged["listen_port"].as_integer(), Some(9000));
    }

    #[test]
    fn resolves_var_reference() {
        let mut val: toml::Value = toml::from_str("cloud_profile = \"${BASECAMP_PROFILE}\"").unwrap();
        let env = make_env(&[("BASECAMP_PROFILE", "research")]);
        resolve_env_references(&mut val, &env);

        assert_eq!(val["cloud_profile"].as_str().unwrap(), "research");
    }

    #[test]
    fn leaves_unresolved_reference_as_is() {
        let mut val: toml::Value = toml::from_str("cloud_profile = \"${MISSING_VAR}\"").unwrap();
        let env = HashMap::new();
        resolve_env_references(&mut val, &env);

        assert_eq!(val["cloud_profile"].as_str().unwrap(), "${MISSING_VAR}");
    }

    #[test]
    fn restricted_resolution_blocks_arbitrary_vars() {
        let mut val: toml::Value = toml::from_str("region = \"${HOME}\"").unwrap();
        let env = make_env(&[("HOME", "/home/user")]);
        resolve_env_references_restricted(&mut val, &env);

        assert_eq!(val["region"].as_str().unwrap(), "${HOME}");
    }

    #[test]
    fn restricted_resolution_allows_basecamp_and_cloud_vars() {
        let mut val: toml::Value =
            toml::from_str("region = \"${BASECAMP_REGION}\"\ncloud_profile = \"${AWS_PROFILE}\"")
                .unwrap();
        let env = make_env(&[
            ("BASECAMP_REGION", "us-west-2"),
            ("AWS_PROFILE", "research"),
        ]);
        resolve_env_references_restricted(&mut val, &env);

        assert_eq!(val["region"].as_str().unwrap(), "us-west-2");
        assert_eq!(val["cloud_profile"].as_str().unwrap(), "research");
    }
}
