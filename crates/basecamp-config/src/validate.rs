//! Post-merge configuration validation.
//!
//! Validates that a deserialized [`Config`](crate::Config) is within
//! acceptable ranges and that cross-field invariants hold.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_region(config)?;
    validate_listen(config)?;
    validate_log_format(config)?;
    validate_intervals(config)?;
    Ok(())
}

fn validate_region(config: &Config) -> ConfigResult<()> {
    if config.region.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "region".to_owned(),
            message: "must not be empty".to_owned(),
        });
    }
    Ok(())
}

fn validate_listen(config: &Config) -> ConfigResult<()> {
    if config.listen_addr.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "listen_addr".to_owned(),
            message: "must not be empty".to_owned(),
        });
    }
    if config.listen_addr.parse::<std::net::IpAddr>().is_err() {
        return Err(ConfigError::ValidationError {
            field: "listen_addr".to_owned(),
            message: format!("`{}` is not a valid IP address", config.listen_addr),
        });
    }
    if config.listen_port == 0 {
        return Err(ConfigError::ValidationError {
            field: "listen_port".to_owned(),
            message: "must be a nonzero port".to_owned(),
        });
    }
    Ok(())
}

fn validate_log_format(config: &Config) -> ConfigResult<()> {
    if !matches!(
        config.log_format.as_str(),
        "pretty" | "compact" | "json" | "full"
    ) {
        return Err(ConfigError::ValidationError {
            field: "log_format".to_owned(),
            message: format!(
                "`{}` is not one of pretty, compact, json, full",
                config.log_format
            ),
        });
    }
    Ok(())
}

fn validate_intervals(config: &Config) -> ConfigResult<()> {
    if config.idle_scan_interval_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "idle_scan_interval_secs".to_owned(),
            message: "must be nonzero".to_owned(),
        });
    }
    if config.budget_scan_interval_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "budget_scan_interval_secs".to_owned(),
            message: "must be nonzero".to_owned(),
        });
    }
    if config.cost_reconciliation_interval_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "cost_reconciliation_interval_secs".to_owned(),
            message: "must be nonzero".to_owned(),
        });
    }
    if config.provisioning_timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "provisioning_timeout_secs".to_owned(),
            message: "must be nonzero".to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn rejects_empty_region() {
        let mut config = Config::default();
        config.region = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_bad_listen_addr() {
        let mut config = Config::default();
        config.listen_addr = "not-an-ip".to_owned();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_zero_port() {
        let mut config = Config::default();
        config.listen_port = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_unknown_log_format() {
        let mut config = Config::default();
        config.log_format = "xml".to_owned();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_zero_interval() {
        let mut config = Config::default();
        config.idle_scan_interval_secs = 0;
        assert!(validate(&config).is_err());
    }
}
