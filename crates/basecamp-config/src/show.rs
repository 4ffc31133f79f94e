//! Source-annotated display for the resolved daemon configuration.
//!
//! Backs `GET /status`'s config diagnostic view: which layer (defaults,
//! system, user, environment) set each field.

use std::fmt::{self, Write as _};

use crate::merge::FieldSources;
use crate::types::Config;

/// A resolved configuration together with source annotations.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final merged configuration.
    pub config: Config,
    /// Dotted field path → which layer set the value.
    pub field_sources: FieldSources,
    /// Config file paths that were loaded, in precedence order.
    pub loaded_files: Vec<String>,
}

/// Output format for the resolved configuration view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowFormat {
    /// TOML with inline comments showing source.
    Toml,
    /// JSON (for programmatic consumption, e.g. `GET /status`).
    Json,
}

impl ResolvedConfig {
    /// Format the resolved config with source annotations.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn show(&self, format: ShowFormat) -> Result<String, fmt::Error> {
        match format {
            ShowFormat::Toml => self.show_toml(),
            ShowFormat::Json => self.show_json(),
        }
    }

    fn show_toml(&self) -> Result<String, fmt::Error> {
        let toml_str = toml::to_string_pretty(&self.config).map_err(|_| fmt::Error)?;

        let mut output = String::new();
        output.push_str("# Resolved orchestrator configuration\n");
        output.push_str("# Source annotations: [defaults] [system] [user] [environment variable]\n");

        if !self.loaded_files.is_empty() {
            output.push_str("#\n# Loaded files (in precedence order):\n");
            for (i, path) in self.loaded_files.iter().enumerate() {
                let _ = writeln!(output, "#   {}. {path}", i.saturating_add(1));
            }
        }

        output.push('\n');

        for line in toml_str.lines() {
            if let Some(annotation) = self.annotate_line(line) {
                let _ = writeln!(output, "{line}  # {annotation}");
            } else {
                output.push_str(line);
                output.push('\n');
            }
        }

        Ok(output)
    }

    fn show_json(&self) -> Result<String, fmt::Error> {
        serde_json::to_string_pretty(&self.config).map_err(|_| fmt::Error)
    }

    /// Try to extract a source annotation for a TOML line.
    fn annotate_line(&self, line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('[') {
            return None;
        }

        let key = trimmed.split('=').next()?.trim();
        self.field_sources
            .get(key)
            .map(|layer| format!("[{layer}]"))
    }

    /// List all config file paths the loader checks, in precedence order.
    #[must_use]
    pub fn config_paths(home_dir: Option<&str>) -> Vec<String> {
        let mut paths = vec!["/etc/basecamp/config.toml".to_owned()];
        if let Some(home) = home_dir {
            paths.push(format!("{home}/config.toml"));
        } else {
            paths.push("$BASECAMP_HOME/config.toml".to_owned());
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved() -> ResolvedConfig {
        ResolvedConfig {
            config: Config::default(),
            field_sources: FieldSources::new(),
            loaded_files: Vec::new(),
        }
    }

    #[test]
    fn show_toml_has_header() {
        let output = resolved().show(ShowFormat::Toml).unwrap();
        assert!(output.contains("Resolved orchestrator configuration"));
        assert!(output.contains("region"));
    }

    #[test]
    fn show_json_is_valid() {
        let output = resolved().show(ShowFormat::Json).unwrap();
        let _: serde_json::Value = serde_json::from_str(&output).unwrap();
    }

    #[test]
    fn config_paths_in_precedence_order() {
        let paths = ResolvedConfig::config_paths(Some("/home/user/.basecamp"));
        assert_eq!(paths.len(), 2);
        assert!(paths[0].contains("/etc/basecamp"));
        assert!(paths[1].contains("/home/user/.basecamp"));
    }
}
