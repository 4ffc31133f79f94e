use std::path::PathBuf;

/// Errors arising from loading, merging, or validating orchestrator config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("config file {path} exceeds the {limit_bytes} byte size cap")]
    FileTooLarge { path: PathBuf, limit_bytes: u64 },

    #[error("invalid value for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("could not determine a home directory for the current user")]
    NoHomeDir,

    #[error("environment variable `{name}` referenced in `${{...}}` interpolation is not set")]
    MissingEnvVar { name: String },

    #[error(
        "environment variable `{name}` cannot be interpolated: only BASECAMP_* and cloud-credential variables are allowed"
    )]
    DisallowedEnvVar { name: String },

    #[error("failed to serialize resolved config: {0}")]
    SerializeError(#[source] serde_json::Error),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
