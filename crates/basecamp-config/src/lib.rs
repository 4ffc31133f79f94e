#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Layered configuration loader for the orchestrator daemon.
//!
//! Provides a single [`Config`] type consolidating region, cloud profile,
//! listen address, state directory, template search path, logging, and the
//! scan/reconciliation intervals the daemon's background loops use.
//!
//! # Usage
//!
//! ```rust,no_run
//! use basecamp_config::Config;
//!
//! let resolved = Config::load().unwrap();
//! let config = resolved.config;
//! println!("listening on {}:{}", config.listen_addr, config.listen_port);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment variables** (`BASECAMP_*`)
//! 2. **User** (`$BASECAMP_HOME/config.toml`, default `~/.basecamp/config.toml`)
//! 3. **System** (`/etc/basecamp/config.toml`)
//! 4. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! Each layer only overlays fields it actually sets — a field absent from a
//! file never clobbers a value set by a lower-precedence layer.
//!
//! # Design
//!
//! This crate depends only on `basecamp-core` (for home directory
//! resolution), `serde`, `toml`, `thiserror`, and `tracing`.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging with precedence tracking.
pub mod merge;
/// Resolved configuration display and serialization.
pub mod show;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use show::{ResolvedConfig, ShowFormat};
pub use types::Config;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// See [`loader::load`] for the algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the
    /// final configuration fails validation.
    pub fn load() -> ConfigResult<ResolvedConfig> {
        loader::load(None)
    }

    /// Load configuration with an explicit home directory override, used
    /// for tests and for operators running multiple daemons per host.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any config file is malformed or the
    /// final configuration fails validation.
    pub fn load_with_home(home_dir: &std::path::Path) -> ConfigResult<ResolvedConfig> {
        loader::load(Some(home_dir))
    }

    /// Load configuration from a single file, with no layering.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or
    /// fails validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
