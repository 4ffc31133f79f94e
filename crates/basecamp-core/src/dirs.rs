//! Directory scaffolding for the daemon's on-disk home.
//!
//! [`OrchestratorHome`] resolves the daemon's global state directory at
//! `~/.basecamp/` (or `$BASECAMP_HOME`). It holds the persistent state
//! store, template search directories, logs, and layered configuration
//! files. All sensitive/runtime data lives here; no secrets are ever
//! written alongside it — cloud credentials are read from the environment
//! or the operator's own credential store, never persisted.
//!
//! # Layout
//!
//! ```text
//! ~/.basecamp/                     (OrchestratorHome)
//! ├── state/                        (SurrealKV — workspaces, projects, volumes, ...)
//! ├── logs/                         (daemon log files)
//! ├── templates/                    (user-level template directory)
//! ├── config.toml                   (user configuration layer)
//! └── daemon.pid                    (written on startup, removed on clean shutdown)
//! ```

use std::io;
use std::path::{Path, PathBuf};

/// Global orchestrator home directory (`~/.basecamp/` or `$BASECAMP_HOME`).
#[derive(Debug, Clone)]
pub struct OrchestratorHome {
    root: PathBuf,
}

impl OrchestratorHome {
    /// Resolve the home directory.
    ///
    /// Checks `$BASECAMP_HOME` first, then falls back to `$HOME/.basecamp/`.
    ///
    /// # Errors
    ///
    /// Returns an error if `$BASECAMP_HOME` is not an absolute path, or if
    /// neither `$BASECAMP_HOME` nor `$HOME` is set.
    pub fn resolve() -> io::Result<Self> {
        let root = if let Ok(custom) = std::env::var("BASECAMP_HOME") {
            let p = PathBuf::from(&custom);
            if !p.is_absolute() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "BASECAMP_HOME must be an absolute path",
                ));
            }
            p
        } else {
            let home = std::env::var("HOME").map_err(|_| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    "neither BASECAMP_HOME nor HOME environment variable is set",
                )
            })?;
            PathBuf::from(home).join(".basecamp")
        };

        Ok(Self { root })
    }

    /// Create from an explicit path (useful for testing).
    #[must_use]
    pub fn from_path(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Ensure the directory structure exists with secure permissions.
    ///
    /// Creates `state/`, `logs/`, and `templates/` and sets them to `0o700`
    /// on Unix (owner-only access, since `state/` may hold provider cost
    /// data and project membership).
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation or permission setting fails.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.state_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        std::fs::create_dir_all(self.user_templates_dir())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            std::fs::set_permissions(self.root(), perms.clone())?;
            std::fs::set_permissions(self.state_dir(), perms.clone())?;
            std::fs::set_permissions(self.logs_dir(), perms)?;
        }
        Ok(())
    }

    /// Root directory path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persistent state store directory (`~/.basecamp/state/`).
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }

    /// Daemon log directory (`~/.basecamp/logs/`).
    #[must_use]
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// User-level template search directory (`~/.basecamp/templates/`).
    #[must_use]
    pub fn user_templates_dir(&self) -> PathBuf {
        self.root.join("templates")
    }

    /// System-level template search directory (`/etc/basecamp/templates/`).
    #[must_use]
    pub fn system_templates_dir(&self) -> PathBuf {
        PathBuf::from("/etc/basecamp/templates")
    }

    /// Path to the user configuration layer (`~/.basecamp/config.toml`).
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Path to the system configuration layer (`/etc/basecamp/config.toml`).
    #[must_use]
    pub fn system_config_path(&self) -> PathBuf {
        PathBuf::from("/etc/basecamp/config.toml")
    }

    /// Path to the PID file written on startup.
    #[must_use]
    pub fn pid_path(&self) -> PathBuf {
        self.root.join("daemon.pid")
    }
}
