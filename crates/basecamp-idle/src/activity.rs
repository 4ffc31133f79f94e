//! The pluggable activity predicate.
//!
//! What "idle" means — which interactive/CPU/network signals, and at what
//! thresholds — is deliberately out of scope here: [`ActivityProbe`] is
//! the seam a metrics-source implementation plugs into. The engine only
//! consumes the single bit it reports per scan tick and handles the
//! debouncing itself.

use async_trait::async_trait;
use basecamp_core::ids::WorkspaceId;

use crate::error::IdleResult;

/// Reports whether a workspace is currently idle, as of this scan tick.
///
/// Implementors are expected to be cheap to share: the engine calls this
/// once per running workspace per scan, potentially many workspaces wide.
#[async_trait]
pub trait ActivityProbe: Send + Sync {
    /// Whether the workspace's observed activity is currently below the
    /// probe's configured idle thresholds.
    async fn is_idle(&self, workspace: WorkspaceId) -> IdleResult<bool>;
}

/// A probe that always reports the same answer, for tests and for
/// workspaces with no real metrics source configured.
#[derive(Debug, Clone, Copy)]
pub struct FixedActivityProbe {
    idle: bool,
}

impl FixedActivityProbe {
    /// A probe that always reports `idle`.
    #[must_use]
    pub fn always_idle() -> Self {
        Self { idle: true }
    }

    /// A probe that always reports active.
    #[must_use]
    pub fn always_active() -> Self {
        Self { idle: false }
    }
}

#[async_trait]
impl ActivityProbe for FixedActivityProbe {
    async fn is_idle(&self, _workspace: WorkspaceId) -> IdleResult<bool> {
        Ok(self.idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_idle_reports_true() {
        let probe = FixedActivityProbe::always_idle();
        assert!(probe.is_idle(WorkspaceId::new()).await.unwrap());
    }

    #[tokio::test]
    async fn always_active_reports_false() {
        let probe = FixedActivityProbe::always_active();
        assert!(!probe.is_idle(WorkspaceId::new()).await.unwrap());
    }
}
