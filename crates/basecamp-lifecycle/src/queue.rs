//! Per-workspace command serialization with `Terminate` pre-emption: at
//! most one state-changing operation per workspace runs at a time,
//! different workspaces run fully in parallel, and a `Terminate` always
//! wins over whatever else is queued behind it for that workspace.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use basecamp_core::ids::WorkspaceId;

use crate::error::{LifecycleError, LifecycleResult};

/// Owns one lock per workspace, created lazily, plus the set of
/// workspaces currently being terminated.
#[derive(Debug, Default)]
pub struct CommandQueue {
    locks: Mutex<HashMap<WorkspaceId, Arc<tokio::sync::Mutex<()>>>>,
    terminating: Mutex<HashSet<WorkspaceId>>,
}

impl CommandQueue {
    /// An empty queue with no workspace locks yet allocated.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, workspace: WorkspaceId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(locks.entry(workspace).or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))))
    }

    /// Whether a `Terminate` for `workspace` is in flight or has already
    /// run. Exposed beyond `run` so [`crate::launch`] can poll it and back
    /// off a provisioning launch rather than overwriting the termination
    /// once it lands.
    pub(crate) fn is_terminating(&self, workspace: WorkspaceId) -> bool {
        self.terminating.lock().unwrap_or_else(std::sync::PoisonError::into_inner).contains(&workspace)
    }

    /// Run `command` under `workspace`'s serialization lock.
    ///
    /// Checked once before queuing for the lock and once more after
    /// acquiring it, so a command that was already waiting when a
    /// `Terminate` for the same workspace arrived is still rejected with
    /// [`LifecycleError::Preempted`] once it wakes, rather than running
    /// after the termination it should have lost to.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Preempted`] if a `Terminate` for this
    /// workspace is in flight and `is_terminate` is false; otherwise
    /// whatever `command` itself returns.
    pub async fn run<F, Fut, T>(
        &self,
        workspace: WorkspaceId,
        is_terminate: bool,
        command: F,
    ) -> LifecycleResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = LifecycleResult<T>>,
    {
        if !is_terminate && self.is_terminating(workspace) {
            return Err(LifecycleError::Preempted(workspace));
        }

        let lock = self.lock_for(workspace);
        let _guard = lock.lock().await;

        if !is_terminate && self.is_terminating(workspace) {
            return Err(LifecycleError::Preempted(workspace));
        }
        if is_terminate {
            self.terminating.lock().unwrap_or_else(std::sync::PoisonError::into_inner).insert(workspace);
        }

        command().await
    }
}
