//! Request/response shapes for [`crate::CloudProvider`] operations.
//!
//! These are wire-adjacent shapes exchanged with the provider, not the
//! persisted entity types in `basecamp-storage` — the lifecycle engine
//! translates between the two at the boundary.

use std::collections::BTreeMap;

use basecamp_storage::{Architecture, LifecycleMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authoritative instance state as reported by the provider. Distinct
/// from `basecamp_storage::WorkspaceState` in name only; kept as its own
/// type so this crate has no upward dependency on the lifecycle engine's
/// notion of state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VmState {
    Provisioning,
    Running,
    Stopping,
    Stopped,
    Hibernating,
    Hibernated,
    Terminating,
    Terminated,
    Error,
}

/// Request to launch a new VM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchVmSpec {
    /// Resolved image identifier (from [`crate::CloudProvider::resolve_image`]
    /// or a prior [`crate::CloudProvider::create_image`]).
    pub image_ref: String,
    /// Provider-specific instance type, e.g. `"g5.2xlarge"`.
    pub instance_type: String,
    pub lifecycle: LifecycleMode,
    pub architecture: Architecture,
    pub region: String,
    /// Network/subnet placement; provider-specific identifier.
    pub network_placement: Option<String>,
    /// Provisioning script to run as instance user-data.
    pub user_data: String,
    pub tags: BTreeMap<String, String>,
}

/// Result of a successful [`crate::CloudProvider::launch_vm`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmHandle {
    pub instance_id: String,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
}

/// Authoritative description of a VM's current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmDescription {
    pub instance_id: String,
    pub state: VmState,
    pub public_ip: Option<String>,
    pub private_ip: Option<String>,
}

/// Request to create a network-filesystem volume shared across workspaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedVolumeSpec {
    pub name: String,
    pub region: String,
    pub size_bytes: Option<u64>,
}

/// Request to create a block-device volume owned by a single workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceVolumeSpec {
    pub name: String,
    pub region: String,
    pub size_gb: u32,
    pub volume_type: String,
    pub iops: Option<u32>,
    pub throughput: Option<u32>,
}

/// Selects which resources a cost query covers, by provider tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSelector {
    pub tags: BTreeMap<String, String>,
}

impl TagSelector {
    /// Select costs tagged with a single `workspace_id` tag, the common case
    /// for per-workspace reconciliation.
    #[must_use]
    pub fn for_workspace(workspace_id: impl Into<String>) -> Self {
        let mut tags = BTreeMap::new();
        tags.insert("workspace_id".to_string(), workspace_id.into());
        Self { tags }
    }
}

/// A half-open time window `[start, end)` for a cost query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_selector_for_workspace_sets_single_tag() {
        let selector = TagSelector::for_workspace("ws-123");
        assert_eq!(selector.tags.get("workspace_id"), Some(&"ws-123".to_string()));
        assert_eq!(selector.tags.len(), 1);
    }

    #[test]
    fn vm_state_roundtrips_through_json() {
        let state = VmState::Hibernated;
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, "\"hibernated\"");
        let parsed: VmState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }
}
