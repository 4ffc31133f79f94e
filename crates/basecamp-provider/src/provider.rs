//! Cloud provider trait.
//!
//! Exposes a capability set, not a leaky SDK: VM lifecycle, shared and
//! workspace volume lifecycle, image management, and cost queries. Every
//! operation takes a [`CancellationToken`]; long-running operations
//! additionally return an [`OperationHandle`] the lifecycle engine polls
//! via [`CloudProvider::poll_operation`] instead of blocking the caller
//! for the operation's full duration.

use async_trait::async_trait;
use basecamp_storage::Architecture;
use tokio_util::sync::CancellationToken;

use crate::error::ProviderResult;
use crate::types::{
    CostWindow, LaunchVmSpec, SharedVolumeSpec, TagSelector, VmDescription, VmHandle,
    WorkspaceVolumeSpec,
};

/// Opaque handle to a long-running provider operation (launch, terminate,
/// image creation). Returned immediately; progress is observed by polling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationHandle(pub String);

/// Progress of a long-running operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    /// Still in flight.
    InProgress,
    /// Completed successfully.
    Done,
    /// Failed; the error is surfaced on the next poll.
    Failed(String),
}

/// Capability set exposed by a cloud provider backend.
///
/// Implementors are expected to be cheap to clone/share: callers hold an
/// `Arc<dyn CloudProvider>` and invoke it concurrently across workspaces.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Provider name, for logging and error `provider_code` prefixes.
    fn name(&self) -> &str;

    /// Launch a new VM. Idempotent only in the sense that retrying after
    /// a timeout with the same spec and tags is safe to attempt again;
    /// the provider is not expected to deduplicate by content.
    async fn launch_vm(
        &self,
        spec: LaunchVmSpec,
        cancel: &CancellationToken,
    ) -> ProviderResult<VmHandle>;

    /// Stop a running instance. Idempotent: calling on an already-stopped
    /// instance succeeds.
    async fn stop_vm(&self, instance_id: &str, cancel: &CancellationToken) -> ProviderResult<()>;

    /// Start a stopped instance. Idempotent.
    async fn start_vm(&self, instance_id: &str, cancel: &CancellationToken) -> ProviderResult<()>;

    /// Hibernate a running instance (RAM preserved to disk by the
    /// provider). Idempotent.
    async fn hibernate_vm(
        &self,
        instance_id: &str,
        cancel: &CancellationToken,
    ) -> ProviderResult<()>;

    /// Resume a hibernated instance. Idempotent.
    async fn resume_vm(&self, instance_id: &str, cancel: &CancellationToken)
    -> ProviderResult<()>;

    /// Terminate an instance irreversibly. Idempotent.
    async fn terminate_vm(
        &self,
        instance_id: &str,
        cancel: &CancellationToken,
    ) -> ProviderResult<()>;

    /// Fetch the provider's authoritative view of an instance's state.
    async fn describe_vm(&self, instance_id: &str) -> ProviderResult<VmDescription>;

    /// Poll a handle returned by a long-running operation.
    async fn poll_operation(&self, handle: &OperationHandle) -> ProviderResult<OperationStatus>;

    /// Create a network-filesystem volume shared across workspaces.
    async fn create_shared_volume(&self, spec: SharedVolumeSpec) -> ProviderResult<String>;

    /// Delete a shared volume. The caller must ensure it has no active
    /// mounts; the provider is not required to detect this itself.
    async fn delete_shared_volume(&self, volume_id: &str) -> ProviderResult<()>;

    /// Mount a shared volume onto an instance at `path`.
    async fn mount_shared_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
        path: &str,
    ) -> ProviderResult<()>;

    /// Unmount a shared volume from an instance.
    async fn unmount_shared_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
    ) -> ProviderResult<()>;

    /// Create a block-device volume owned by a single workspace.
    async fn create_workspace_volume(&self, spec: WorkspaceVolumeSpec) -> ProviderResult<String>;

    /// Delete a workspace volume.
    async fn delete_workspace_volume(&self, volume_id: &str) -> ProviderResult<()>;

    /// Attach a workspace volume to an instance at a device path.
    async fn attach_workspace_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
        device: &str,
    ) -> ProviderResult<()>;

    /// Detach a workspace volume from an instance.
    async fn detach_workspace_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
    ) -> ProviderResult<()>;

    /// Snapshot a running or stopped instance as a reusable image, for
    /// "save workspace as template".
    async fn create_image(&self, instance_id: &str, name: &str) -> ProviderResult<String>;

    /// Query accrued provider-billed cost for the tagged resource set over
    /// `window`, for budget reconciliation.
    async fn get_cost_since(
        &self,
        tag_selector: &TagSelector,
        window: CostWindow,
    ) -> ProviderResult<f64>;

    /// Resolve a logical image family to a concrete, region- and
    /// architecture-specific image identifier.
    async fn resolve_image(
        &self,
        family: &str,
        region: &str,
        architecture: Architecture,
    ) -> ProviderResult<String>;
}

/// Blanket implementation so `Arc<dyn CloudProvider>` can be passed
/// wherever `P: CloudProvider` is required.
#[async_trait]
impl CloudProvider for std::sync::Arc<dyn CloudProvider> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn launch_vm(
        &self,
        spec: LaunchVmSpec,
        cancel: &CancellationToken,
    ) -> ProviderResult<VmHandle> {
        (**self).launch_vm(spec, cancel).await
    }

    async fn stop_vm(&self, instance_id: &str, cancel: &CancellationToken) -> ProviderResult<()> {
        (**self).stop_vm(instance_id, cancel).await
    }

    async fn start_vm(&self, instance_id: &str, cancel: &CancellationToken) -> ProviderResult<()> {
        (**self).start_vm(instance_id, cancel).await
    }

    async fn hibernate_vm(
        &self,
        instance_id: &str,
        cancel: &CancellationToken,
    ) -> ProviderResult<()> {
        (**self).hibernate_vm(instance_id, cancel).await
    }

    async fn resume_vm(
        &self,
        instance_id: &str,
        cancel: &CancellationToken,
    ) -> ProviderResult<()> {
        (**self).resume_vm(instance_id, cancel).await
    }

    async fn terminate_vm(
        &self,
        instance_id: &str,
        cancel: &CancellationToken,
    ) -> ProviderResult<()> {
        (**self).terminate_vm(instance_id, cancel).await
    }

    async fn describe_vm(&self, instance_id: &str) -> ProviderResult<VmDescription> {
        (**self).describe_vm(instance_id).await
    }

    async fn poll_operation(&self, handle: &OperationHandle) -> ProviderResult<OperationStatus> {
        (**self).poll_operation(handle).await
    }

    async fn create_shared_volume(&self, spec: SharedVolumeSpec) -> ProviderResult<String> {
        (**self).create_shared_volume(spec).await
    }

    async fn delete_shared_volume(&self, volume_id: &str) -> ProviderResult<()> {
        (**self).delete_shared_volume(volume_id).await
    }

    async fn mount_shared_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
        path: &str,
    ) -> ProviderResult<()> {
        (**self).mount_shared_volume(volume_id, instance_id, path).await
    }

    async fn unmount_shared_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
    ) -> ProviderResult<()> {
        (**self).unmount_shared_volume(volume_id, instance_id).await
    }

    async fn create_workspace_volume(&self, spec: WorkspaceVolumeSpec) -> ProviderResult<String> {
        (**self).create_workspace_volume(spec).await
    }

    async fn delete_workspace_volume(&self, volume_id: &str) -> ProviderResult<()> {
        (**self).delete_workspace_volume(volume_id).await
    }

    async fn attach_workspace_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
        device: &str,
    ) -> ProviderResult<()> {
        (**self).attach_workspace_volume(volume_id, instance_id, device).await
    }

    async fn detach_workspace_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
    ) -> ProviderResult<()> {
        (**self).detach_workspace_volume(volume_id, instance_id).await
    }

    async fn create_image(&self, instance_id: &str, name: &str) -> ProviderResult<String> {
        (**self).create_image(instance_id, name).await
    }

    async fn get_cost_since(
        &self,
        tag_selector: &TagSelector,
        window: CostWindow,
    ) -> ProviderResult<f64> {
        (**self).get_cost_since(tag_selector, window).await
    }

    async fn resolve_image(
        &self,
        family: &str,
        region: &str,
        architecture: Architecture,
    ) -> ProviderResult<String> {
        (**self).resolve_image(family, region, architecture).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_handles_compare_by_value() {
        let a = OperationHandle("op-1".into());
        let b = OperationHandle("op-1".into());
        let c = OperationHandle("op-2".into());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn operation_status_variants_are_distinct() {
        assert_ne!(OperationStatus::InProgress, OperationStatus::Done);
        assert_ne!(
            OperationStatus::Failed("boom".into()),
            OperationStatus::Failed("other".into())
        );
    }
}
