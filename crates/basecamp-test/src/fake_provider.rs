//! In-memory [`CloudProvider`] double for exercising the lifecycle, idle,
//! budget, and pricing engines without a real cloud backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use basecamp_provider::{
    CloudProvider, CostWindow, LaunchVmSpec, OperationHandle, OperationStatus, ProviderError,
    ProviderResult, SharedVolumeSpec, TagSelector, VmDescription, VmHandle, VmState,
    WorkspaceVolumeSpec,
};
use basecamp_storage::Architecture;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
struct FakeInstance {
    state: VmState,
    public_ip: Option<String>,
    private_ip: Option<String>,
}

/// An in-memory cloud provider double.
///
/// Every call is appended to an internal log (`calls()`) so tests can
/// assert on the sequence of operations issued by the engine under test,
/// the same way [`basecamp_test::MockEventBus`](crate::MockEventBus)
/// captures emitted events. VM state transitions are tracked so
/// `describe_vm` reflects the effect of prior `stop_vm`/`hibernate_vm`/
/// etc. calls; cost queries and image resolution return canned values
/// that tests configure up front.
#[derive(Debug, Clone)]
pub struct FakeProvider {
    name: String,
    instances: Arc<Mutex<HashMap<String, FakeInstance>>>,
    calls: Arc<Mutex<Vec<String>>>,
    cost_since: Arc<Mutex<f64>>,
    fail_next: Arc<Mutex<Option<ProviderError>>>,
}

impl FakeProvider {
    /// Create a fake provider with no instances and a zero cost figure.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "fake".to_string(),
            instances: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            cost_since: Arc::new(Mutex::new(0.0)),
            fail_next: Arc::new(Mutex::new(None)),
        }
    }

    /// The sequence of operation names invoked so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        if let Ok(mut guard) = self.calls.lock() {
            guard.clear();
        }
    }

    /// Set the figure [`CloudProvider::get_cost_since`] will return on its
    /// next call.
    pub fn set_cost_since(&self, amount: f64) {
        if let Ok(mut guard) = self.cost_since.lock() {
            *guard = amount;
        }
    }

    /// Arrange for the very next call (of any kind) to fail with `error`,
    /// then resume succeeding normally.
    pub fn fail_next_call(&self, error: ProviderError) {
        if let Ok(mut guard) = self.fail_next.lock() {
            *guard = Some(error);
        }
    }

    fn take_scripted_failure(&self) -> Option<ProviderError> {
        self.fail_next.lock().ok().and_then(|mut g| g.take())
    }

    fn record(&self, call: impl Into<String>) {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push(call.into());
        }
    }

    fn set_state(&self, instance_id: &str, state: VmState) {
        if let Ok(mut guard) = self.instances.lock() {
            if let Some(instance) = guard.get_mut(instance_id) {
                instance.state = state;
            }
        }
    }

    fn require_instance(&self, instance_id: &str) -> ProviderResult<()> {
        let exists = self.instances.lock().map(|g| g.contains_key(instance_id)).unwrap_or(false);
        if exists {
            Ok(())
        } else {
            Err(ProviderError::NotFound { kind: "instance", id: instance_id.to_string() })
        }
    }
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CloudProvider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn launch_vm(&self, spec: LaunchVmSpec, _cancel: &CancellationToken) -> ProviderResult<VmHandle> {
        self.record("launch_vm");
        if let Some(err) = self.take_scripted_failure() {
            return Err(err);
        }
        let instance_id = format!("fake-{}", uuid::Uuid::new_v4());
        let handle = VmHandle {
            instance_id: instance_id.clone(),
            public_ip: Some("203.0.113.10".to_string()),
            private_ip: Some("10.0.0.10".to_string()),
        };
        let _ = spec;
        if let Ok(mut guard) = self.instances.lock() {
            guard.insert(
                instance_id,
                FakeInstance {
                    state: VmState::Running,
                    public_ip: handle.public_ip.clone(),
                    private_ip: handle.private_ip.clone(),
                },
            );
        }
        Ok(handle)
    }

    async fn stop_vm(&self, instance_id: &str, _cancel: &CancellationToken) -> ProviderResult<()> {
        self.record("stop_vm");
        self.require_instance(instance_id)?;
        self.set_state(instance_id, VmState::Stopped);
        Ok(())
    }

    async fn start_vm(&self, instance_id: &str, _cancel: &CancellationToken) -> ProviderResult<()> {
        self.record("start_vm");
        self.require_instance(instance_id)?;
        self.set_state(instance_id, VmState::Running);
        Ok(())
    }

    async fn hibernate_vm(&self, instance_id: &str, _cancel: &CancellationToken) -> ProviderResult<()> {
        self.record("hibernate_vm");
        self.require_instance(instance_id)?;
        self.set_state(instance_id, VmState::Hibernated);
        Ok(())
    }

    async fn resume_vm(&self, instance_id: &str, _cancel: &CancellationToken) -> ProviderResult<()> {
        self.record("resume_vm");
        self.require_instance(instance_id)?;
        self.set_state(instance_id, VmState::Running);
        Ok(())
    }

    async fn terminate_vm(&self, instance_id: &str, _cancel: &CancellationToken) -> ProviderResult<()> {
        self.record("terminate_vm");
        self.require_instance(instance_id)?;
        self.set_state(instance_id, VmState::Terminated);
        Ok(())
    }

    async fn describe_vm(&self, instance_id: &str) -> ProviderResult<VmDescription> {
        self.record("describe_vm");
        let guard = self.instances.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let instance = guard
            .get(instance_id)
            .ok_or_else(|| ProviderError::NotFound { kind: "instance", id: instance_id.to_string() })?;
        Ok(VmDescription {
            instance_id: instance_id.to_string(),
            state: instance.state,
            public_ip: instance.public_ip.clone(),
            private_ip: instance.private_ip.clone(),
        })
    }

    async fn poll_operation(&self, _handle: &OperationHandle) -> ProviderResult<OperationStatus> {
        self.record("poll_operation");
        Ok(OperationStatus::Done)
    }

    async fn create_shared_volume(&self, _spec: SharedVolumeSpec) -> ProviderResult<String> {
        self.record("create_shared_volume");
        Ok(format!("fake-vol-{}", uuid::Uuid::new_v4()))
    }

    async fn delete_shared_volume(&self, _volume_id: &str) -> ProviderResult<()> {
        self.record("delete_shared_volume");
        Ok(())
    }

    async fn mount_shared_volume(
        &self,
        _volume_id: &str,
        _instance_id: &str,
        _path: &str,
    ) -> ProviderResult<()> {
        self.record("mount_shared_volume");
        Ok(())
    }

    async fn unmount_shared_volume(&self, _volume_id: &str, _instance_id: &str) -> ProviderResult<()> {
        self.record("unmount_shared_volume");
        Ok(())
    }

    async fn create_workspace_volume(&self, _spec: WorkspaceVolumeSpec) -> ProviderResult<String> {
        self.record("create_workspace_volume");
        Ok(format!("fake-vol-{}", uuid::Uuid::new_v4()))
    }

    async fn delete_workspace_volume(&self, _volume_id: &str) -> ProviderResult<()> {
        self.record("delete_workspace_volume");
        Ok(())
    }

    async fn attach_workspace_volume(
        &self,
        _volume_id: &str,
        _instance_id: &str,
        _device: &str,
    ) -> ProviderResult<()> {
        self.record("attach_workspace_volume");
        Ok(())
    }

    async fn detach_workspace_volume(&self, _volume_id: &str, _instance_id: &str) -> ProviderResult<()> {
        self.record("detach_workspace_volume");
        Ok(())
    }

    async fn create_image(&self, _instance_id: &str, _name: &str) -> ProviderResult<String> {
        self.record("create_image");
        Ok(format!("fake-image-{}", uuid::Uuid::new_v4()))
    }

    async fn get_cost_since(&self, _tag_selector: &TagSelector, _window: CostWindow) -> ProviderResult<f64> {
        self.record("get_cost_since");
        Ok(self.cost_since.lock().map(|g| *g).unwrap_or(0.0))
    }

    async fn resolve_image(
        &self,
        family: &str,
        region: &str,
        architecture: Architecture,
    ) -> ProviderResult<String> {
        self.record("resolve_image");
        let arch = match architecture {
            Architecture::X86_64 => "x86_64",
            Architecture::Arm64 => "arm64",
        };
        Ok(format!("fake-image:{family}:{region}:{arch}"))
    }
}
