//! Production [`CloudProvider`] implementation stubbed against a generic
//! cloud HTTP API.
//!
//! Every cloud vendor's control-plane API shapes requests and responses
//! differently; this implementation targets a vendor-neutral REST surface
//! (`POST /v1/instances`, `POST /v1/instances/{id}:stop`, ...) that a real
//! deployment fronts with a thin per-vendor adapter. The point of this
//! type is the retry-free, structured-error request/response plumbing —
//! not vendor fidelity.

use async_trait::async_trait;
use basecamp_storage::Architecture;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{CloudProvider, OperationHandle, OperationStatus};
use crate::types::{
    CostWindow, LaunchVmSpec, SharedVolumeSpec, TagSelector, VmDescription, VmHandle, VmState,
    WorkspaceVolumeSpec,
};

/// Connection details for [`HttpCloudProvider`].
#[derive(Clone)]
pub struct HttpProviderConfig {
    /// Display name, surfaced in `CloudProvider::name` and error codes.
    pub name: String,
    /// Control-plane base URL, e.g. `https://api.cloud.example.com`.
    pub base_url: String,
    /// Bearer credential for the control-plane API.
    pub api_key: String,
}

impl std::fmt::Debug for HttpProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProviderConfig")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("has_api_key", &!self.api_key.is_empty())
            .finish()
    }
}

/// Cloud provider backed by a generic REST control plane.
pub struct HttpCloudProvider {
    client: Client,
    config: HttpProviderConfig,
}

impl HttpCloudProvider {
    /// Create a new provider client.
    #[must_use]
    pub fn new(config: HttpProviderConfig) -> Self {
        Self { client: Client::new(), config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> ProviderResult<serde_json::Value> {
        let response = builder.bearer_auth(&self.config.api_key).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            return Err(ProviderError::NotFound {
                kind: "instance",
                id: body.message.unwrap_or_default(),
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            return Err(ProviderError::Provider {
                code: body.code.unwrap_or_else(|| status.to_string()),
                message: body.message.unwrap_or_else(|| status.to_string()),
                retryable: true,
            });
        }

        if !status.is_success() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            return Err(ProviderError::Provider {
                code: body.code.unwrap_or_else(|| status.to_string()),
                message: body.message.unwrap_or_else(|| status.to_string()),
                retryable: false,
            });
        }

        response.json::<serde_json::Value>().await.map_err(ProviderError::Transport)
    }

    fn check_cancelled(cancel: &CancellationToken) -> ProviderResult<()> {
        if cancel.is_cancelled() { Err(ProviderError::Cancelled) } else { Ok(()) }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

fn parse_vm_state(raw: &str) -> VmState {
    match raw {
        "provisioning" => VmState::Provisioning,
        "running" => VmState::Running,
        "stopping" => VmState::Stopping,
        "stopped" => VmState::Stopped,
        "hibernating" => VmState::Hibernating,
        "hibernated" => VmState::Hibernated,
        "terminating" => VmState::Terminating,
        "terminated" => VmState::Terminated,
        other => {
            warn!(state = other, "unrecognized provider vm state, treating as error");
            VmState::Error
        },
    }
}

#[async_trait]
impl CloudProvider for HttpCloudProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn launch_vm(
        &self,
        spec: LaunchVmSpec,
        cancel: &CancellationToken,
    ) -> ProviderResult<VmHandle> {
        Self::check_cancelled(cancel)?;
        debug!(instance_type = %spec.instance_type, region = %spec.region, "launching vm");

        let body = json!({
            "image_ref": spec.image_ref,
            "instance_type": spec.instance_type,
            "lifecycle": spec.lifecycle,
            "architecture": spec.architecture,
            "region": spec.region,
            "network_placement": spec.network_placement,
            "user_data": spec.user_data,
            "tags": spec.tags,
        });
        let resp = self.send(self.client.post(self.url("/v1/instances")).json(&body)).await?;

        Ok(VmHandle {
            instance_id: resp["instance_id"].as_str().unwrap_or_default().to_string(),
            public_ip: resp["public_ip"].as_str().map(str::to_string),
            private_ip: resp["private_ip"].as_str().map(str::to_string),
        })
    }

    async fn stop_vm(&self, instance_id: &str, cancel: &CancellationToken) -> ProviderResult<()> {
        Self::check_cancelled(cancel)?;
        let path = format!("/v1/instances/{instance_id}:stop");
        self.send(self.client.post(self.url(&path))).await.map(|_| ())
    }

    async fn start_vm(&self, instance_id: &str, cancel: &CancellationToken) -> ProviderResult<()> {
        Self::check_cancelled(cancel)?;
        let path = format!("/v1/instances/{instance_id}:start");
        self.send(self.client.post(self.url(&path))).await.map(|_| ())
    }

    async fn hibernate_vm(
        &self,
        instance_id: &str,
        cancel: &CancellationToken,
    ) -> ProviderResult<()> {
        Self::check_cancelled(cancel)?;
        let path = format!("/v1/instances/{instance_id}:hibernate");
        self.send(self.client.post(self.url(&path))).await.map(|_| ())
    }

    async fn resume_vm(
        &self,
        instance_id: &str,
        cancel: &CancellationToken,
    ) -> ProviderResult<()> {
        Self::check_cancelled(cancel)?;
        let path = format!("/v1/instances/{instance_id}:resume");
        self.send(self.client.post(self.url(&path))).await.map(|_| ())
    }

    async fn terminate_vm(
        &self,
        instance_id: &str,
        cancel: &CancellationToken,
    ) -> ProviderResult<()> {
        Self::check_cancelled(cancel)?;
        let path = format!("/v1/instances/{instance_id}:terminate");
        self.send(self.client.post(self.url(&path))).await.map(|_| ())
    }

    async fn describe_vm(&self, instance_id: &str) -> ProviderResult<VmDescription> {
        let path = format!("/v1/instances/{instance_id}");
        let resp = self.send(self.client.get(self.url(&path))).await?;

        Ok(VmDescription {
            instance_id: instance_id.to_string(),
            state: parse_vm_state(resp["state"].as_str().unwrap_or("error")),
            public_ip: resp["public_ip"].as_str().map(str::to_string),
            private_ip: resp["private_ip"].as_str().map(str::to_string),
        })
    }

    async fn poll_operation(&self, handle: &OperationHandle) -> ProviderResult<OperationStatus> {
        let path = format!("/v1/operations/{}", handle.0);
        let resp = self.send(self.client.get(self.url(&path))).await?;

        Ok(match resp["status"].as_str().unwrap_or("in_progress") {
            "done" => OperationStatus::Done,
            "failed" => {
                OperationStatus::Failed(resp["error"].as_str().unwrap_or("unknown").to_string())
            },
            _ => OperationStatus::InProgress,
        })
    }

    async fn create_shared_volume(&self, spec: SharedVolumeSpec) -> ProviderResult<String> {
        let body = json!({ "name": spec.name, "region": spec.region, "size_bytes": spec.size_bytes });
        let resp = self.send(self.client.post(self.url("/v1/shared-volumes")).json(&body)).await?;
        Ok(resp["volume_id"].as_str().unwrap_or_default().to_string())
    }

    async fn delete_shared_volume(&self, volume_id: &str) -> ProviderResult<()> {
        let path = format!("/v1/shared-volumes/{volume_id}");
        self.send(self.client.delete(self.url(&path))).await.map(|_| ())
    }

    async fn mount_shared_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
        path: &str,
    ) -> ProviderResult<()> {
        let url_path = format!("/v1/shared-volumes/{volume_id}:mount");
        let body = json!({ "instance_id": instance_id, "path": path });
        self.send(self.client.post(self.url(&url_path)).json(&body)).await.map(|_| ())
    }

    async fn unmount_shared_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
    ) -> ProviderResult<()> {
        let url_path = format!("/v1/shared-volumes/{volume_id}:unmount");
        let body = json!({ "instance_id": instance_id });
        self.send(self.client.post(self.url(&url_path)).json(&body)).await.map(|_| ())
    }

    async fn create_workspace_volume(&self, spec: WorkspaceVolumeSpec) -> ProviderResult<String> {
        let body = json!({
            "name": spec.name,
            "region": spec.region,
            "size_gb": spec.size_gb,
            "volume_type": spec.volume_type,
            "iops": spec.iops,
            "throughput": spec.throughput,
        });
        let resp =
            self.send(self.client.post(self.url("/v1/workspace-volumes")).json(&body)).await?;
        Ok(resp["volume_id"].as_str().unwrap_or_default().to_string())
    }

    async fn delete_workspace_volume(&self, volume_id: &str) -> ProviderResult<()> {
        let path = format!("/v1/workspace-volumes/{volume_id}");
        self.send(self.client.delete(self.url(&path))).await.map(|_| ())
    }

    async fn attach_workspace_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
        device: &str,
    ) -> ProviderResult<()> {
        let url_path = format!("/v1/workspace-volumes/{volume_id}:attach");
        let body = json!({ "instance_id": instance_id, "device": device });
        self.send(self.client.post(self.url(&url_path)).json(&body)).await.map(|_| ())
    }

    async fn detach_workspace_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
    ) -> ProviderResult<()> {
        let url_path = format!("/v1/workspace-volumes/{volume_id}:detach");
        let body = json!({ "instance_id": instance_id });
        self.send(self.client.post(self.url(&url_path)).json(&body)).await.map(|_| ())
    }

    async fn create_image(&self, instance_id: &str, name: &str) -> ProviderResult<String> {
        let body = json!({ "instance_id": instance_id, "name": name });
        let resp = self.send(self.client.post(self.url("/v1/images")).json(&body)).await?;
        Ok(resp["image_id"].as_str().unwrap_or_default().to_string())
    }

    async fn get_cost_since(
        &self,
        tag_selector: &TagSelector,
        window: CostWindow,
    ) -> ProviderResult<f64> {
        let body = json!({
            "tags": tag_selector.tags,
            "start": window.start,
            "end": window.end,
        });
        let resp = self.send(self.client.post(self.url("/v1/cost:query")).json(&body)).await?;
        Ok(resp["usd"].as_f64().unwrap_or(0.0))
    }

    async fn resolve_image(
        &self,
        family: &str,
        region: &str,
        architecture: Architecture,
    ) -> ProviderResult<String> {
        let path = format!("/v1/images:resolve?family={family}&region={region}");
        let body = json!({ "architecture": architecture });
        let resp = self.send(self.client.post(self.url(&path)).json(&body)).await?;
        Ok(resp["image_id"].as_str().unwrap_or_default().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_path() {
        let provider = HttpCloudProvider::new(HttpProviderConfig {
            name: "generic".into(),
            base_url: "https://api.cloud.example.com".into(),
            api_key: "secret".into(),
        });
        assert_eq!(
            provider.url("/v1/instances/i-1"),
            "https://api.cloud.example.com/v1/instances/i-1"
        );
    }

    #[test]
    fn unrecognized_state_maps_to_error() {
        assert_eq!(parse_vm_state("running"), VmState::Running);
        assert_eq!(parse_vm_state("some-future-state"), VmState::Error);
    }

    #[test]
    fn cancelled_token_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(
            HttpCloudProvider::check_cancelled(&cancel),
            Err(ProviderError::Cancelled)
        ));
    }

    #[test]
    fn config_debug_redacts_api_key() {
        let config = HttpProviderConfig {
            name: "generic".into(),
            base_url: "https://api.cloud.example.com".into(),
            api_key: "super-secret".into(),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
    }
}
