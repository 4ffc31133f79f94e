//! Shared and workspace storage volume endpoints.
//!
//! No component crate owns volume lifecycle end to end — it sits at the
//! seam between the state store and the cloud provider — so these
//! handlers orchestrate both directly rather than delegating to an
//! engine, the way [`basecamp_lifecycle::LifecycleEngine`] does for
//! workspaces.

use axum::Json;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Router;
use basecamp_core::OrchestratorError;
use basecamp_core::ids::{VolumeId, WorkspaceId};
use basecamp_provider::{SharedVolumeSpec, WorkspaceVolumeSpec};
use basecamp_storage::{StorageVolume, VolumeKind, VolumeMount, SCHEMA_VERSION};
use chrono::Utc;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

async fn find_volume(state: &AppState, name: &str, kind: VolumeKind) -> Result<StorageVolume, ApiError> {
    state
        .store
        .list_all_volumes()
        .await?
        .into_iter()
        .find(|v| v.kind() == kind && volume_name(v) == name)
        .ok_or_else(|| OrchestratorError::not_found("volume", name).into())
}

fn volume_name(volume: &StorageVolume) -> &str {
    match volume {
        StorageVolume::Shared { name, .. } | StorageVolume::Workspace { name, .. } => name,
    }
}

fn provider_volume_id(volume: &StorageVolume) -> &str {
    match volume {
        StorageVolume::Shared { provider_volume_id, .. }
        | StorageVolume::Workspace { provider_volume_id, .. } => provider_volume_id,
    }
}

#[derive(Debug, Deserialize)]
struct CreateSharedVolumeBody {
    name: String,
    region: String,
    #[serde(default)]
    size_bytes: Option<u64>,
}

async fn list_shared(State(state): State<AppState>) -> Result<Json<Vec<StorageVolume>>, ApiError> {
    let volumes =
        state.store.list_all_volumes().await?.into_iter().filter(|v| v.kind() == VolumeKind::Shared).collect();
    Ok(Json(volumes))
}

async fn create_shared(
    State(state): State<AppState>,
    Json(body): Json<CreateSharedVolumeBody>,
) -> Result<Json<StorageVolume>, ApiError> {
    let provider_volume_id = state
        .provider
        .create_shared_volume(SharedVolumeSpec {
            name: body.name.clone(),
            region: body.region.clone(),
            size_bytes: body.size_bytes,
        })
        .await?;

    let volume = StorageVolume::Shared {
        schema_version: SCHEMA_VERSION,
        id: VolumeId::new(),
        name: body.name,
        region: body.region,
        state: "available".to_string(),
        creation_time: Utc::now(),
        size_bytes: body.size_bytes,
        mounted_on: Vec::new(),
        provider_volume_id,
    };
    state.store.put_volume(&volume).await?;
    tracing::info!(volume_id = %volume.id(), "shared volume created");
    Ok(Json(volume))
}

async fn get_shared(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StorageVolume>, ApiError> {
    Ok(Json(find_volume(&state, &name, VolumeKind::Shared).await?))
}

async fn delete_shared(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<(), ApiError> {
    let volume = find_volume(&state, &name, VolumeKind::Shared).await?;
    if volume.has_active_attachment() {
        return Err(OrchestratorError::conflict("volume", "shared volume still has active mounts").into());
    }
    state.provider.delete_shared_volume(provider_volume_id(&volume)).await?;
    state.store.delete_volume(volume.id()).await?;
    tracing::info!(volume_id = %volume.id(), "shared volume deleted");
    Ok(())
}

#[derive(Debug, Deserialize)]
struct MountBody {
    workspace_id: WorkspaceId,
    path: String,
}

async fn mount_shared(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<MountBody>,
) -> Result<Json<StorageVolume>, ApiError> {
    let mut volume = find_volume(&state, &name, VolumeKind::Shared).await?;
    let workspace = state.store.get_workspace(body.workspace_id).await?;
    let instance_id = workspace
        .provider_instance_id
        .as_deref()
        .ok_or_else(|| OrchestratorError::PreconditionFailed { reason: "workspace has no provider instance yet".to_string() })?;

    state.provider.mount_shared_volume(provider_volume_id(&volume), instance_id, &body.path).await?;

    if let StorageVolume::Shared { mounted_on, .. } = &mut volume {
        mounted_on.push(VolumeMount { workspace_id: body.workspace_id, path: body.path });
    }
    state.store.put_volume(&volume).await?;
    Ok(Json(volume))
}

async fn unmount_shared(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<MountBody>,
) -> Result<Json<StorageVolume>, ApiError> {
    let mut volume = find_volume(&state, &name, VolumeKind::Shared).await?;
    let workspace = state.store.get_workspace(body.workspace_id).await?;
    let instance_id = workspace
        .provider_instance_id
        .as_deref()
        .ok_or_else(|| OrchestratorError::PreconditionFailed { reason: "workspace has no provider instance".to_string() })?;

    state.provider.unmount_shared_volume(provider_volume_id(&volume), instance_id).await?;

    if let StorageVolume::Shared { mounted_on, .. } = &mut volume {
        mounted_on.retain(|m| m.workspace_id != body.workspace_id);
    }
    state.store.put_volume(&volume).await?;
    Ok(Json(volume))
}

#[derive(Debug, Deserialize)]
struct CreateWorkspaceVolumeBody {
    name: String,
    region: String,
    size_gb: u32,
    volume_type: String,
    #[serde(default)]
    iops: Option<u32>,
    #[serde(default)]
    throughput: Option<u32>,
}

async fn list_workspace_volumes(
    State(state): State<AppState>,
) -> Result<Json<Vec<StorageVolume>>, ApiError> {
    let volumes = state
        .store
        .list_all_volumes()
        .await?
        .into_iter()
        .filter(|v| v.kind() == VolumeKind::Workspace)
        .collect();
    Ok(Json(volumes))
}

async fn create_workspace_volume(
    State(state): State<AppState>,
    Json(body): Json<CreateWorkspaceVolumeBody>,
) -> Result<Json<StorageVolume>, ApiError> {
    let provider_volume_id = state
        .provider
        .create_workspace_volume(WorkspaceVolumeSpec {
            name: body.name.clone(),
            region: body.region.clone(),
            size_gb: body.size_gb,
            volume_type: body.volume_type.clone(),
            iops: body.iops,
            throughput: body.throughput,
        })
        .await?;

    let volume = StorageVolume::Workspace {
        schema_version: SCHEMA_VERSION,
        id: VolumeId::new(),
        name: body.name,
        region: body.region,
        state: "available".to_string(),
        creation_time: Utc::now(),
        size_gb: body.size_gb,
        volume_type: body.volume_type,
        iops: body.iops,
        throughput: body.throughput,
        attached_to: None,
        provider_volume_id,
    };
    state.store.put_volume(&volume).await?;
    tracing::info!(volume_id = %volume.id(), "workspace volume created");
    Ok(Json(volume))
}

async fn get_workspace_volume(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<StorageVolume>, ApiError> {
    Ok(Json(find_volume(&state, &name, VolumeKind::Workspace).await?))
}

async fn delete_workspace_volume(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<(), ApiError> {
    let volume = find_volume(&state, &name, VolumeKind::Workspace).await?;
    if volume.has_active_attachment() {
        return Err(OrchestratorError::conflict("volume", "workspace volume is still attached").into());
    }
    state.provider.delete_workspace_volume(provider_volume_id(&volume)).await?;
    state.store.delete_volume(volume.id()).await?;
    tracing::info!(volume_id = %volume.id(), "workspace volume deleted");
    Ok(())
}

#[derive(Debug, Deserialize)]
struct AttachBody {
    workspace_id: WorkspaceId,
    device: String,
}

async fn attach_workspace_volume(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<AttachBody>,
) -> Result<Json<StorageVolume>, ApiError> {
    let mut volume = find_volume(&state, &name, VolumeKind::Workspace).await?;
    if volume.has_active_attachment() {
        return Err(OrchestratorError::conflict("volume", "already attached to a workspace").into());
    }
    let workspace = state.store.get_workspace(body.workspace_id).await?;
    let instance_id = workspace
        .provider_instance_id
        .as_deref()
        .ok_or_else(|| OrchestratorError::PreconditionFailed { reason: "workspace has no provider instance yet".to_string() })?;

    state.provider.attach_workspace_volume(provider_volume_id(&volume), instance_id, &body.device).await?;

    if let StorageVolume::Workspace { attached_to, .. } = &mut volume {
        *attached_to = Some(body.workspace_id);
    }
    state.store.put_volume(&volume).await?;
    Ok(Json(volume))
}

#[derive(Debug, Deserialize)]
struct DetachBody {
    workspace_id: WorkspaceId,
}

async fn detach_workspace_volume(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<DetachBody>,
) -> Result<Json<StorageVolume>, ApiError> {
    let mut volume = find_volume(&state, &name, VolumeKind::Workspace).await?;
    let workspace = state.store.get_workspace(body.workspace_id).await?;
    let instance_id = workspace
        .provider_instance_id
        .as_deref()
        .ok_or_else(|| OrchestratorError::PreconditionFailed { reason: "workspace has no provider instance".to_string() })?;

    state.provider.detach_workspace_volume(provider_volume_id(&volume), instance_id).await?;

    if let StorageVolume::Workspace { attached_to, .. } = &mut volume {
        *attached_to = None;
    }
    state.store.put_volume(&volume).await?;
    Ok(Json(volume))
}

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/volumes/shared", get(list_shared).post(create_shared))
        .route("/volumes/shared/{name}", get(get_shared).delete(delete_shared))
        .route("/volumes/shared/{name}/mount", post(mount_shared))
        .route("/volumes/shared/{name}/unmount", post(unmount_shared))
        .route("/volumes/workspace", get(list_workspace_volumes).post(create_workspace_volume))
        .route(
            "/volumes/workspace/{name}",
            get(get_workspace_volume).delete(delete_workspace_volume),
        )
        .route("/volumes/workspace/{name}/attach", post(attach_workspace_volume))
        .route("/volumes/workspace/{name}/detach", post(detach_workspace_volume))
}
