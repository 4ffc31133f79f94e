//! Idle/hibernation policy catalog.
//!
//! Policies are named, store-backed documents; workspaces and projects
//! reference one by [`IdlePolicyId`]. Scanning workspaces against their
//! resolved policy happens in the background idle scan loop, not here.

use axum::Json;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use basecamp_core::OrchestratorError;
use basecamp_core::ids::IdlePolicyId;
use basecamp_storage::{IdlePolicy, IdleSchedule, SCHEMA_VERSION};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

async fn find_policy(state: &AppState, name: &str) -> Result<IdlePolicy, ApiError> {
    state
        .store
        .list_all_idle_policies()
        .await?
        .into_iter()
        .find(|p| p.name == name)
        .ok_or_else(|| OrchestratorError::not_found("idle_policy", name).into())
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<IdlePolicy>>, ApiError> {
    Ok(Json(state.store.list_all_idle_policies().await?))
}

#[derive(Debug, Deserialize)]
struct CreatePolicyBody {
    name: String,
    schedules: Vec<IdleSchedule>,
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreatePolicyBody>,
) -> Result<Json<IdlePolicy>, ApiError> {
    if state.store.list_all_idle_policies().await?.iter().any(|p| p.name == body.name) {
        return Err(OrchestratorError::conflict("idle_policy", "a policy with this name already exists").into());
    }

    let policy =
        IdlePolicy { schema_version: SCHEMA_VERSION, id: IdlePolicyId::new(), name: body.name, schedules: body.schedules };
    state.store.put_idle_policy(&policy).await?;
    tracing::info!(policy = %policy.id, "idle policy created");
    Ok(Json(policy))
}

async fn get_one(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<IdlePolicy>, ApiError> {
    Ok(Json(find_policy(&state, &name).await?))
}

#[derive(Debug, Deserialize)]
struct ReplaceSchedulesBody {
    schedules: Vec<IdleSchedule>,
}

async fn update(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<ReplaceSchedulesBody>,
) -> Result<Json<IdlePolicy>, ApiError> {
    let mut policy = find_policy(&state, &name).await?;
    policy.schedules = body.schedules;
    state.store.put_idle_policy(&policy).await?;
    Ok(Json(policy))
}

async fn delete(State(state): State<AppState>, Path(name): Path<String>) -> Result<(), ApiError> {
    let policy = find_policy(&state, &name).await?;
    state.store.delete_idle_policy(policy.id).await?;
    tracing::info!(policy = %policy.id, "idle policy deleted");
    Ok(())
}

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/idle/policies", get(list).post(create))
        .route(
            "/idle/policies/{name}",
            get(get_one).put(update).delete(delete),
        )
}
