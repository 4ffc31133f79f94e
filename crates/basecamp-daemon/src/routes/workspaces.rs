//! Workspace lifecycle endpoints: launch, list,
//! inspect, terminate, and the per-command actions that route through
//! [`basecamp_lifecycle::LifecycleEngine`].

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Router;
use basecamp_core::ids::{CheckpointId, IdlePolicyId, ProjectId, TemplateId, VolumeId, WorkspaceId};
use basecamp_core::OrchestratorError;
use basecamp_lifecycle::{ApplyRequest, LaunchRequest, LifecycleCommand, LifecycleOutcome};
use basecamp_storage::{
    Architecture, LifecycleMode, PackageManager, ServiceSpec, SizeClass, UserSpec, Workspace,
};
use basecamp_template::{ProvisioningScript, ResolvedTemplate, TemplateDiff};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct ProjectQuery {
    project: Option<ProjectId>,
}

/// Look up a workspace by name. When `project` is given the lookup is a
/// direct index hit; when omitted (the name alone may not be unique
/// across projects) it falls back to a full scan, returning the first
/// match.
async fn find_workspace(
    state: &AppState,
    project: Option<ProjectId>,
    name: &str,
) -> Result<Workspace, ApiError> {
    if let Some(project) = project {
        return state
            .store
            .find_workspace_by_name(project, name)
            .await?
            .ok_or_else(|| OrchestratorError::not_found("workspace", name).into());
    }
    state
        .store
        .list_all_workspaces()
        .await?
        .into_iter()
        .find(|w| w.name == name)
        .ok_or_else(|| OrchestratorError::not_found("workspace", name).into())
}

/// Resolve a [`TemplateId`] back to a [`ResolvedTemplate`], checking the
/// file-based resolver first (by name match) and falling back to a
/// store-saved template, which resolves to itself since it carries no
/// further inheritance.
async fn resolve_template_by_id(
    state: &AppState,
    id: TemplateId,
) -> Result<ResolvedTemplate, ApiError> {
    for name in state.templates.names() {
        if let Some(t) = state.templates.get(name) {
            if t.id == id {
                return Ok(state.templates.resolve(name, None)?);
            }
        }
    }
    let saved = state
        .store
        .get_template(id)
        .await
        .map_err(|_| OrchestratorError::not_found("template", id.to_string()))?;
    Ok(ResolvedTemplate {
        name: saved.name.clone(),
        base_image: saved.base_image,
        package_manager: saved.package_manager,
        packages: saved.packages,
        services: saved.services,
        users: saved.users,
        ports: saved.ports,
        instance_type_map: saved.instance_type_map,
        cost_per_hour_map: saved.cost_per_hour_map,
        source_chain: vec![saved.name],
    })
}

#[derive(Debug, Deserialize)]
struct LaunchWorkspaceRequest {
    name: String,
    project: ProjectId,
    template_name: String,
    size_class: SizeClass,
    architecture: Architecture,
    lifecycle: LifecycleMode,
    #[serde(default)]
    package_manager_override: Option<PackageManager>,
    region: String,
    owner_principal: String,
    #[serde(default)]
    shared_volumes: Vec<VolumeId>,
    #[serde(default)]
    workspace_volumes: Vec<VolumeId>,
    #[serde(default)]
    idle_policy_ref: Option<IdlePolicyId>,
    #[serde(default)]
    dry_run: bool,
}

impl From<LaunchWorkspaceRequest> for LaunchRequest {
    fn from(body: LaunchWorkspaceRequest) -> Self {
        Self {
            name: body.name,
            project: body.project,
            template_name: body.template_name,
            size_class: body.size_class,
            architecture: body.architecture,
            lifecycle: body.lifecycle,
            package_manager_override: body.package_manager_override,
            region: body.region,
            owner_principal: body.owner_principal,
            shared_volumes: body.shared_volumes,
            workspace_volumes: body.workspace_volumes,
            idle_policy_ref: body.idle_policy_ref,
            dry_run: body.dry_run,
        }
    }
}

#[derive(Debug, Serialize)]
struct LaunchPlanDto {
    instance_type: String,
    estimated_hourly_rate: f64,
    script_digest: String,
    shared_volumes: Vec<VolumeId>,
    workspace_volumes: Vec<VolumeId>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum LaunchResponse {
    Launched { workspace: Workspace },
    DryRunPlanned { plan: LaunchPlanDto },
}

/// `GET /workspaces?project={id}` — list workspaces, optionally scoped to
/// a project.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Vec<Workspace>>, ApiError> {
    let workspaces = match query.project {
        Some(project) => state.store.list_workspaces_by_project(project).await?,
        None => state.store.list_all_workspaces().await?,
    };
    Ok(Json(workspaces))
}

/// `POST /workspaces` — launch a new workspace.
async fn create(
    State(state): State<AppState>,
    Json(body): Json<LaunchWorkspaceRequest>,
) -> Result<Json<LaunchResponse>, ApiError> {
    let request: LaunchRequest = body.into();
    match state.lifecycle.launch(request).await? {
        LifecycleOutcome::Launched { workspace_id } => {
            let workspace = state.store.get_workspace(workspace_id).await?;
            Ok(Json(LaunchResponse::Launched { workspace }))
        },
        LifecycleOutcome::DryRunPlanned(plan) => Ok(Json(LaunchResponse::DryRunPlanned {
            plan: LaunchPlanDto {
                instance_type: plan.instance_type,
                estimated_hourly_rate: plan.estimated_hourly_rate,
                script_digest: plan.script_digest,
                shared_volumes: plan.shared_volumes,
                workspace_volumes: plan.workspace_volumes,
            },
        })),
        other => unreachable!("launch never returns a command outcome: {other:?}"),
    }
}

/// `GET /workspaces/{name}?project={id}` — fetch a workspace by name.
async fn get_one(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Workspace>, ApiError> {
    Ok(Json(find_workspace(&state, query.project, &name).await?))
}

/// `DELETE /workspaces/{name}?project={id}` — terminate a workspace.
async fn delete(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<CommandResponse>, ApiError> {
    let workspace = find_workspace(&state, query.project, &name).await?;
    let outcome = state.lifecycle.execute(workspace.id, LifecycleCommand::Terminate).await?;
    Ok(Json(outcome.into()))
}

#[derive(Debug, Serialize)]
struct PackageConflictDto {
    package: String,
    installed_version: String,
    wanted_version: String,
}

#[derive(Debug, Serialize, Default)]
struct TemplateDiffDto {
    packages_to_install: Vec<String>,
    packages_to_remove: Vec<String>,
    services_to_enable: Vec<ServiceSpec>,
    services_to_disable: Vec<ServiceSpec>,
    users_to_add: Vec<UserSpec>,
    conflicts: Vec<PackageConflictDto>,
}

impl From<TemplateDiff> for TemplateDiffDto {
    fn from(diff: TemplateDiff) -> Self {
        Self {
            packages_to_install: diff.packages_to_install,
            packages_to_remove: diff.packages_to_remove,
            services_to_enable: diff.services_to_enable,
            services_to_disable: diff.services_to_disable,
            users_to_add: diff.users_to_add,
            conflicts: diff
                .conflicts
                .into_iter()
                .map(|c| PackageConflictDto {
                    package: c.package,
                    installed_version: c.installed_version,
                    wanted_version: c.wanted_version,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ApplyPlanDto {
    diff: TemplateDiffDto,
    script: Option<ProvisioningScript>,
    checkpoint_id: Option<CheckpointId>,
}

impl From<basecamp_template::ApplyPlan> for ApplyPlanDto {
    fn from(plan: basecamp_template::ApplyPlan) -> Self {
        Self { diff: plan.diff.into(), script: plan.script, checkpoint_id: plan.checkpoint_id }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum RollbackDto {
    FullyRolledBack,
    PartiallyRolledBack { residual: TemplateDiffDto },
}

impl From<basecamp_template::RollbackOutcome> for RollbackDto {
    fn from(outcome: basecamp_template::RollbackOutcome) -> Self {
        match outcome {
            basecamp_template::RollbackOutcome::FullyRolledBack => Self::FullyRolledBack,
            basecamp_template::RollbackOutcome::PartiallyRolledBack { residual } => {
                Self::PartiallyRolledBack { residual: residual.into() }
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
enum CommandResponse {
    Stopped,
    Started,
    Hibernated { fallback_to_stop: bool },
    Resumed,
    Terminating,
    Applied { plan: ApplyPlanDto },
    RolledBack { rollback: RollbackDto },
    SavedAsTemplate { template_id: TemplateId },
}

impl From<LifecycleOutcome> for CommandResponse {
    fn from(outcome: LifecycleOutcome) -> Self {
        match outcome {
            LifecycleOutcome::Stopped => Self::Stopped,
            LifecycleOutcome::Started => Self::Started,
            LifecycleOutcome::Hibernated { fallback_to_stop } => {
                Self::Hibernated { fallback_to_stop }
            },
            LifecycleOutcome::Resumed => Self::Resumed,
            LifecycleOutcome::Terminating => Self::Terminating,
            LifecycleOutcome::Applied(plan) => Self::Applied { plan: plan.into() },
            LifecycleOutcome::RolledBack(outcome) => Self::RolledBack { rollback: outcome.into() },
            LifecycleOutcome::SavedAsTemplate { template_id } => {
                Self::SavedAsTemplate { template_id }
            },
            other @ (LifecycleOutcome::Launched { .. } | LifecycleOutcome::DryRunPlanned(_)) => {
                unreachable!("execute() never returns a launch outcome: {other:?}")
            },
        }
    }
}

async fn dispatch(
    state: &AppState,
    project: Option<ProjectId>,
    name: &str,
    command: LifecycleCommand,
) -> Result<Json<CommandResponse>, ApiError> {
    let workspace = find_workspace(state, project, name).await?;
    let outcome = state.lifecycle.execute(workspace.id, command).await?;
    Ok(Json(outcome.into()))
}

async fn start(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<CommandResponse>, ApiError> {
    dispatch(&state, query.project, &name, LifecycleCommand::Start).await
}

async fn stop(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<CommandResponse>, ApiError> {
    dispatch(&state, query.project, &name, LifecycleCommand::Stop).await
}

async fn hibernate(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<CommandResponse>, ApiError> {
    dispatch(&state, query.project, &name, LifecycleCommand::Hibernate).await
}

async fn resume(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<CommandResponse>, ApiError> {
    dispatch(&state, query.project, &name, LifecycleCommand::Resume).await
}

#[derive(Debug, Deserialize)]
struct ApplyBody {
    template_name: String,
    #[serde(default)]
    package_manager_override: Option<PackageManager>,
    #[serde(default)]
    dry_run: bool,
    #[serde(default)]
    force: bool,
}

async fn apply(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ProjectQuery>,
    Json(body): Json<ApplyBody>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = LifecycleCommand::Apply(ApplyRequest {
        template_name: body.template_name,
        package_manager_override: body.package_manager_override,
        dry_run: body.dry_run,
        force: body.force,
    });
    dispatch(&state, query.project, &name, command).await
}

#[derive(Debug, Deserialize)]
struct DiffQuery {
    project: Option<ProjectId>,
    template_name: String,
    #[serde(default)]
    package_manager_override: Option<PackageManager>,
}

/// `GET /workspaces/{name}/diff` — preview what `apply` would change
/// without touching the workspace.
async fn diff(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<DiffQuery>,
) -> Result<Json<TemplateDiffDto>, ApiError> {
    let workspace = find_workspace(&state, query.project, &name).await?;
    let target = state.templates.resolve(&query.template_name, query.package_manager_override)?;

    let current_template_ref =
        workspace.applied_template_layers.last().map_or(workspace.template_ref, |l| l.template_ref);
    let current = resolve_template_by_id(&state, current_template_ref).await?;

    Ok(Json(basecamp_template::diff::diff(&target, Some(&current)).into()))
}

#[derive(Debug, Deserialize)]
struct RollbackBody {
    checkpoint: CheckpointId,
}

async fn rollback(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ProjectQuery>,
    Json(body): Json<RollbackBody>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = LifecycleCommand::Rollback { checkpoint: body.checkpoint };
    dispatch(&state, query.project, &name, command).await
}

#[derive(Debug, Deserialize)]
struct SaveAsTemplateBody {
    new_template_name: String,
}

async fn save_as_template(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ProjectQuery>,
    Json(body): Json<SaveAsTemplateBody>,
) -> Result<Json<CommandResponse>, ApiError> {
    let command = LifecycleCommand::SaveAsTemplate { new_template_name: body.new_template_name };
    dispatch(&state, query.project, &name, command).await
}

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/workspaces", get(list).post(create))
        .route("/workspaces/{name}", get(get_one).delete(delete))
        .route("/workspaces/{name}/start", post(start))
        .route("/workspaces/{name}/stop", post(stop))
        .route("/workspaces/{name}/hibernate", post(hibernate))
        .route("/workspaces/{name}/resume", post(resume))
        .route("/workspaces/{name}/apply", post(apply))
        .route("/workspaces/{name}/diff", get(diff))
        .route("/workspaces/{name}/rollback", post(rollback))
        .route("/workspaces/{name}/save-as-template", post(save_as_template))
}
