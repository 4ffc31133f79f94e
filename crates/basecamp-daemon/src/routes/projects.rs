//! Project CRUD, membership, and budget endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::Router;
use basecamp_core::OrchestratorError;
use basecamp_core::ids::BudgetId;
use basecamp_storage::{Budget, BudgetPeriod, Project, ProjectRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::{AppState, days_elapsed_in_period};

async fn find_project(state: &AppState, name: &str) -> Result<Project, ApiError> {
    state
        .store
        .list_all_projects()
        .await?
        .into_iter()
        .find(|p| p.name == name)
        .ok_or_else(|| OrchestratorError::not_found("project", name).into())
}

#[derive(Debug, Deserialize)]
struct ListProjectsQuery {
    member: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListProjectsQuery>,
) -> Result<Json<Vec<Project>>, ApiError> {
    let projects = match query.member {
        Some(principal) => state.projects.list_projects_for(&principal).await?,
        None => state.store.list_all_projects().await?,
    };
    Ok(Json(projects))
}

#[derive(Debug, Deserialize)]
struct CreateProjectBody {
    name: String,
    owner: String,
}

async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateProjectBody>,
) -> Result<Json<Project>, ApiError> {
    let project = state.projects.create_project(body.name, body.owner).await?;
    Ok(Json(project))
}

async fn get_one(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<Project>, ApiError> {
    Ok(Json(find_project(&state, &name).await?))
}

#[derive(Debug, Deserialize)]
struct MemberBody {
    principal: String,
    role: ProjectRole,
}

async fn add_member(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<MemberBody>,
) -> Result<Json<Project>, ApiError> {
    let project = find_project(&state, &name).await?;
    let updated = state.projects.add_member(project.id, body.principal, body.role).await?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
struct ChangeRoleBody {
    role: ProjectRole,
}

async fn change_role(
    State(state): State<AppState>,
    Path((name, principal)): Path<(String, String)>,
    Json(body): Json<ChangeRoleBody>,
) -> Result<Json<Project>, ApiError> {
    let project = find_project(&state, &name).await?;
    let updated = state.projects.change_role(project.id, &principal, body.role).await?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
struct RemoveMemberQuery {
    #[serde(default)]
    force: bool,
}

async fn remove_member(
    State(state): State<AppState>,
    Path((name, principal)): Path<(String, String)>,
    Query(query): Query<RemoveMemberQuery>,
) -> Result<Json<Project>, ApiError> {
    let project = find_project(&state, &name).await?;
    let updated = state.projects.remove_member(project.id, &principal, query.force).await?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
struct PutBudgetBody {
    total_amount: f64,
    period: BudgetPeriod,
    #[serde(default)]
    monthly_cap: Option<f64>,
    #[serde(default)]
    daily_cap: Option<f64>,
    #[serde(default)]
    end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    alerts: Vec<basecamp_storage::BudgetAlert>,
    #[serde(default)]
    auto_actions: Vec<basecamp_storage::BudgetAutoAction>,
}

async fn get_budget(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<Budget>, ApiError> {
    let project = find_project(&state, &name).await?;
    let budget = state
        .store
        .find_budget_by_project(project.id)
        .await?
        .ok_or_else(|| OrchestratorError::not_found("budget", name.as_str()))?;
    Ok(Json(budget))
}

async fn put_budget(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<PutBudgetBody>,
) -> Result<Json<Budget>, ApiError> {
    let mut project = find_project(&state, &name).await?;
    let existing = state.store.find_budget_by_project(project.id).await?;
    let id = existing.as_ref().map_or_else(BudgetId::new, |b| b.id);

    let budget = Budget {
        schema_version: basecamp_storage::SCHEMA_VERSION,
        id,
        project_ref: project.id,
        total_amount: body.total_amount,
        period: body.period,
        monthly_cap: body.monthly_cap,
        daily_cap: body.daily_cap,
        end_date: body.end_date,
        alerts: body.alerts,
        auto_actions: body.auto_actions,
    };
    state.store.put_budget(&budget).await?;

    if project.budget != Some(id) {
        project.budget = Some(id);
        state.store.put_project(&project).await?;
    }
    state.budget.reset_period(project.id);
    tracing::info!(project = %project.id, budget = %budget.id, "project budget set");
    Ok(Json(budget))
}

async fn delete_budget(State(state): State<AppState>, Path(name): Path<String>) -> Result<(), ApiError> {
    let mut project = find_project(&state, &name).await?;
    if let Some(budget_id) = project.budget.take() {
        state.store.delete_budget(budget_id).await?;
        state.store.put_project(&project).await?;
        state.budget.reset_period(project.id);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ProjectedMonthlyDto {
    Projected { amount: f64 },
    InsufficientData,
}

impl From<basecamp_budget::ProjectedMonthly> for ProjectedMonthlyDto {
    fn from(value: basecamp_budget::ProjectedMonthly) -> Self {
        match value {
            basecamp_budget::ProjectedMonthly::Projected(amount) => Self::Projected { amount },
            basecamp_budget::ProjectedMonthly::InsufficientData => Self::InsufficientData,
        }
    }
}

#[derive(Debug, Serialize)]
struct BudgetStatusResponse {
    spent: f64,
    total_amount: f64,
    fraction_spent: f64,
    projected_monthly: ProjectedMonthlyDto,
    launch_blocked: bool,
}

async fn budget_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<BudgetStatusResponse>, ApiError> {
    let project = find_project(&state, &name).await?;
    let budget = state
        .store
        .find_budget_by_project(project.id)
        .await?
        .ok_or_else(|| OrchestratorError::not_found("budget", name.as_str()))?;

    let spent: f64 =
        state.store.list_workspaces_by_project(project.id).await?.iter().map(|w| w.accumulated_cost).sum();
    let elapsed = days_elapsed_in_period(budget.period, Utc::now());
    let evaluation = state.budget.evaluate(project.id, &budget, spent, elapsed);

    let fraction_spent = if budget.total_amount > 0.0 { spent / budget.total_amount } else { 0.0 };

    if evaluation.requires_prevent_launch() && !project.launch_blocked {
        let mut project = project.clone();
        project.launch_blocked = true;
        state.store.put_project(&project).await?;
    }

    Ok(Json(BudgetStatusResponse {
        spent,
        total_amount: budget.total_amount,
        fraction_spent,
        projected_monthly: evaluation.projected_monthly.into(),
        launch_blocked: project.launch_blocked || evaluation.requires_prevent_launch(),
    }))
}

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list).post(create))
        .route("/projects/{name}", get(get_one))
        .route("/projects/{name}/members", axum::routing::post(add_member))
        .route(
            "/projects/{name}/members/{principal}",
            put(change_role).delete(remove_member),
        )
        .route(
            "/projects/{name}/budget",
            get(get_budget).put(put_budget).delete(delete_budget),
        )
        .route("/projects/{name}/budget/status", get(budget_status))
}
