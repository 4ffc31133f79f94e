//! Read-only access to the template catalog:
//! file-based templates discovered by the resolver, plus templates saved
//! via `save-as-template` and persisted in the state store.

use axum::Json;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use basecamp_template::{TemplateError, ResolvedTemplate};
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct TemplateSummary {
    name: String,
    description: String,
    base_image: String,
    inherits: Option<String>,
}

/// `GET /templates` — every file-based template visible after priority
/// resolution, plus every workspace-derived template saved to the store.
async fn list(State(state): State<AppState>) -> Result<Json<Vec<TemplateSummary>>, ApiError> {
    let mut names = state.templates.names();
    names.sort_unstable();
    let mut summaries: Vec<TemplateSummary> =
        names.into_iter().filter_map(|name| state.templates.get(name)).map(|t| TemplateSummary {
            name: t.name.clone(),
            description: t.description.clone(),
            base_image: t.base_image.clone(),
            inherits: t.inherits.clone(),
        }).collect();

    let saved = state.store.list_all_templates().await?;
    summaries.extend(saved.into_iter().map(|t| TemplateSummary {
        name: t.name,
        description: t.description,
        base_image: t.base_image,
        inherits: t.inherits,
    }));

    Ok(Json(summaries))
}

/// `GET /templates/{name}` — the fully inheritance-resolved template.
/// Falls back to a store-saved template (never layered, so it resolves
/// to itself) when the file-based resolver doesn't know the name.
async fn get_one(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ResolvedTemplate>, ApiError> {
    match state.templates.resolve(&name, None) {
        Ok(resolved) => Ok(Json(resolved)),
        Err(TemplateError::NotFound(_)) => {
            let saved = state
                .store
                .find_template_by_name(&name)
                .await?
                .ok_or_else(|| TemplateError::NotFound(name.clone()))?;
            let source_chain = vec![saved.name.clone()];
            Ok(Json(ResolvedTemplate {
                name: saved.name,
                base_image: saved.base_image,
                package_manager: saved.package_manager,
                packages: saved.packages,
                services: saved.services,
                users: saved.users,
                ports: saved.ports,
                instance_type_map: saved.instance_type_map,
                cost_per_hour_map: saved.cost_per_hour_map,
                source_chain,
            }))
        },
        Err(err) => Err(err.into()),
    }
}

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/templates", get(list))
        .route("/templates/{name}", get(get_one))
}
