//! REST API surface: one submodule per resource, plus
//! [`build_router`] wiring them onto a single [`axum::Router`].

mod events;
mod idle;
mod projects;
mod system;
mod templates;
mod volumes;
mod workspaces;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full router over `state`. Every handler receives a clone
/// of `state` through axum's `State` extractor.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(system::router())
        .merge(templates::router())
        .merge(workspaces::router())
        .merge(volumes::router())
        .merge(projects::router())
        .merge(idle::router())
        .merge(events::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
