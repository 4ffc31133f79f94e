//! Control-plane daemon for the research-workstation orchestrator: the
//! REST API server and the three background scan loops (idle, budget,
//! cost reconciliation) that tie the other nine components into one
//! running process.
//!
//! [`state::AppState`] wires a single instance of every component crate
//! together; [`routes::build_router`] turns that state into the axum
//! [`axum::Router`] the binary serves. [`scan_loops`] owns the periodic
//! background work that would otherwise never run absent an incoming
//! request.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod error;
pub mod prelude;
pub mod routes;
pub mod scan_loops;
pub mod state;

pub use error::ApiError;
pub use state::AppState;
