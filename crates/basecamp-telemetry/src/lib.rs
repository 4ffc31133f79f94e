//! Structured logging and request-context tracing for the orchestrator
//! daemon.
//!
//! This crate provides:
//! - Configurable `tracing-subscriber` setup with multiple formats
//! - A `RequestContext` for correlating an API request across the
//!   lifecycle/idle/budget engines it touches
//! - Integration with the `tracing` ecosystem the rest of the daemon logs
//!   through
//!
//! # Example
//!
//! ```rust,no_run
//! use basecamp_telemetry::{LogConfig, LogFormat, setup_logging, RequestContext};
//!
//! # fn main() -> Result<(), basecamp_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("basecamp_lifecycle=debug");
//!
//! setup_logging(&config)?;
//!
//! let ctx = RequestContext::new("daemon").with_operation("launch_workspace");
//! let span = ctx.span();
//! let _guard = span.enter();
//! tracing::info!("launching workspace");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::{RequestContext, RequestGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
