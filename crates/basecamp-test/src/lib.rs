//! Shared test fixtures and fakes for the research-workstation
//! orchestrator.
//!
//! This crate provides entity builders, an in-memory `CloudProvider`
//! double, and wiring helpers for the real in-memory state store and
//! event bus, for use as a dev-dependency across the other crates.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! basecamp-test.workspace = true
//! ```
//!
//! Then use in your tests:
//!
//! ```rust,ignore
//! #[cfg(test)]
//! mod tests {
//!     use basecamp_test::{FakeProvider, test_running_workspace};
//!
//!     #[tokio::test]
//!     async fn test_hibernation_flow() {
//!         let provider = FakeProvider::new();
//!         let workspace = test_running_workspace();
//!         // ...
//!     }
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fake_provider;
pub mod fixtures;
pub mod prelude;
pub mod wiring;

pub use fake_provider::FakeProvider;
pub use fixtures::*;
pub use wiring::{test_event_bus, test_store};
