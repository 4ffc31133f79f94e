//! Cloud provider abstraction for the research-workstation orchestrator.
//!
//! Exposes a capability set — VM lifecycle, shared/workspace volume
//! lifecycle, image management, cost queries — rather than a leaky cloud
//! SDK. Callers hold an `Arc<dyn CloudProvider>`; [`HttpCloudProvider`] is
//! the production implementation, stubbed against a generic cloud REST
//! control plane. The in-memory test double, `FakeProvider`, lives in
//! `basecamp-test` alongside the other test fixtures.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod error;
pub mod http;
pub mod prelude;
pub mod provider;
pub mod types;

pub use error::{ProviderError, ProviderResult};
pub use http::{HttpCloudProvider, HttpProviderConfig};
pub use provider::{CloudProvider, OperationHandle, OperationStatus};
pub use types::{
    CostWindow, LaunchVmSpec, SharedVolumeSpec, TagSelector, VmDescription, VmHandle, VmState,
    WorkspaceVolumeSpec,
};
