//! Prelude module — commonly used types for convenient import.
//!
//! Use `use basecamp_provider::prelude::*;` to import all essential types.

pub use crate::{
    CloudProvider, CostWindow, HttpCloudProvider, HttpProviderConfig, LaunchVmSpec, OperationHandle,
    OperationStatus, ProviderError, ProviderResult, SharedVolumeSpec, TagSelector, VmDescription,
    VmHandle, VmState, WorkspaceVolumeSpec,
};
