//! Pricing error types.

use basecamp_core::OrchestratorError;
use thiserror::Error;

/// Errors from rate lookup and cost reconciliation.
#[derive(Debug, Error)]
pub enum PricingError {
    /// No rate is known for this `(instance_type, region, lifecycle)` tuple.
    #[error("no hourly rate known for instance_type={instance_type} region={region} lifecycle={lifecycle:?}")]
    RateUnknown {
        /// Requested instance type.
        instance_type: String,
        /// Requested region.
        region: String,
        /// Requested lifecycle mode.
        lifecycle: basecamp_storage::LifecycleMode,
    },

    /// No accumulator is tracked for the given workspace or volume.
    #[error("no cost accumulator for {kind} {id}")]
    NoAccumulator {
        /// `"workspace"` or `"volume"`.
        kind: &'static str,
        /// The entity id, rendered as a string.
        id: String,
    },

    /// The provider's cost API call failed.
    #[error("provider cost query failed: {0}")]
    Provider(#[from] basecamp_provider::ProviderError),
}

/// Result type for pricing operations.
pub type PricingResult<T> = std::result::Result<T, PricingError>;

impl From<PricingError> for OrchestratorError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::RateUnknown { instance_type, region, lifecycle } => {
                Self::InvalidArgument {
                    field: "instance_type/region/lifecycle".into(),
                    message: format!(
                        "no rate known for {instance_type} in {region} ({lifecycle:?})"
                    ),
                }
            },
            PricingError::NoAccumulator { kind, id } => Self::NotFound { kind, id },
            PricingError::Provider(source) => source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use basecamp_storage::LifecycleMode;

    #[test]
    fn rate_unknown_maps_to_invalid_argument() {
        let err = PricingError::RateUnknown {
            instance_type: "g5.2xlarge".into(),
            region: "us-east-1".into(),
            lifecycle: LifecycleMode::OnDemand,
        };
        let mapped: OrchestratorError = err.into();
        assert_eq!(mapped.code(), "invalid_argument");
    }
}
