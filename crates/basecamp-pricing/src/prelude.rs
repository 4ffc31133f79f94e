//! Prelude module — commonly used types for convenient import.
//!
//! Use `use basecamp_pricing::prelude::*;` to import all essential types.

pub use crate::{
    CostAccumulator, CostAccumulatorSnapshot, PricingEngine, PricingError, PricingResult,
    RateTable, ReconciliationOutcome, StorageCostAccumulator,
};
