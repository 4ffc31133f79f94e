//! Pricing and cost accumulation for the research-workstation
//! orchestrator.
//!
//! - [`RateTable`]: the static `(instance_type, region, lifecycle) →
//!   hourly_rate` table; unknown tuples fail loudly rather than billing
//!   as free.
//! - [`CostAccumulator`]: per-workspace compute cost, advanced on every
//!   state-transition and periodic reconciliation tick, reconciled
//!   against the cloud provider's authoritative cost API.
//! - [`StorageCostAccumulator`]: per-volume storage cost, which keeps
//!   accruing independent of the parent workspace's state.
//! - [`PricingEngine`]: the component that owns the rate table and the
//!   live accumulator registries.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod accumulator;
pub mod engine;
pub mod error;
pub mod prelude;
pub mod rate_table;
pub mod storage_cost;

pub use accumulator::{CostAccumulator, CostAccumulatorSnapshot, ReconciliationOutcome};
pub use engine::PricingEngine;
pub use error::{PricingError, PricingResult};
pub use rate_table::RateTable;
pub use storage_cost::StorageCostAccumulator;
