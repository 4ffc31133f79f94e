//! Static `(instance_type, region, lifecycle) → hourly_rate` table.

use std::collections::BTreeMap;

use basecamp_storage::LifecycleMode;

use crate::error::{PricingError, PricingResult};

/// Lookup key for [`RateTable`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RateKey {
    instance_type: String,
    region: String,
    lifecycle_rank: u8,
}

fn lifecycle_rank(lifecycle: LifecycleMode) -> u8 {
    match lifecycle {
        LifecycleMode::OnDemand => 0,
        LifecycleMode::Spot => 1,
    }
}

/// Static compute rate table. Immutable once built; callers construct a
/// fresh table on daemon startup from a bundled price list or an
/// operator-supplied override file.
#[derive(Debug, Clone, Default)]
pub struct RateTable {
    rates: BTreeMap<RateKey, f64>,
}

impl RateTable {
    /// An empty table. Every lookup fails with [`PricingError::RateUnknown`]
    /// until entries are inserted.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Insert or overwrite a rate.
    pub fn insert(
        &mut self,
        instance_type: impl Into<String>,
        region: impl Into<String>,
        lifecycle: LifecycleMode,
        hourly_rate: f64,
    ) {
        self.rates.insert(
            RateKey {
                instance_type: instance_type.into(),
                region: region.into(),
                lifecycle_rank: lifecycle_rank(lifecycle),
            },
            hourly_rate,
        );
    }

    /// Look up the hourly rate for a tuple. Fails loudly rather than
    /// guessing — an unpriced launch must never accrue silently as free.
    pub fn rate_for(
        &self,
        instance_type: &str,
        region: &str,
        lifecycle: LifecycleMode,
    ) -> PricingResult<f64> {
        let key = RateKey {
            instance_type: instance_type.to_string(),
            region: region.to_string(),
            lifecycle_rank: lifecycle_rank(lifecycle),
        };
        self.rates.get(&key).copied().ok_or_else(|| PricingError::RateUnknown {
            instance_type: instance_type.to_string(),
            region: region.to_string(),
            lifecycle,
        })
    }

    /// A small illustrative default table covering the common CPU and GPU
    /// size classes across the region this daemon ships pre-configured
    /// for. Operators are expected to override or extend this from a
    /// bundled price list; it is not meant to track live list prices.
    #[must_use]
    pub fn bundled_defaults() -> Self {
        let mut table = Self::empty();
        let on_demand = [
            ("c6i.large", "us-east-1", 0.085),
            ("c6i.xlarge", "us-east-1", 0.17),
            ("m6i.large", "us-east-1", 0.096),
            ("m6i.2xlarge", "us-east-1", 0.384),
            ("g5.xlarge", "us-east-1", 1.006),
            ("g5.2xlarge", "us-east-1", 1.212),
            ("p4d.24xlarge", "us-east-1", 32.77),
        ];
        for (instance_type, region, rate) in on_demand {
            table.insert(instance_type, region, LifecycleMode::OnDemand, rate);
            // Spot pricing is a fraction of on-demand; a fixed 0.35x ratio
            // keeps the bundled table internally consistent without
            // claiming to track live spot markets.
            table.insert(instance_type, region, LifecycleMode::Spot, rate * 0.35);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tuple_fails_loudly() {
        let table = RateTable::empty();
        let err = table.rate_for("g5.2xlarge", "us-east-1", LifecycleMode::OnDemand).unwrap_err();
        assert!(matches!(err, PricingError::RateUnknown { .. }));
    }

    #[test]
    fn insert_then_lookup_round_trips() {
        let mut table = RateTable::empty();
        table.insert("c6i.large", "us-east-1", LifecycleMode::OnDemand, 0.085);
        let rate = table.rate_for("c6i.large", "us-east-1", LifecycleMode::OnDemand).unwrap();
        assert!((rate - 0.085).abs() < f64::EPSILON);
    }

    #[test]
    fn on_demand_and_spot_are_distinct_entries() {
        let mut table = RateTable::empty();
        table.insert("g5.xlarge", "us-east-1", LifecycleMode::OnDemand, 1.0);
        table.insert("g5.xlarge", "us-east-1", LifecycleMode::Spot, 0.35);

        let on_demand = table.rate_for("g5.xlarge", "us-east-1", LifecycleMode::OnDemand).unwrap();
        let spot = table.rate_for("g5.xlarge", "us-east-1", LifecycleMode::Spot).unwrap();
        assert!((on_demand - 1.0).abs() < f64::EPSILON);
        assert!((spot - 0.35).abs() < f64::EPSILON);
    }

    #[test]
    fn region_is_part_of_the_key() {
        let mut table = RateTable::empty();
        table.insert("c6i.large", "us-east-1", LifecycleMode::OnDemand, 0.085);
        let err =
            table.rate_for("c6i.large", "eu-west-1", LifecycleMode::OnDemand).unwrap_err();
        assert!(matches!(err, PricingError::RateUnknown { .. }));
    }

    #[test]
    fn bundled_defaults_cover_gpu_and_cpu_classes() {
        let table = RateTable::bundled_defaults();
        assert!(table.rate_for("c6i.large", "us-east-1", LifecycleMode::OnDemand).is_ok());
        assert!(table.rate_for("g5.2xlarge", "us-east-1", LifecycleMode::Spot).is_ok());
    }
}
