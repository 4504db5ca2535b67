//! Single-pass accumulation of production facts into per-(field, period) sums.

use rustc_hash::FxHashMap;
use tracing::warn;

use super::bucketing::{self, BucketStrategy, PeriodKey};
use super::filter::FactFilterSpec;
use super::types::{Amount, BucketSize, ProductionFact};

/// Sums keyed by `(field_id, period_key)` plus the display name of every field.
#[derive(Debug, Default)]
pub struct Accumulated {
    pub sums: FxHashMap<(i64, PeriodKey), Amount>,
    pub field_names: FxHashMap<i64, String>,
    /// Facts added to a sum.
    pub accepted: usize,
    /// Facts the store should not have returned.
    pub rejected: usize,
}

/// Accumulator for one request.
///
/// Facts may arrive in any order. A fact outside the request's date range,
/// fluid, or field list is a storage-layer contract violation: it is logged
/// and left out of every sum.
pub struct Aggregator<'a> {
    spec: &'a FactFilterSpec,
    strategy: &'static BucketStrategy,
    acc: Accumulated,
}

impl<'a> Aggregator<'a> {
    pub fn new(spec: &'a FactFilterSpec, bucket: BucketSize) -> Self {
        Self {
            spec,
            strategy: bucketing::strategy(bucket),
            acc: Accumulated::default(),
        }
    }

    pub fn push(&mut self, fact: &ProductionFact) {
        if !self.spec.admits(fact) {
            warn!(
                field_id = fact.field_id,
                development_object_id = fact.development_object_id,
                fluid_type = %fact.fluid_type,
                date = %fact.date,
                expected_fluid = %self.spec.fluid_type,
                "storage returned a fact outside the requested filter; skipping"
            );
            self.acc.rejected += 1;
            return;
        }

        let key = self.strategy.period_key(fact.date);
        *self.acc.sums.entry((fact.field_id, key)).or_default() += fact.amount;
        self.acc
            .field_names
            .entry(fact.field_id)
            .or_insert_with(|| fact.field_name.clone());
        self.acc.accepted += 1;
    }

    pub fn extend<'f, I>(&mut self, facts: I)
    where
        I: IntoIterator<Item = &'f ProductionFact>,
    {
        for fact in facts {
            self.push(fact);
        }
    }

    pub fn finish(self) -> Accumulated {
        self.acc
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
