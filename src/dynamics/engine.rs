//! Request-level entry point tying filter, store, accumulation and pivot
//! together.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::aggregate::Aggregator;
use super::filter::FactFilterSpec;
use super::metadata::build_metadata;
use super::pivot::assemble;
use super::types::{AggregationRequest, AggregationResult, DynamicsResult, ProductionFact};
use crate::store::FactStore;

/// Stateless production-dynamics engine.
///
/// Holds no fields; one value can be shared by every request handler. All
/// working state lives inside a single [`DynamicsEngine::run`] call.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicsEngine;

impl DynamicsEngine {
    pub fn new() -> Self {
        Self
    }

    /// Validate `request`, fetch matching facts from `store` and aggregate
    /// them, stamping the result with the current time.
    pub fn run<S>(&self, store: &S, request: &AggregationRequest) -> DynamicsResult<AggregationResult>
    where
        S: FactStore + ?Sized,
    {
        self.run_at(store, request, Utc::now())
    }

    /// [`run`](Self::run) with an explicit `generated_at`.
    pub fn run_at<S>(
        &self,
        store: &S,
        request: &AggregationRequest,
        generated_at: DateTime<Utc>,
    ) -> DynamicsResult<AggregationResult>
    where
        S: FactStore + ?Sized,
    {
        let query_start = std::time::Instant::now();
        let spec = FactFilterSpec::from_request(request)?;
        info!(
            date_from = %spec.date_from,
            date_to = %spec.date_to,
            fluid_type = %spec.fluid_type,
            bucket_size = %request.bucket_size,
            field_ids = ?spec.field_ids,
            deposit_complexes = ?spec.deposit_complexes,
            "computing production dynamics"
        );

        let facts = store.fetch_facts(&spec)?;
        debug!(facts = facts.len(), "fetched production facts");

        let result = self.aggregate_with_spec(&spec, request, &facts, generated_at);
        info!(
            fields = result.metadata.response.total_fields,
            periods = result.metadata.response.total_periods,
            elapsed_ms = query_start.elapsed().as_millis() as u64,
            "production dynamics ready"
        );
        Ok(result)
    }

    /// Aggregate facts the caller already holds.
    pub fn aggregate<'f, I>(
        &self,
        request: &AggregationRequest,
        facts: I,
        generated_at: DateTime<Utc>,
    ) -> DynamicsResult<AggregationResult>
    where
        I: IntoIterator<Item = &'f ProductionFact>,
    {
        let spec = FactFilterSpec::from_request(request)?;
        Ok(self.aggregate_with_spec(&spec, request, facts, generated_at))
    }

    fn aggregate_with_spec<'f, I>(
        &self,
        spec: &FactFilterSpec,
        request: &AggregationRequest,
        facts: I,
        generated_at: DateTime<Utc>,
    ) -> AggregationResult
    where
        I: IntoIterator<Item = &'f ProductionFact>,
    {
        let mut aggregator = Aggregator::new(spec, request.bucket_size);
        aggregator.extend(facts);
        let acc = aggregator.finish();
        if acc.rejected > 0 {
            info!(
                accepted = acc.accepted,
                rejected = acc.rejected,
                "ignored facts outside the requested filter"
            );
        }

        let pivot = assemble(acc);
        let metadata = build_metadata(request, &pivot, generated_at);
        AggregationResult {
            metadata,
            period_keys: pivot.period_keys,
            fields: pivot.fields,
            total: pivot.total,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::types::{Amount, BucketSize, DynamicsError, FluidType};
    use crate::store::FactStore;
    use chrono::NaiveDate;
    use std::cell::Cell;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Store that counts fetches and hands back a fixed fact list.
    struct CountingStore {
        facts: Vec<ProductionFact>,
        fetches: Cell<usize>,
    }

    impl FactStore for CountingStore {
        fn fetch_facts(&self, _spec: &FactFilterSpec) -> DynamicsResult<Vec<ProductionFact>> {
            self.fetches.set(self.fetches.get() + 1);
            Ok(self.facts.clone())
        }
    }

    fn monthly(field_id: i64, year: i32, amount: f64) -> Vec<ProductionFact> {
        (1..=12)
            .map(|m| ProductionFact {
                field_id,
                field_name: format!("Field {field_id}"),
                development_object_id: field_id,
                fluid_type: FluidType::Gas,
                date: d(year, m, 1),
                amount: Amount::from_f64(amount).unwrap(),
                unit: "тыс. м³".into(),
            })
            .collect()
    }

    #[test]
    fn inverted_range_never_reaches_store() {
        let store = CountingStore {
            facts: monthly(1, 2021, 100.0),
            fetches: Cell::new(0),
        };
        let req = AggregationRequest::new(d(2023, 1, 1), d(2021, 1, 1));
        let err = DynamicsEngine::new().run(&store, &req).unwrap_err();
        assert!(matches!(err, DynamicsError::Validation(_)));
        assert_eq!(store.fetches.get(), 0);
    }

    #[test]
    fn month_and_year_buckets_agree() {
        let store = CountingStore {
            facts: monthly(1, 2021, 100.0),
            fetches: Cell::new(0),
        };
        let engine = DynamicsEngine::new();
        let base = AggregationRequest::new(d(2021, 1, 1), d(2021, 12, 31));

        let monthly = engine
            .run(&store, &base.clone().with_bucket(BucketSize::Month))
            .unwrap();
        assert_eq!(monthly.period_keys.len(), 12);
        assert!(monthly.fields[0].amounts.iter().all(|a| *a == 100.0));

        let yearly = engine.run(&store, &base.with_bucket(BucketSize::Year)).unwrap();
        assert_eq!(yearly.period_keys, vec!["2021"]);
        assert_eq!(yearly.fields[0].amounts, vec![1200.0]);
        assert_eq!(yearly.total.amounts, vec![1200.0]);
    }

    #[test]
    fn empty_store_gives_well_formed_result() {
        let store = CountingStore {
            facts: Vec::new(),
            fetches: Cell::new(0),
        };
        let req = AggregationRequest::new(d(2025, 1, 1), d(2025, 12, 31));
        let result = DynamicsEngine::new().run(&store, &req).unwrap();
        assert!(result.is_empty());
        assert!(result.period_keys.is_empty());
        assert!(result.total.amounts.is_empty());
        assert_eq!(result.metadata.response.total_fields, 0);
        assert_eq!(result.metadata.response.total_periods, 0);
    }

    #[test]
    fn aggregate_accepts_caller_facts() {
        let facts = monthly(4, 2022, 10.0);
        let req = AggregationRequest::new(d(2022, 1, 1), d(2022, 12, 31))
            .with_bucket(BucketSize::Quarter);
        let now = Utc::now();
        let result = DynamicsEngine::new().aggregate(&req, &facts, now).unwrap();
        assert_eq!(
            result.period_keys,
            vec!["2022-Q1", "2022-Q2", "2022-Q3", "2022-Q4"]
        );
        assert_eq!(result.fields[0].amounts, vec![30.0; 4]);
        assert_eq!(result.metadata.response.generated_at, now);
    }
}
