mod util;

use std::cell::Cell;

use chrono::Utc;
use production_dynamics::dynamics::{
    AggregationRequest, Amount, BucketSize, DepositComplex, DynamicsEngine, DynamicsError,
    FactFilterSpec, FluidType, ProductionFact, Unit, validate_result,
};
use production_dynamics::store::{FactStore, MemoryFactStore};
use util::{TestTracing, d, reference_memory, reference_sqlite};

const A_YEAR: f64 = 12_780.0;
const B_YEAR: f64 = 10_224.0;

fn three_years() -> AggregationRequest {
    AggregationRequest::new(d(2021, 1, 1), d(2023, 12, 31)).with_bucket(BucketSize::Year)
}

#[test]
fn reference_dataset_by_year() {
    let (store, ids) = reference_sqlite();
    let result = DynamicsEngine::new()
        .run(&store, &three_years())
        .expect("run");

    assert_eq!(result.period_keys, vec!["2021", "2022", "2023"]);
    assert_eq!(result.fields.len(), 2);
    assert_eq!(result.fields[0].field_id, ids.field_a);
    assert_eq!(result.fields[0].field_name, "Field A");
    assert_eq!(result.fields[0].amounts, vec![A_YEAR; 3]);
    let b = result.field(ids.field_b).expect("field B series");
    assert_eq!(b.amounts, vec![B_YEAR; 3]);
    assert!(result.field(ids.field_b + 100).is_none());
    assert_eq!(result.total.amounts, vec![A_YEAR + B_YEAR; 3]);
    for i in 0..3 {
        assert!(result.fields[0].amounts[i] > result.fields[1].amounts[i]);
    }

    let meta = &result.metadata.response;
    assert_eq!(meta.total_fields, 2);
    assert_eq!(meta.total_periods, 3);
    assert_eq!(meta.unit, Unit::ThousandCubicMetres);
    assert!(validate_result(&result).all_ok());
}

#[test]
fn memory_and_sqlite_stores_agree() {
    let (sqlite, _) = reference_sqlite();
    let (memory, _) = reference_memory();
    let engine = DynamicsEngine::new();
    for bucket in [BucketSize::Month, BucketSize::Quarter, BucketSize::Year] {
        let req = three_years().with_bucket(bucket);
        let a = engine.run(&sqlite, &req).expect("sqlite");
        let b = engine.run(&memory, &req).expect("memory");
        assert_eq!(a.period_keys, b.period_keys, "{bucket}");
        assert_eq!(a.fields, b.fields, "{bucket}");
        assert_eq!(a.total, b.total, "{bucket}");
    }
}

#[test]
fn quarter_keys_and_sums() {
    let (store, _) = reference_sqlite();
    let req = AggregationRequest::new(d(2022, 1, 1), d(2022, 12, 31))
        .with_bucket(BucketSize::Quarter);
    let result = DynamicsEngine::new().run(&store, &req).expect("run");
    assert_eq!(
        result.period_keys,
        vec!["2022-Q1", "2022-Q2", "2022-Q3", "2022-Q4"]
    );
    // A in Q1: 1010 + 1020 + 1030.
    assert_eq!(result.fields[0].amounts[0], 3060.0);
    let sum: f64 = result.fields[0].amounts.iter().sum();
    assert_eq!(sum, A_YEAR);
}

#[test]
fn month_keys_span_the_range() {
    let (store, _) = reference_sqlite();
    let req = three_years().with_bucket(BucketSize::Month);
    let result = DynamicsEngine::new().run(&store, &req).expect("run");
    assert_eq!(result.period_keys.len(), 36);
    assert_eq!(result.period_keys[0], "2021-01");
    assert_eq!(result.period_keys[35], "2023-12");
    assert_eq!(result.fields[1].amounts[11], 896.0);
}

#[test]
fn field_id_filter_keeps_one_series() {
    let (store, ids) = reference_sqlite();
    let req = three_years().with_field_ids(vec![ids.field_a]);
    let result = DynamicsEngine::new().run(&store, &req).expect("run");
    assert_eq!(result.fields.len(), 1);
    assert_eq!(result.fields[0].field_id, ids.field_a);
    assert_eq!(result.total.amounts, result.fields[0].amounts);
}

#[test]
fn deposit_complex_filter_keeps_carrier_only() {
    let (store, ids) = reference_sqlite();
    let req = three_years().with_deposit_complexes(vec![DepositComplex::Turonian]);
    let result = DynamicsEngine::new().run(&store, &req).expect("run");
    assert_eq!(result.fields.len(), 1);
    assert_eq!(result.fields[0].field_id, ids.field_b);

    let none = three_years().with_deposit_complexes(vec![DepositComplex::Achimov]);
    let result = DynamicsEngine::new().run(&store, &none).expect("run");
    assert!(result.is_empty());
}

#[test]
fn other_fluid_is_empty_with_tonnes_unit() {
    let (store, _) = reference_sqlite();
    let req = three_years().with_fluid(FluidType::Oil);
    let result = DynamicsEngine::new().run(&store, &req).expect("run");
    assert!(result.is_empty());
    assert!(result.period_keys.is_empty());
    assert_eq!(result.metadata.response.unit, Unit::Tonnes);
}

#[test]
fn partial_range_only_counts_included_months() {
    let (store, _) = reference_sqlite();
    let req = AggregationRequest::new(d(2021, 11, 15), d(2022, 1, 31));
    let result = DynamicsEngine::new().run(&store, &req).expect("run");
    // 2021-11-01 is before the range; December 2021 and January 2022 remain.
    assert_eq!(result.period_keys, vec!["2021", "2022"]);
    assert_eq!(result.fields[0].amounts, vec![1120.0, 1010.0]);
}

struct RecordingStore {
    inner: MemoryFactStore,
    calls: Cell<usize>,
}

impl FactStore for RecordingStore {
    fn fetch_facts(
        &self,
        spec: &FactFilterSpec,
    ) -> production_dynamics::dynamics::DynamicsResult<Vec<ProductionFact>> {
        self.calls.set(self.calls.get() + 1);
        self.inner.fetch_facts(spec)
    }
}

#[test]
fn inverted_range_is_rejected_before_fetch() {
    let (inner, _) = reference_memory();
    let store = RecordingStore {
        inner,
        calls: Cell::new(0),
    };
    let req = AggregationRequest::new(d(2023, 1, 1), d(2021, 1, 1));
    let err = DynamicsEngine::new().run(&store, &req).unwrap_err();
    assert!(matches!(err, DynamicsError::Validation(_)));
    assert_eq!(store.calls.get(), 0);
}

#[test]
fn repeated_requests_are_identical() {
    let (store, _) = reference_sqlite();
    let engine = DynamicsEngine::new();
    let req = three_years().with_bucket(BucketSize::Quarter);
    let first = engine.run(&store, &req).expect("first");
    let second = engine.run(&store, &req).expect("second");
    assert_eq!(first.period_keys, second.period_keys);
    assert_eq!(first.fields, second.fields);
    assert_eq!(first.total, second.total);
}

/// Store that ignores the filter and leaks a condensate fact.
struct LeakyStore {
    inner: MemoryFactStore,
}

impl FactStore for LeakyStore {
    fn fetch_facts(
        &self,
        spec: &FactFilterSpec,
    ) -> production_dynamics::dynamics::DynamicsResult<Vec<ProductionFact>> {
        let mut facts = self.inner.fetch_facts(spec)?;
        facts.push(ProductionFact {
            field_id: 99,
            field_name: "Stray".into(),
            development_object_id: 99,
            fluid_type: FluidType::Condensate,
            date: d(2022, 6, 1),
            amount: Amount::from_f64(5_000.0).expect("amount"),
            unit: "т".into(),
        });
        Ok(facts)
    }
}

#[test]
fn foreign_fluid_from_store_does_not_change_result() {
    let (clean, _) = reference_memory();
    let (inner, _) = reference_memory();
    let leaky = LeakyStore { inner };
    let engine = DynamicsEngine::new();
    let now = Utc::now();

    let expected = engine.run_at(&clean, &three_years(), now).expect("clean");
    let tracing = TestTracing::new();
    let _guard = tracing.install();
    let actual = engine.run_at(&leaky, &three_years(), now).expect("leaky");

    assert_eq!(actual, expected);
    tracing.assert_contains("ignored facts outside the requested filter");
}

#[test]
fn run_logs_request_and_completion() {
    let (store, _) = reference_memory();
    let tracing = TestTracing::new();
    let _guard = tracing.install();
    DynamicsEngine::new()
        .run(&store, &three_years())
        .expect("run");
    tracing.assert_contains("computing production dynamics");
    tracing.assert_contains("production dynamics ready");
}
