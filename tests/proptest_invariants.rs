use chrono::{Datelike, NaiveDate, Utc};
use production_dynamics::dynamics::{
    AggregationRequest, Amount, BucketSize, DynamicsEngine, FluidType, ProductionFact, PeriodKey,
    period_key, validate_result,
};
use proptest::prelude::*;

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (2019i32..=2024, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, day)| NaiveDate::from_ymd_opt(y, m, day).expect("valid date"))
}

fn fluid_strategy() -> impl Strategy<Value = FluidType> {
    prop_oneof![
        Just(FluidType::Gas),
        Just(FluidType::Oil),
        Just(FluidType::Condensate),
    ]
}

fn bucket_strategy() -> impl Strategy<Value = BucketSize> {
    prop_oneof![
        Just(BucketSize::Month),
        Just(BucketSize::Quarter),
        Just(BucketSize::Year),
    ]
}

fn fact_strategy() -> impl Strategy<Value = ProductionFact> {
    (1i64..=6, fluid_strategy(), date_strategy(), 0i64..5_000_000).prop_map(
        |(field_id, fluid_type, date, milli)| ProductionFact {
            field_id,
            field_name: format!("F{field_id}"),
            development_object_id: field_id * 10,
            fluid_type,
            date,
            amount: Amount::from_milli(milli).expect("non-negative"),
            unit: "т".into(),
        },
    )
}

fn request_strategy() -> impl Strategy<Value = AggregationRequest> {
    (date_strategy(), date_strategy(), fluid_strategy(), bucket_strategy()).prop_map(
        |(a, b, fluid, bucket)| {
            let (from, to) = if a <= b { (a, b) } else { (b, a) };
            AggregationRequest::new(from, to)
                .with_fluid(fluid)
                .with_bucket(bucket)
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn results_hold_structural_invariants(
        facts in prop::collection::vec(fact_strategy(), 0..200),
        req in request_strategy(),
    ) {
        let result = DynamicsEngine::new()
            .aggregate(&req, &facts, Utc::now())
            .expect("valid request");
        let report = validate_result(&result);
        prop_assert!(report.all_ok(), "{:?}", report.checks);
    }

    #[test]
    fn fact_order_does_not_matter(
        facts in prop::collection::vec(fact_strategy(), 0..120),
        req in request_strategy(),
    ) {
        let engine = DynamicsEngine::new();
        let now = Utc::now();
        let forward = engine.aggregate(&req, &facts, now).expect("forward");
        let backward = engine.aggregate(&req, facts.iter().rev(), now).expect("backward");
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn grand_total_matches_admitted_facts(
        facts in prop::collection::vec(fact_strategy(), 0..200),
        req in request_strategy(),
    ) {
        let result = DynamicsEngine::new()
            .aggregate(&req, &facts, Utc::now())
            .expect("valid request");
        let expected: Amount = facts
            .iter()
            .filter(|f| f.fluid_type == req.fluid_type)
            .filter(|f| req.date_from <= f.date && f.date <= req.date_to)
            .map(|f| f.amount)
            .sum();
        let actual: f64 = result.total.amounts.iter().sum();
        prop_assert!((actual - expected.to_f64()).abs() < 1e-6 * (1.0 + expected.to_f64()));
    }

    #[test]
    fn period_keys_sort_chronologically(a in date_strategy(), b in date_strategy(), bucket in bucket_strategy()) {
        let ka: PeriodKey = period_key(a, bucket);
        let kb: PeriodKey = period_key(b, bucket);
        let same_bucket = match bucket {
            BucketSize::Year => a.year() == b.year(),
            BucketSize::Quarter => a.year() == b.year() && (a.month() - 1) / 3 == (b.month() - 1) / 3,
            BucketSize::Month => a.year() == b.year() && a.month() == b.month(),
        };
        if same_bucket {
            prop_assert_eq!(ka, kb);
        } else if a < b {
            prop_assert!(ka < kb);
        } else {
            prop_assert!(ka > kb);
        }
    }
}
