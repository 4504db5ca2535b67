//! Production-dynamics aggregation engine.
//!
//! Turns a filtered stream of production facts into dense, period-aligned
//! per-field series plus a cross-field total.
//!
//! # Module structure
//!
//! - [`types`] - request, result, enums, amount, error type
//! - [`bucketing`] - period keys and the bucket-size strategy table
//! - [`filter`] - fact predicate handed to the storage layer
//! - [`aggregate`] - single-pass per-(field, period) accumulation
//! - [`pivot`] - sparse-to-dense alignment and the total series
//! - [`metadata`] - request echo, counts, unit, timestamp
//! - [`engine`] - request entry point
//! - [`validate`] - structural checks over a finished result

pub mod aggregate;
pub mod bucketing;
pub mod engine;
pub mod filter;
pub mod metadata;
pub mod pivot;
pub mod types;
pub mod validate;

// Re-export the most commonly used items at the crate::dynamics level.
pub use bucketing::{PeriodKey, period_key};
pub use engine::DynamicsEngine;
pub use filter::FactFilterSpec;
pub use types::{
    AggregationRequest, AggregationResult, Amount, BucketSize, DepositComplex, DynamicsError,
    DynamicsMetadata, DynamicsResult, EnumCatalog, FieldSeries, FluidType, ProductionFact,
    ResponseMetadata, TotalSeries, Unit, enum_catalog,
};
pub use validate::{ValidationReport, validate_result};
