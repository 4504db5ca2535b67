//! Storage layer: where production facts come from.
//!
//! The engine only needs [`FactStore::fetch_facts`]. Stores hand facts back
//! pre-joined with the field name and carrying denormalized field and
//! development-object ids, so aggregation never joins.
//!
//! [`FactSink`] is the write side used by the demo seeder and by tests.

pub mod memory;
pub mod sqlite;

use chrono::NaiveDate;
use serde::Serialize;

use crate::dynamics::{
    Amount, DepositComplex, DynamicsResult, FactFilterSpec, FluidType, ProductionFact,
};

pub use memory::MemoryFactStore;
pub use sqlite::SqliteFactStore;

/// Read side of a fact store.
pub trait FactStore {
    /// Every fact matching `spec`, including the deposit-complex condition
    /// resolved through development objects. Order is unspecified.
    fn fetch_facts(&self, spec: &FactFilterSpec) -> DynamicsResult<Vec<ProductionFact>>;
}

/// Write side of a fact store.
pub trait FactSink {
    fn add_field(&mut self, name: &str, operator: &str) -> DynamicsResult<i64>;

    fn add_development_object(
        &mut self,
        field_id: i64,
        name: &str,
        complex: DepositComplex,
    ) -> DynamicsResult<i64>;

    /// A well of `field_id` producing a single fluid.
    fn add_well(&mut self, field_id: i64, name: &str, fluid: FluidType) -> DynamicsResult<i64>;

    /// Returns the number of facts written.
    fn add_facts(&mut self, facts: &[NewFact]) -> DynamicsResult<usize>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRecord {
    pub id: i64,
    pub name: String,
    pub operator: String,
}

/// A producing horizon of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DevelopmentObject {
    pub id: i64,
    pub name: String,
    pub field_id: i64,
    pub deposit_complex: DepositComplex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WellRecord {
    pub id: i64,
    pub name: String,
    pub field_id: i64,
    pub fluid_type: FluidType,
}

/// A fact as written; the field name is resolved by the store on read.
///
/// `well_id`, when set, must name a well of `field_id` producing
/// `fluid_type`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFact {
    pub well_id: Option<i64>,
    pub field_id: i64,
    pub development_object_id: i64,
    pub fluid_type: FluidType,
    pub date: NaiveDate,
    pub amount: Amount,
    pub unit: String,
}
