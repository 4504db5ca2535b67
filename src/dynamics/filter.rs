//! Fact filter description handed to the storage layer.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::types::{
    AggregationRequest, DepositComplex, DynamicsError, DynamicsResult, FluidType, ProductionFact,
};

/// Years representable by the fixed-width period keys.
const MIN_YEAR: i32 = 0;
const MAX_YEAR: i32 = 9999;

/// Predicate over production facts:
/// `date ∈ [date_from, date_to] ∧ fluid_type = requested`, optionally
/// `∧ field_id ∈ field_ids`, optionally
/// `∧ development_object_id ∈ resolve(deposit_complexes)`.
///
/// Resolving complexes to development objects is the store's job; the filter
/// only carries the complex identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactFilterSpec {
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub fluid_type: FluidType,
    /// Sorted, de-duplicated.
    pub field_ids: Option<Vec<i64>>,
    /// Sorted, de-duplicated.
    pub deposit_complexes: Option<Vec<DepositComplex>>,
}

impl FactFilterSpec {
    /// Validate `request` and describe the facts it needs.
    pub fn from_request(request: &AggregationRequest) -> DynamicsResult<Self> {
        if request.date_from > request.date_to {
            return Err(DynamicsError::Validation(format!(
                "date_from ({}) must be less than or equal to date_to ({})",
                request.date_from, request.date_to
            )));
        }
        for date in [request.date_from, request.date_to] {
            if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
                return Err(DynamicsError::Validation(format!(
                    "date {date} is outside the supported years {MIN_YEAR}..={MAX_YEAR}"
                )));
            }
        }

        let field_ids = match &request.field_ids {
            Some(ids) if ids.is_empty() => {
                return Err(DynamicsError::Validation(
                    "field_ids must not be empty when given".into(),
                ));
            }
            Some(ids) => {
                let mut ids = ids.clone();
                ids.sort_unstable();
                ids.dedup();
                Some(ids)
            }
            None => None,
        };

        let deposit_complexes = match &request.deposit_complexes {
            Some(list) if list.is_empty() => {
                return Err(DynamicsError::Validation(
                    "deposit_complexes must not be empty when given".into(),
                ));
            }
            Some(list) => {
                let mut list = list.clone();
                list.sort_unstable();
                list.dedup();
                Some(list)
            }
            None => None,
        };

        Ok(Self {
            date_from: request.date_from,
            date_to: request.date_to,
            fluid_type: request.fluid_type,
            field_ids,
            deposit_complexes,
        })
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.date_from <= date && date <= self.date_to
    }

    /// The parts of the predicate checkable from the fact alone: date range,
    /// fluid type and field ids.
    pub fn admits(&self, fact: &ProductionFact) -> bool {
        self.contains_date(fact.date)
            && fact.fluid_type == self.fluid_type
            && self
                .field_ids
                .as_ref()
                .is_none_or(|ids| ids.binary_search(&fact.field_id).is_ok())
    }

    /// Full predicate. `complex_of` resolves a development object to its
    /// deposit complex; unknown objects never match a complex filter.
    pub fn matches<F>(&self, fact: &ProductionFact, complex_of: F) -> bool
    where
        F: Fn(i64) -> Option<DepositComplex>,
    {
        self.admits(fact)
            && self.deposit_complexes.as_ref().is_none_or(|list| {
                complex_of(fact.development_object_id)
                    .is_some_and(|c| list.binary_search(&c).is_ok())
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
