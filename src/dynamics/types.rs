//! Shared types for the production-dynamics engine.
//!
//! Request and result structs, the enumerated request dimensions, the
//! fixed-precision [`Amount`], and the error type used by every layer below
//! the CLI.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::bucketing::PeriodKey;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Engine and storage error.
#[derive(Debug, Error)]
pub enum DynamicsError {
    /// Malformed or contradictory request (e.g. inverted date range).
    #[error("validation error: {0}")]
    Validation(String),
    /// The request matched no production facts and the caller asked for that
    /// to be treated as absence.
    #[error("not found: {0}")]
    NotFound(String),
    /// The storage layer failed.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    /// An amount was negative, non-finite, or out of range.
    #[error("invalid amount {value}: {reason}")]
    InvalidAmount { value: String, reason: &'static str },
}

/// Convenience alias.
pub type DynamicsResult<T> = std::result::Result<T, DynamicsError>;

/// Returned by the `FromStr` impls of the request enums.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

fn parse_error(kind: &'static str, value: &str, names: &[&str]) -> ParseEnumError {
    ParseEnumError {
        kind,
        value: value.to_string(),
        expected: names.join(", "),
    }
}

// ---------------------------------------------------------------------------
// FluidType
// ---------------------------------------------------------------------------

/// Produced fluid. The Russian labels are accepted on input.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FluidType {
    #[default]
    #[serde(alias = "газ")]
    Gas,
    #[serde(alias = "нефть")]
    Oil,
    #[serde(alias = "конденсат")]
    Condensate,
}

impl FluidType {
    pub const ALL: [FluidType; 3] = [Self::Gas, Self::Oil, Self::Condensate];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gas => "gas",
            Self::Oil => "oil",
            Self::Condensate => "condensate",
        }
    }

    pub fn label_ru(&self) -> &'static str {
        match self {
            Self::Gas => "газ",
            Self::Oil => "нефть",
            Self::Condensate => "конденсат",
        }
    }

    /// Position in [`FluidType::ALL`]; used to index static lookup tables.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for FluidType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FluidType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == needle || v.label_ru() == needle)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                parse_error("fluid type", s, &names)
            })
    }
}

// ---------------------------------------------------------------------------
// DepositComplex
// ---------------------------------------------------------------------------

/// Stratigraphic complex a development object produces from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepositComplex {
    #[serde(alias = "турон")]
    Turonian,
    #[serde(alias = "сеноман")]
    Cenomanian,
    #[serde(alias = "неоком")]
    Neocomian,
    #[serde(alias = "ачимовка")]
    Achimov,
}

impl DepositComplex {
    pub const ALL: [DepositComplex; 4] = [
        Self::Turonian,
        Self::Cenomanian,
        Self::Neocomian,
        Self::Achimov,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Turonian => "turonian",
            Self::Cenomanian => "cenomanian",
            Self::Neocomian => "neocomian",
            Self::Achimov => "achimov",
        }
    }

    pub fn label_ru(&self) -> &'static str {
        match self {
            Self::Turonian => "турон",
            Self::Cenomanian => "сеноман",
            Self::Neocomian => "неоком",
            Self::Achimov => "ачимовка",
        }
    }
}

impl std::fmt::Display for DepositComplex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DepositComplex {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == needle || v.label_ru() == needle)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                parse_error("deposit complex", s, &names)
            })
    }
}

// ---------------------------------------------------------------------------
// BucketSize
// ---------------------------------------------------------------------------

/// Time-bucket granularity of the output series.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketSize {
    #[serde(alias = "месяц")]
    Month,
    #[serde(alias = "квартал")]
    Quarter,
    #[default]
    #[serde(alias = "год")]
    Year,
}

impl BucketSize {
    pub const ALL: [BucketSize; 3] = [Self::Month, Self::Quarter, Self::Year];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
        }
    }

    pub fn label_ru(&self) -> &'static str {
        match self {
            Self::Month => "месяц",
            Self::Quarter => "квартал",
            Self::Year => "год",
        }
    }
}

impl std::fmt::Display for BucketSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BucketSize {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == needle || v.label_ru() == needle)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|v| v.as_str()).collect();
                parse_error("bucket size", s, &names)
            })
    }
}

// ---------------------------------------------------------------------------
// Unit
// ---------------------------------------------------------------------------

/// Measurement unit reported for a fluid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    /// Thousand cubic metres (gas).
    #[serde(rename = "тыс. м³")]
    ThousandCubicMetres,
    /// Tonnes (oil, condensate).
    #[serde(rename = "т")]
    Tonnes,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThousandCubicMetres => "тыс. м³",
            Self::Tonnes => "т",
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// Non-negative production quantity with three decimal places, stored as
/// integer thousandths.
///
/// Integer storage keeps per-bucket sums exact regardless of the order facts
/// arrive in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);
    /// Thousandths per unit.
    pub const SCALE: i64 = 1000;

    pub fn from_milli(milli: i64) -> DynamicsResult<Self> {
        if milli < 0 {
            return Err(DynamicsError::InvalidAmount {
                value: milli.to_string(),
                reason: "amount must not be negative",
            });
        }
        Ok(Self(milli))
    }

    /// Round `value` to three decimal places.
    pub fn from_f64(value: f64) -> DynamicsResult<Self> {
        if !value.is_finite() {
            return Err(DynamicsError::InvalidAmount {
                value: value.to_string(),
                reason: "amount must be finite",
            });
        }
        if value < 0.0 {
            return Err(DynamicsError::InvalidAmount {
                value: value.to_string(),
                reason: "amount must not be negative",
            });
        }
        let scaled = (value * Self::SCALE as f64).round();
        if scaled >= i64::MAX as f64 {
            return Err(DynamicsError::InvalidAmount {
                value: value.to_string(),
                reason: "amount is too large",
            });
        }
        Self::from_milli(scaled as i64)
    }

    pub fn milli(self) -> i64 {
        self.0
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:03}", self.0 / Self::SCALE, self.0 % Self::SCALE)
    }
}

impl Serialize for Amount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

// ---------------------------------------------------------------------------
// Facts
// ---------------------------------------------------------------------------

/// One granular production measurement as handed over by the storage layer.
///
/// `field_id` and `development_object_id` are carried denormalized so the
/// engine never joins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductionFact {
    pub field_id: i64,
    pub field_name: String,
    pub development_object_id: i64,
    pub fluid_type: FluidType,
    pub date: NaiveDate,
    pub amount: Amount,
    pub unit: String,
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Engine input, produced by the boundary layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationRequest {
    /// Inclusive lower bound.
    pub date_from: NaiveDate,
    /// Inclusive upper bound.
    pub date_to: NaiveDate,
    #[serde(default)]
    pub fluid_type: FluidType,
    /// Field allow-list; `None` means every field.
    #[serde(default)]
    pub field_ids: Option<Vec<i64>>,
    /// Deposit-complex allow-list; `None` means every complex.
    #[serde(default)]
    pub deposit_complexes: Option<Vec<DepositComplex>>,
    #[serde(default)]
    pub bucket_size: BucketSize,
}

impl AggregationRequest {
    /// Unfiltered gas request over `[date_from, date_to]`, bucketed by year.
    pub fn new(date_from: NaiveDate, date_to: NaiveDate) -> Self {
        Self {
            date_from,
            date_to,
            fluid_type: FluidType::default(),
            field_ids: None,
            deposit_complexes: None,
            bucket_size: BucketSize::default(),
        }
    }

    pub fn with_fluid(mut self, fluid_type: FluidType) -> Self {
        self.fluid_type = fluid_type;
        self
    }

    pub fn with_bucket(mut self, bucket_size: BucketSize) -> Self {
        self.bucket_size = bucket_size;
        self
    }

    pub fn with_field_ids(mut self, field_ids: Vec<i64>) -> Self {
        self.field_ids = Some(field_ids);
        self
    }

    pub fn with_deposit_complexes(mut self, complexes: Vec<DepositComplex>) -> Self {
        self.deposit_complexes = Some(complexes);
        self
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Dense per-field series aligned with [`AggregationResult::period_keys`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSeries {
    pub field_id: i64,
    pub field_name: String,
    pub amounts: Vec<f64>,
}

/// Cross-field total aligned with [`AggregationResult::period_keys`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TotalSeries {
    pub amounts: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseMetadata {
    pub total_fields: usize,
    pub total_periods: usize,
    pub unit: Unit,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DynamicsMetadata {
    /// Echo of the request that produced the result.
    pub request: AggregationRequest,
    pub response: ResponseMetadata,
}

/// Engine output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub metadata: DynamicsMetadata,
    /// Ascending, one shape per request.
    pub period_keys: Vec<PeriodKey>,
    pub fields: Vec<FieldSeries>,
    pub total: TotalSeries,
}

impl AggregationResult {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, field_id: i64) -> Option<&FieldSeries> {
        self.fields.iter().find(|f| f.field_id == field_id)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::json!({"error": "serialization failed"}))
    }
}

// ---------------------------------------------------------------------------
// Enum catalog
// ---------------------------------------------------------------------------

/// Accepted values of every enumerated request parameter.
#[derive(Debug, Clone, Serialize)]
pub struct EnumCatalog {
    pub fluid_types: Vec<&'static str>,
    pub deposit_complexes: Vec<&'static str>,
    pub bucket_sizes: Vec<&'static str>,
}

pub fn enum_catalog() -> EnumCatalog {
    EnumCatalog {
        fluid_types: FluidType::ALL.iter().map(|v| v.as_str()).collect(),
        deposit_complexes: DepositComplex::ALL.iter().map(|v| v.as_str()).collect(),
        bucket_sizes: BucketSize::ALL.iter().map(|v| v.as_str()).collect(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
