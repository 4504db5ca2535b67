//! Deterministic demo dataset.
//!
//! Writes named fields, one development object per deposit complex a field
//! carries, and a hashed number of single-fluid wells per field. Each well
//! writes one monthly fact per object whose complex produces its fluid.
//! Turonian and Cenomanian objects produce gas only; Neocomian and Achimov
//! objects produce every fluid. Volumes decline 3% a year from `base_year`
//! and vary per series by a hash of the series coordinates, so reruns write
//! identical data.

use std::hash::{Hash, Hasher};

use chrono::{Datelike, NaiveDate};
use rustc_hash::FxHasher;
use serde::Serialize;
use tracing::{debug, info};

use crate::dynamics::metadata::unit_for;
use crate::dynamics::{Amount, DepositComplex, DynamicsError, DynamicsResult, FluidType};
use crate::store::{FactSink, NewFact};

/// Daily gas rate range per well and object, m³/day.
const GAS_DAILY_M3: (f64, f64) = (50_000.0, 800_000.0);
/// Daily oil rate range per well and object, t/day.
const OIL_DAILY_T: (f64, f64) = (20.0, 100.0);
/// Condensate yield range, g per m³ of gas.
const CONDENSATE_G_PER_M3: (f64, f64) = (50.0, 150.0);
const ANNUAL_DECLINE: f64 = 0.97;
const WELL_COUNT_SALT: u32 = u32::MAX;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedField {
    pub name: String,
    pub operator: String,
    /// How many complexes the field carries, taken in
    /// [`DepositComplex::ALL`] order.
    pub complexes: usize,
}

impl SeedField {
    pub fn new(name: &str, operator: &str, complexes: usize) -> Self {
        Self {
            name: name.to_string(),
            operator: operator.to_string(),
            complexes,
        }
    }

    fn complex_list(&self) -> &'static [DepositComplex] {
        let all: &'static [DepositComplex] = &DepositComplex::ALL;
        &all[..self.complexes.min(all.len())]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedPlan {
    pub fields: Vec<SeedField>,
    pub from_year: i32,
    pub to_year: i32,
    /// Year the decline curve starts from.
    pub base_year: i32,
    /// Inclusive range each field's well count is drawn from.
    pub wells_per_field: (usize, usize),
}

impl Default for SeedPlan {
    fn default() -> Self {
        let fields = [
            ("Северное Сияние", "НефтеГазПром", 4),
            ("Белый Медведь", "НефтеГазПром", 4),
            ("Полярная Звезда", "СевернаяЭнерго", 4),
            ("Золотая Тундра", "АрктикОйл", 3),
            ("Синий Кит", "СевернаяЭнерго", 3),
            ("Морозное Утро", "СибирьГаз", 2),
            ("Снежный Барс", "УралНефть", 2),
            ("Ледяной Дракон", "АрктикОйл", 2),
            ("Северный Ветер", "СибирьГаз", 1),
            ("Кристальное", "УралНефть", 1),
        ]
        .into_iter()
        .map(|(name, operator, complexes)| SeedField::new(name, operator, complexes))
        .collect();
        Self {
            fields,
            from_year: 2015,
            to_year: 2024,
            base_year: 2015,
            wells_per_field: (10, 50),
        }
    }
}

impl SeedPlan {
    pub fn with_years(mut self, from_year: i32, to_year: i32) -> Self {
        self.from_year = from_year;
        self.to_year = to_year;
        self
    }

    fn validate(&self) -> DynamicsResult<()> {
        if self.from_year > self.to_year {
            return Err(DynamicsError::Validation(format!(
                "from_year ({}) must not be after to_year ({})",
                self.from_year, self.to_year
            )));
        }
        if NaiveDate::from_ymd_opt(self.from_year, 1, 1).is_none()
            || NaiveDate::from_ymd_opt(self.to_year, 12, 1).is_none()
        {
            return Err(DynamicsError::Validation(format!(
                "seed years {}..={} are out of range",
                self.from_year, self.to_year
            )));
        }
        let (min_wells, max_wells) = self.wells_per_field;
        if min_wells == 0 || min_wells > max_wells {
            return Err(DynamicsError::Validation(format!(
                "wells per field range {min_wells}..={max_wells} is empty or starts at zero"
            )));
        }
        if let Some(field) = self.fields.iter().find(|f| f.complexes == 0) {
            return Err(DynamicsError::Validation(format!(
                "seed field '{}' carries no deposit complex",
                field.name
            )));
        }
        Ok(())
    }
}

/// Counts of what [`populate`] wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub fields: usize,
    pub development_objects: usize,
    pub wells: usize,
    pub facts: usize,
}

/// Fluids produced from a complex.
pub fn fluids_of(complex: DepositComplex) -> &'static [FluidType] {
    match complex {
        DepositComplex::Turonian | DepositComplex::Cenomanian => &[FluidType::Gas],
        DepositComplex::Neocomian | DepositComplex::Achimov => &FluidType::ALL,
    }
}

/// Write `plan` into `store`.
pub fn populate<S>(store: &mut S, plan: &SeedPlan) -> DynamicsResult<SeedSummary>
where
    S: FactSink + ?Sized,
{
    plan.validate()?;
    let months = production_months(plan.from_year, plan.to_year);
    let mut summary = SeedSummary::default();

    for (field_idx, field) in plan.fields.iter().enumerate() {
        let field_id = store.add_field(&field.name, &field.operator)?;
        summary.fields += 1;

        let mut objects = Vec::new();
        for complex in field.complex_list() {
            let object_name = format!("{} - {}", field.name, complex.label_ru());
            let object_id = store.add_development_object(field_id, &object_name, *complex)?;
            objects.push((object_id, *complex));
        }
        summary.development_objects += objects.len();

        let well_count = wells_for_field(field_idx, plan.wells_per_field);
        let mut facts = Vec::new();
        for well_idx in 0..well_count {
            let fluid = FluidType::ALL[well_idx % FluidType::ALL.len()];
            let well_name = format!("{}-{:03}", field.name, well_idx + 1);
            let well_id = store.add_well(field_id, &well_name, fluid)?;

            for (object_id, complex) in &objects {
                if !fluids_of(*complex).contains(&fluid) {
                    continue;
                }
                let series = SeriesKey {
                    field: field_idx,
                    well: well_idx,
                    complex: *complex,
                    fluid,
                };
                for month in &months {
                    facts.push(NewFact {
                        well_id: Some(well_id),
                        field_id,
                        development_object_id: *object_id,
                        fluid_type: fluid,
                        date: *month,
                        amount: monthly_amount(&series, *month, plan.base_year)?,
                        unit: unit_for(fluid).as_str().to_string(),
                    });
                }
            }
        }
        summary.wells += well_count;

        let written = store.add_facts(&facts)?;
        summary.facts += written;
        debug!(field = %field.name, wells = well_count, facts = written, "seeded field");
    }

    info!(
        fields = summary.fields,
        development_objects = summary.development_objects,
        wells = summary.wells,
        facts = summary.facts,
        "demo data written"
    );
    Ok(summary)
}

fn production_months(from_year: i32, to_year: i32) -> Vec<NaiveDate> {
    (from_year..=to_year)
        .flat_map(|year| (1..=12).filter_map(move |m| NaiveDate::from_ymd_opt(year, m, 1)))
        .collect()
}

#[derive(Hash)]
struct SeriesKey {
    field: usize,
    well: usize,
    complex: DepositComplex,
    fluid: FluidType,
}

/// Stable value in `[0, 1)` for a series.
fn unit_noise(series: &SeriesKey, salt: u32) -> f64 {
    let mut hasher = FxHasher::default();
    series.hash(&mut hasher);
    salt.hash(&mut hasher);
    (hasher.finish() >> 11) as f64 / (1u64 << 53) as f64
}

/// Well count for a field, drawn from `range` by a hash of the field index.
fn wells_for_field(field: usize, range: (usize, usize)) -> usize {
    let mut hasher = FxHasher::default();
    field.hash(&mut hasher);
    WELL_COUNT_SALT.hash(&mut hasher);
    let span = (range.1 - range.0 + 1) as u64;
    range.0 + (hasher.finish() % span) as usize
}

fn in_range(range: (f64, f64), t: f64) -> f64 {
    range.0 + (range.1 - range.0) * t
}

fn days_in_month(month: NaiveDate) -> f64 {
    let next = if month.month() == 12 {
        NaiveDate::from_ymd_opt(month.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(month.year(), month.month() + 1, 1)
    };
    next.map_or(30.0, |n| (n - month).num_days() as f64)
}

/// Monthly volume: gas in thousand m³, oil and condensate in tonnes.
fn monthly_amount(series: &SeriesKey, month: NaiveDate, base_year: i32) -> DynamicsResult<Amount> {
    let years = (month.year() - base_year).max(0);
    // +-5% wobble per (series, month).
    let wobble = 0.95 + 0.1 * unit_noise(series, month.ordinal());
    let decline = ANNUAL_DECLINE.powi(years) * wobble;
    let days = days_in_month(month);

    let gas_daily_m3 = in_range(GAS_DAILY_M3, unit_noise(series, 0)) * decline;
    let amount = match series.fluid {
        FluidType::Gas => gas_daily_m3 * days / 1000.0,
        FluidType::Oil => in_range(OIL_DAILY_T, unit_noise(series, 1)) * decline * days,
        FluidType::Condensate => {
            let grams_per_m3 = in_range(CONDENSATE_G_PER_M3, unit_noise(series, 2));
            gas_daily_m3 * grams_per_m3 / 1_000_000.0 * days
        }
    };
    Amount::from_f64(amount)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
