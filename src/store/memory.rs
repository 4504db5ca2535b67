//! In-process fact store for tests, benches and embedding callers.

use rustc_hash::FxHashMap;

use super::{DevelopmentObject, FactSink, FactStore, FieldRecord, NewFact, WellRecord};
use crate::dynamics::{
    DepositComplex, DynamicsError, DynamicsResult, FactFilterSpec, FluidType, ProductionFact,
};

#[derive(Debug, Default, Clone)]
pub struct MemoryFactStore {
    fields: Vec<FieldRecord>,
    objects: Vec<DevelopmentObject>,
    wells: Vec<WellRecord>,
    facts: Vec<ProductionFact>,
}

impl MemoryFactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[FieldRecord] {
        &self.fields
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    fn field_name(&self, field_id: i64) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.id == field_id)
            .map(|f| f.name.as_str())
    }

    fn check_well(&self, fact: &NewFact) -> DynamicsResult<()> {
        let Some(well_id) = fact.well_id else {
            return Ok(());
        };
        let well = self
            .wells
            .iter()
            .find(|w| w.id == well_id)
            .ok_or_else(|| DynamicsError::Validation(format!("unknown well id {well_id}")))?;
        if well.field_id != fact.field_id || well.fluid_type != fact.fluid_type {
            return Err(DynamicsError::Validation(format!(
                "well '{}' does not produce {} on field {}",
                well.name, fact.fluid_type, fact.field_id
            )));
        }
        Ok(())
    }
}

impl FactStore for MemoryFactStore {
    fn fetch_facts(&self, spec: &FactFilterSpec) -> DynamicsResult<Vec<ProductionFact>> {
        let complexes: FxHashMap<i64, DepositComplex> = self
            .objects
            .iter()
            .map(|o| (o.id, o.deposit_complex))
            .collect();
        Ok(self
            .facts
            .iter()
            .filter(|fact| spec.matches(fact, |id| complexes.get(&id).copied()))
            .cloned()
            .collect())
    }
}

impl FactSink for MemoryFactStore {
    fn add_field(&mut self, name: &str, operator: &str) -> DynamicsResult<i64> {
        if self.fields.iter().any(|f| f.name == name) {
            return Err(DynamicsError::Validation(format!(
                "field '{name}' already exists"
            )));
        }
        let id = self.fields.len() as i64 + 1;
        self.fields.push(FieldRecord {
            id,
            name: name.to_string(),
            operator: operator.to_string(),
        });
        Ok(id)
    }

    fn add_development_object(
        &mut self,
        field_id: i64,
        name: &str,
        complex: DepositComplex,
    ) -> DynamicsResult<i64> {
        if self.field_name(field_id).is_none() {
            return Err(DynamicsError::Validation(format!(
                "unknown field id {field_id}"
            )));
        }
        let id = self.objects.len() as i64 + 1;
        self.objects.push(DevelopmentObject {
            id,
            name: name.to_string(),
            field_id,
            deposit_complex: complex,
        });
        Ok(id)
    }

    fn add_well(&mut self, field_id: i64, name: &str, fluid: FluidType) -> DynamicsResult<i64> {
        if self.field_name(field_id).is_none() {
            return Err(DynamicsError::Validation(format!(
                "unknown field id {field_id}"
            )));
        }
        let id = self.wells.len() as i64 + 1;
        self.wells.push(WellRecord {
            id,
            name: name.to_string(),
            field_id,
            fluid_type: fluid,
        });
        Ok(id)
    }

    fn add_facts(&mut self, facts: &[NewFact]) -> DynamicsResult<usize> {
        let mut resolved = Vec::with_capacity(facts.len());
        for fact in facts {
            let field_name = self.field_name(fact.field_id).ok_or_else(|| {
                DynamicsError::Validation(format!("unknown field id {}", fact.field_id))
            })?;
            self.check_well(fact)?;
            resolved.push(ProductionFact {
                field_id: fact.field_id,
                field_name: field_name.to_string(),
                development_object_id: fact.development_object_id,
                fluid_type: fact.fluid_type,
                date: fact.date,
                amount: fact.amount,
                unit: fact.unit.clone(),
            });
        }
        let written = resolved.len();
        self.facts.extend(resolved);
        Ok(written)
    }
}
