//! Request echo and response metadata.

use chrono::{DateTime, Utc};

use super::pivot::Pivot;
use super::types::{
    AggregationRequest, DynamicsMetadata, FluidType, ResponseMetadata, Unit,
};

/// Reporting unit per fluid, indexed by [`FluidType::index`].
const UNIT_BY_FLUID: [Unit; FluidType::ALL.len()] = [
    Unit::ThousandCubicMetres, // gas
    Unit::Tonnes,              // oil
    Unit::Tonnes,              // condensate
];

pub fn unit_for(fluid: FluidType) -> Unit {
    UNIT_BY_FLUID[fluid.index()]
}

pub fn build_metadata(
    request: &AggregationRequest,
    pivot: &Pivot,
    generated_at: DateTime<Utc>,
) -> DynamicsMetadata {
    DynamicsMetadata {
        request: request.clone(),
        response: ResponseMetadata {
            total_fields: pivot.fields.len(),
            total_periods: pivot.period_keys.len(),
            unit: unit_for(request.fluid_type),
            generated_at,
        },
    }
}
