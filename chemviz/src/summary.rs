//! Summary statistics over equipment records.
//!
//! [`aggregate`] works on anything implementing [`Reading`], so the same code summarizes a batch
//! that was just parsed and records read back from the database.

use crate::ingest::EquipmentReading;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use utoipa::ToSchema;

/// The numeric and categorical fields the aggregator needs from a record
pub trait Reading {
    fn equipment_type(&self) -> &str;
    fn flowrate(&self) -> f64;
    fn pressure(&self) -> f64;
    fn temperature(&self) -> f64;
}

impl Reading for EquipmentReading {
    fn equipment_type(&self) -> &str {
        &self.equipment_type
    }

    fn flowrate(&self) -> f64 {
        self.flowrate
    }

    fn pressure(&self) -> f64 {
        self.pressure
    }

    fn temperature(&self) -> f64 {
        self.temperature
    }
}

/// Summary of a set of equipment records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Aggregate {
    /// Number of records summarized
    pub total_count: u64,
    /// Mean flowrate
    pub avg_flowrate: f64,
    /// Mean pressure
    pub avg_pressure: f64,
    /// Mean temperature
    pub avg_temperature: f64,
    /// Number of records per equipment type; counts sum to `total_count`
    pub type_distribution: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error("No data found")]
    EmptyInput,
}

/// Compute counts, means and the type distribution for a non-empty record set.
///
/// Means are plain arithmetic means over all records; defaulted zeros count like any other value.
pub fn aggregate<R: Reading>(records: &[R]) -> Result<Aggregate, AggregateError> {
    if records.is_empty() {
        return Err(AggregateError::EmptyInput);
    }

    let mut flowrate = 0.0;
    let mut pressure = 0.0;
    let mut temperature = 0.0;
    let mut type_distribution: BTreeMap<String, u64> = BTreeMap::new();

    for record in records {
        flowrate += record.flowrate();
        pressure += record.pressure();
        temperature += record.temperature();
        *type_distribution.entry(record.equipment_type().to_string()).or_default() += 1;
    }

    let count = records.len() as f64;

    Ok(Aggregate {
        total_count: records.len() as u64,
        avg_flowrate: flowrate / count,
        avg_pressure: pressure / count,
        avg_temperature: temperature / count,
        type_distribution,
    })
}
