//! Row materialization: turns raw CSV records into typed equipment readings using a
//! [`ColumnMapping`].

use super::{IngestError, schema::ColumnMapping};
use crate::types::CanonicalField;
use csv::StringRecord;

/// Placeholder for missing or blank text cells
pub const UNKNOWN_TEXT: &str = "Unknown";

/// Placeholder for missing or blank numeric cells
pub const DEFAULT_NUMERIC: f64 = 0.0;

/// One materialized equipment row, before it is stored.
///
/// `position` is the 0-based order of the row inside its upload; stored records keep it so
/// listings come back in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct EquipmentReading {
    pub position: i32,
    pub equipment_name: String,
    pub equipment_type: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

fn cell<'r>(record: &'r StringRecord, mapping: &ColumnMapping, field: CanonicalField) -> Option<&'r str> {
    mapping
        .column(field)
        .and_then(|index| record.get(index))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn text_cell(record: &StringRecord, mapping: &ColumnMapping, field: CanonicalField) -> String {
    cell(record, mapping, field).unwrap_or(UNKNOWN_TEXT).to_string()
}

fn numeric_cell(
    record: &StringRecord,
    mapping: &ColumnMapping,
    field: CanonicalField,
    row: usize,
) -> Result<f64, IngestError> {
    let Some(raw) = cell(record, mapping, field) else {
        return Ok(DEFAULT_NUMERIC);
    };

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(IngestError::Materialization {
            row,
            field,
            value: raw.to_string(),
        }),
    }
}

/// Materialize a single record. `row` is the 1-based data row number used in errors.
pub fn materialize_row(
    record: &StringRecord,
    mapping: &ColumnMapping,
    row: usize,
) -> Result<EquipmentReading, IngestError> {
    let index = row.checked_sub(1).ok_or(IngestError::InvalidRow(row))?;
    let position = i32::try_from(index).map_err(|_| IngestError::TooManyRows)?;

    Ok(EquipmentReading {
        position,
        equipment_name: text_cell(record, mapping, CanonicalField::EquipmentName),
        equipment_type: text_cell(record, mapping, CanonicalField::Type),
        flowrate: numeric_cell(record, mapping, CanonicalField::Flowrate, row)?,
        pressure: numeric_cell(record, mapping, CanonicalField::Pressure, row)?,
        temperature: numeric_cell(record, mapping, CanonicalField::Temperature, row)?,
    })
}

/// Materialize every record, stopping at the first bad cell so nothing partial is returned.
pub fn materialize_rows(records: &[StringRecord], mapping: &ColumnMapping) -> Result<Vec<EquipmentReading>, IngestError> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| materialize_row(record, mapping, i + 1))
        .collect()
}
