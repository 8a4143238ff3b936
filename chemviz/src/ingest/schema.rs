//! Header normalization: maps whatever column names a CSV arrives with onto the canonical
//! equipment fields.
//!
//! Matching is a case-insensitive substring test, checked in a fixed precedence order per
//! header. A header that matches nothing is left unmapped and ignored by the materializer.

use super::IngestError;
use crate::types::CanonicalField;
use std::collections::BTreeMap;

/// Decide which canonical field a single header maps to.
///
/// The header is trimmed and lower-cased before matching. Precedence matters: `"Equipment Type"`
/// contains `"equip"` but not `"name"`, so it falls through to the `"type"` rule.
pub fn classify_header(header: &str) -> Option<CanonicalField> {
    let lower = header.trim().to_lowercase();

    if lower.contains("equip") && lower.contains("name") {
        Some(CanonicalField::EquipmentName)
    } else if lower.contains("type") {
        Some(CanonicalField::Type)
    } else if lower.contains("flow") {
        Some(CanonicalField::Flowrate)
    } else if lower.contains("press") {
        Some(CanonicalField::Pressure)
    } else if lower.contains("temp") {
        Some(CanonicalField::Temperature)
    } else {
        None
    }
}

/// A mapped source column
#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceColumn {
    index: usize,
    header: String,
}

/// Result of normalizing a header row: canonical field -> source column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    columns: BTreeMap<CanonicalField, SourceColumn>,
    unmapped: Vec<String>,
}

impl ColumnMapping {
    /// Index of the source column holding `field`, if any header mapped to it
    pub fn column(&self, field: CanonicalField) -> Option<usize> {
        self.columns.get(&field).map(|c| c.index)
    }

    /// Original (trimmed) header that was mapped to `field`
    pub fn source_header(&self, field: CanonicalField) -> Option<&str> {
        self.columns.get(&field).map(|c| c.header.as_str())
    }

    /// Headers that matched no canonical field, in file order
    pub fn unmapped(&self) -> &[String] {
        &self.unmapped
    }

    /// Canonical fields with no source column; these get defaults during materialization
    pub fn missing(&self) -> Vec<CanonicalField> {
        CanonicalField::ALL
            .into_iter()
            .filter(|field| !self.columns.contains_key(field))
            .collect()
    }
}

/// Build the column mapping for a header row.
///
/// Two headers landing on the same canonical field is rejected with
/// [`IngestError::SchemaConflict`] rather than silently dropping one of the columns.
pub fn normalize_headers<S: AsRef<str>>(headers: &[S]) -> Result<ColumnMapping, IngestError> {
    let mut mapping = ColumnMapping::default();

    for (index, raw) in headers.iter().enumerate() {
        let header = raw.as_ref().trim().to_string();

        let Some(field) = classify_header(&header) else {
            mapping.unmapped.push(header);
            continue;
        };

        if let Some(existing) = mapping.columns.get(&field) {
            return Err(IngestError::SchemaConflict {
                field,
                first: existing.header.clone(),
                second: header,
            });
        }

        mapping.columns.insert(field, SourceColumn { index, header });
    }

    Ok(mapping)
}
