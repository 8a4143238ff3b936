//! Common type definitions.
//!
//! # ID Types
//!
//! Entity IDs are `BIGSERIAL` primary keys wrapped in type aliases so signatures say which
//! table they point at:
//!
//! - [`UploadId`]: Upload batch identifier (one ingested CSV file)
//! - [`EquipmentRecordId`]: Equipment record identifier

// Type aliases for IDs
pub type UploadId = i64;
pub type EquipmentRecordId = i64;

/// Canonical equipment fields every upload is normalized onto.
///
/// [`label`](CanonicalField::label) is the spelling used in upload previews and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CanonicalField {
    EquipmentName,
    Type,
    Flowrate,
    Pressure,
    Temperature,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 5] = [
        CanonicalField::EquipmentName,
        CanonicalField::Type,
        CanonicalField::Flowrate,
        CanonicalField::Pressure,
        CanonicalField::Temperature,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CanonicalField::EquipmentName => "Equipment Name",
            CanonicalField::Type => "Type",
            CanonicalField::Flowrate => "Flowrate",
            CanonicalField::Pressure => "Pressure",
            CanonicalField::Temperature => "Temperature",
        }
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
