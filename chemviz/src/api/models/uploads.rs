use crate::db::models::uploads::UploadDBResponse;
use crate::ingest::EquipmentReading;
use crate::summary::Aggregate;
use crate::types::UploadId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Number of parsed rows echoed back in an upload response
pub const PREVIEW_ROWS: usize = 5;

/// An upload batch as listed in history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub id: UploadId,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<UploadDBResponse> for UploadResponse {
    fn from(db: UploadDBResponse) -> Self {
        Self {
            id: db.id,
            file_name: db.file_name,
            uploaded_at: db.uploaded_at,
        }
    }
}

/// One parsed row, keyed by the canonical column labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EquipmentRowPreview {
    #[serde(rename = "Equipment Name")]
    pub equipment_name: String,
    #[serde(rename = "Type")]
    pub equipment_type: String,
    #[serde(rename = "Flowrate")]
    pub flowrate: f64,
    #[serde(rename = "Pressure")]
    pub pressure: f64,
    #[serde(rename = "Temperature")]
    pub temperature: f64,
}

impl From<&EquipmentReading> for EquipmentRowPreview {
    fn from(reading: &EquipmentReading) -> Self {
        Self {
            equipment_name: reading.equipment_name.clone(),
            equipment_type: reading.equipment_type.clone(),
            flowrate: reading.flowrate,
            pressure: reading.pressure,
            temperature: reading.temperature,
        }
    }
}

/// Response to a successful upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UploadCreatedResponse {
    pub message: String,
    pub upload_id: UploadId,
    /// Summary of the uploaded file only
    pub summary: Aggregate,
    /// The first parsed rows
    pub data: Vec<EquipmentRowPreview>,
}
