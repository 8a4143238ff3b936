use crate::{
    summary::Reading,
    types::{EquipmentRecordId, UploadId},
};
use serde::{Deserialize, Serialize};

/// Database response for a stored equipment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EquipmentRecordDBResponse {
    pub id: EquipmentRecordId,
    pub upload_id: UploadId,
    pub position: i32,
    pub equipment_name: String,
    pub equipment_type: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

impl Reading for EquipmentRecordDBResponse {
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
