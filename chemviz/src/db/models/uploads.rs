use crate::types::UploadId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Database request for creating a new upload batch
#[derive(Debug, Clone)]
pub struct UploadCreateDBRequest {
    pub file_name: String,
}

/// Database response for an upload batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UploadDBResponse {
    pub id: UploadId,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
}
