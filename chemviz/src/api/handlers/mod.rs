//! HTTP request handlers for all API endpoints.
//!
//! Handlers extract [`AppState`](crate::AppState) and request data with Axum extractors, call
//! into the ingest pipeline or the repositories, and return JSON (or PDF bytes). Errors are
//! [`crate::errors::Error`], which renders as `{"error": "..."}` with a matching status.

pub mod reports;
pub mod summary;
pub mod uploads;

use crate::{
    db::{
        handlers::{EquipmentRecords, equipment::EquipmentFilter},
        models::equipment::EquipmentRecordDBResponse,
    },
    errors::{Error, Result},
    types::UploadId,
};
use sqlx::PgPool;

/// Read every record of the selected upload (or of all retained uploads) in stored order
async fn load_records(db: &PgPool, upload_id: Option<UploadId>) -> Result<Vec<EquipmentRecordDBResponse>> {
    let mut conn = db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let records = EquipmentRecords::new(&mut conn)
        .list(&EquipmentFilter::new().maybe_upload(upload_id))
        .await?;
    Ok(records)
}
