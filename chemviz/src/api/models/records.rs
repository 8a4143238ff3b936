use crate::errors::{Error, Result};
use crate::types::UploadId;
use serde::Deserialize;
use utoipa::IntoParams;

/// Optional restriction of a read to a single upload batch
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RecordSelectionQuery {
    /// Only include records from this upload. Omitted or empty means all retained uploads.
    #[param(value_type = Option<i64>)]
    pub upload_id: Option<String>,
}

impl RecordSelectionQuery {
    pub fn upload_id(&self) -> Result<Option<UploadId>> {
        match self.upload_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| Error::BadRequest {
                message: format!("Invalid upload_id '{raw}'"),
            }),
        }
    }
}
