use crate::{
    AppState,
    api::models::uploads::{EquipmentRowPreview, PREVIEW_ROWS, UploadCreatedResponse, UploadResponse},
    db::handlers::{Repository, Uploads, uploads::UploadFilter},
    errors::{Error, ErrorResponse, Result},
    ingest,
    summary::aggregate,
    types::UploadId,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
};
use tracing::{info, instrument};

const FALLBACK_FILE_NAME: &str = "upload.csv";

fn multipart_error(err: MultipartError) -> Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge {
            message: "Uploaded file is too large".to_string(),
        }
    } else {
        Error::BadRequest {
            message: format!("Failed to parse multipart data: {}", err.body_text()),
        }
    }
}

/// Pull the `file` field out of the form. Other fields are skipped.
async fn read_file_field(multipart: &mut Multipart) -> Result<Option<(String, Bytes)>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_FILE_NAME)
            .to_string();
        let content = field.bytes().await.map_err(multipart_error)?;
        return Ok(Some((file_name, content)));
    }

    Ok(None)
}

#[utoipa::path(
    post,
    path = "/upload/",
    tag = "uploads",
    summary = "Upload equipment CSV",
    description = "Parse a CSV of equipment readings, store it as a new upload batch and return its summary \
                   with a preview of the first rows. Only the most recent batches are retained.",
    request_body(
        content_type = "multipart/form-data",
        description = "Form with a `file` field holding the CSV"
    ),
    responses(
        (status = 200, description = "File uploaded successfully", body = UploadCreatedResponse),
        (status = 400, description = "No file uploaded", body = ErrorResponse),
        (status = 413, description = "Payload too large", body = ErrorResponse),
        (status = 500, description = "The file could not be processed", body = ErrorResponse)
    )
)]
#[instrument(skip_all)]
pub async fn upload_csv(State(state): State<AppState>, mut multipart: Multipart) -> Result<Json<UploadCreatedResponse>> {
    let Some((file_name, content)) = read_file_field(&mut multipart).await? else {
        return Err(Error::BadRequest {
            message: "No file uploaded".to_string(),
        });
    };

    let result = async {
        let readings = ingest::parse_upload(&content)?;
        let stored = ingest::store_upload(&state.db, &file_name, &readings, &state.config).await?;
        let summary = aggregate(&readings)?;
        Ok::<_, Error>((readings, stored, summary))
    }
    .await;

    let (readings, stored, summary) = match result {
        Ok(ok) => ok,
        Err(e) => {
            metrics::counter!("chemviz_upload_failures_total").increment(1);
            return Err(e);
        }
    };

    metrics::counter!("chemviz_uploads_total").increment(1);
    info!(
        upload_id = stored.upload.id,
        file_name = %file_name,
        bytes = content.len(),
        records = stored.record_count,
        "Upload processed"
    );

    Ok(Json(UploadCreatedResponse {
        message: "File uploaded successfully".to_string(),
        upload_id: stored.upload.id,
        summary,
        data: readings.iter().take(PREVIEW_ROWS).map(EquipmentRowPreview::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/history/",
    tag = "uploads",
    summary = "Upload history",
    description = "The most recent upload batches, newest first.",
    responses(
        (status = 200, description = "Recent uploads", body = [UploadResponse]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_history(State(state): State<AppState>) -> Result<Json<Vec<UploadResponse>>> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let limit = i64::try_from(state.config.retention.max_uploads).unwrap_or(i64::MAX);

    let uploads = Uploads::new(&mut conn).list(&UploadFilter::new().limit(limit)).await?;

    Ok(Json(uploads.into_iter().map(UploadResponse::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/history/{upload_id}/",
    tag = "uploads",
    summary = "Delete upload",
    description = "Remove an upload batch and all of its records.",
    params(
        ("upload_id" = i64, Path, description = "Upload batch ID"),
    ),
    responses(
        (status = 204, description = "Upload deleted"),
        (status = 404, description = "Upload not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn delete_upload(State(state): State<AppState>, Path(upload_id): Path<UploadId>) -> Result<StatusCode> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;

    if !Uploads::new(&mut conn).delete(upload_id).await? {
        return Err(Error::NotFound {
            resource: "Upload".to_string(),
            id: upload_id.to_string(),
        });
    }

    info!(upload_id, "Upload deleted");
    Ok(StatusCode::NO_CONTENT)
}
