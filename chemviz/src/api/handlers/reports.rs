use crate::{
    AppState,
    api::{handlers::load_records, models::records::RecordSelectionQuery},
    errors::{ErrorResponse, Result},
    report::{REPORT_FILE_NAME, build_report},
};
use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use tracing::debug;

#[utoipa::path(
    get,
    path = "/pdf/",
    tag = "reports",
    summary = "Download PDF report",
    description = "A one-page PDF with summary statistics and the first equipment records. Covers all \
                   retained records, or one upload when `upload_id` is given.",
    params(RecordSelectionQuery),
    responses(
        (status = 200, description = "PDF report", content_type = "application/pdf", body = Vec<u8>),
        (status = 400, description = "Invalid upload_id", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn download_report(State(state): State<AppState>, Query(query): Query<RecordSelectionQuery>) -> Result<Response> {
    let records = load_records(&state.db, query.upload_id()?).await?;
    let pdf = build_report(&records)?;
    debug!(records = records.len(), bytes = pdf.len(), "Rendered report");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{REPORT_FILE_NAME}\"")),
        ],
        pdf,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{create_test_app, sample_csv, upload_csv_text};
    use lopdf::Document;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_pdf_download(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;
        upload_csv_text(&app, sample_csv()).await.assert_status_ok();

        let response = app.get("/api/pdf/").await;
        response.assert_status_ok();
        assert_eq!(response.header("content-type"), "application/pdf");
        assert_eq!(
            response.header("content-disposition"),
            "attachment; filename=\"equipment_report.pdf\""
        );

        let bytes = response.as_bytes();
        let doc = Document::load_mem(bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_pdf_without_data_still_renders(pool: PgPool) {
        let app = create_test_app(pool.clone()).await;

        let response = app.get("/api/pdf/").await;
        response.assert_status_ok();
        assert!(response.as_bytes().starts_with(b"%PDF"));
    }
}
