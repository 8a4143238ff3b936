//! OpenAPI documentation for the `/api` surface, served by Scalar at `/docs`.

use crate::{api, errors, summary};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Chemical Equipment Visualizer API",
        description = "Upload CSV files of chemical equipment readings, then query summary statistics, \
                       upload history and PDF reports."
    ),
    servers(
        (url = "/api", description = "Equipment API")
    ),
    paths(
        api::handlers::uploads::upload_csv,
        api::handlers::uploads::list_history,
        api::handlers::uploads::delete_upload,
        api::handlers::summary::get_summary,
        api::handlers::reports::download_report,
    ),
    components(
        schemas(
            api::models::uploads::UploadResponse,
            api::models::uploads::UploadCreatedResponse,
            api::models::uploads::EquipmentRowPreview,
            summary::Aggregate,
            errors::ErrorResponse,
        )
    ),
    tags(
        (name = "uploads", description = "Ingest CSV files and manage the retained upload batches.

Column headers are matched loosely (`Equip Name`, `Flow Rate`, `Temp(C)` and similar all work). \
Missing columns default to `Unknown` or `0`. Only the most recent uploads are kept."),
        (name = "summary", description = "Aggregate statistics over stored equipment records."),
        (name = "reports", description = "Printable PDF reports."),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_all_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();

        for expected in ["/upload/", "/summary/", "/history/", "/history/{upload_id}/", "/pdf/"] {
            assert!(paths.iter().any(|p| p == expected), "missing {expected} in {paths:?}");
        }
    }
}
