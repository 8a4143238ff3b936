use crate::{
    AppState,
    api::{handlers::load_records, models::records::RecordSelectionQuery},
    errors::{Error, ErrorResponse, Result},
    summary::{Aggregate, aggregate},
};
use axum::{
    Json,
    extract::{Query, State},
};

#[utoipa::path(
    get,
    path = "/summary/",
    tag = "summary",
    summary = "Summary statistics",
    description = "Counts, averages and the type distribution over all retained records, or over one upload \
                   when `upload_id` is given.",
    params(RecordSelectionQuery),
    responses(
        (status = 200, description = "Summary of the selected records", body = Aggregate),
        (status = 400, description = "Invalid upload_id", body = ErrorResponse),
        (status = 404, description = "No data found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn get_summary(State(state): State<AppState>, Query(query): Query<RecordSelectionQuery>) -> Result<Json<Aggregate>> {
    let records = load_records(&state.db, query.upload_id()?).await?;
    if records.is_empty() {
        return Err(Error::NoData);
    }

    Ok(Json(aggregate(&records)?))
}
