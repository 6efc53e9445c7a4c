use axum::extract::{Path, State};
use axum::Json;
use axum_extra::extract::Query;

use crate::api::dto::{DeleteResponse, ErrorResponse, RecordListResponse, RecordsQuery};
use crate::api::state::AppState;
use crate::error::Result;
use crate::models::{DiagnosisFilter, Page, StoredDiagnosisRecord};

/// `GET /records`
#[utoipa::path(
    get,
    path = "/records",
    tag = "records",
    params(RecordsQuery),
    responses((status = 200, description = "Stored diagnoses, newest first", body = RecordListResponse))
)]
pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<RecordListResponse>> {
    let filter = DiagnosisFilter {
        patient_id: query.patient_id,
        page: Page::new(query.limit, query.skip),
    };

    let (records, total) = state.diagnosis.list(&filter).await?;

    Ok(Json(RecordListResponse {
        records,
        total,
        limit: filter.page.limit,
        skip: filter.page.skip,
    }))
}

/// `GET /records/{id}`
#[utoipa::path(
    get,
    path = "/records/{id}",
    tag = "records",
    params(("id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Stored diagnosis", body = StoredDiagnosisRecord),
        (status = 404, description = "Unknown record", body = ErrorResponse),
    )
)]
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoredDiagnosisRecord>> {
    Ok(Json(state.diagnosis.get(&id).await?))
}

/// `DELETE /records/{id}`
#[utoipa::path(
    delete,
    path = "/records/{id}",
    tag = "records",
    params(("id" = String, Path, description = "Record id")),
    responses(
        (status = 200, description = "Record deleted", body = DeleteResponse),
        (status = 404, description = "Unknown record", body = ErrorResponse),
    )
)]
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let deleted_count = state.diagnosis.delete(&id).await?;
    Ok(Json(DeleteResponse {
        message: "Record deleted successfully".to_string(),
        deleted_count,
    }))
}
