use axum::extract::{Multipart, State};
use axum::Json;

use crate::api::dto::{AnalyzeForm, ErrorResponse};
use crate::api::extractors::map_multipart_error;
use crate::api::state::AppState;
use crate::config::ALLOWED_IMAGE_EXTENSIONS;
use crate::error::{MedlensError, Result};
use crate::models::{DiagnosisRecord, StoredDiagnosisRecord};
use crate::services::{
    file_extension, file_too_large_message, invalid_file_type_message, ImageUpload,
};

struct AnalyzeFields {
    upload: ImageUpload,
    patient_id: Option<String>,
}

/// Pull `file` (and `patient_id`) out of the form.
///
/// The extension is checked from the part headers before the file body is
/// read, so a disallowed type is reported even when the body is oversized.
async fn read_fields(state: &AppState, multipart: &mut Multipart) -> Result<AnalyzeFields> {
    let too_large = file_too_large_message(&state.config.upload);
    let mut upload: Option<ImageUpload> = None;
    let mut patient_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| map_multipart_error(e, &too_large))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                if !ALLOWED_IMAGE_EXTENSIONS.contains(&file_extension(&filename).as_str()) {
                    return Err(MedlensError::Validation(invalid_file_type_message()));
                }

                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| map_multipart_error(e, &too_large))?;
                upload = Some(ImageUpload::new(filename, bytes.to_vec()));
            }
            "patient_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| map_multipart_error(e, &too_large))?;
                let text = text.trim();
                if !text.is_empty() {
                    patient_id = Some(text.to_string());
                }
            }
            _ => {}
        }
    }

    let upload = upload
        .ok_or_else(|| MedlensError::Validation("Missing required 'file' field".to_string()))?;

    Ok(AnalyzeFields { upload, patient_id })
}

/// `POST /analyze`
#[utoipa::path(
    post,
    path = "/analyze",
    tag = "diagnosis",
    request_body(content_type = "multipart/form-data", content = AnalyzeForm),
    responses(
        (status = 200, description = "Normalized diagnosis", body = DiagnosisRecord),
        (status = 400, description = "Invalid file type or size", body = ErrorResponse),
        (status = 502, description = "Model call failed", body = ErrorResponse),
    )
)]
pub async fn analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<DiagnosisRecord>> {
    let fields = read_fields(&state, &mut multipart).await?;
    let record = state.diagnosis.analyze(&fields.upload).await?;
    Ok(Json(record))
}

/// `POST /analyze-and-store`
#[utoipa::path(
    post,
    path = "/analyze-and-store",
    tag = "diagnosis",
    request_body(content_type = "multipart/form-data", content = AnalyzeForm),
    responses(
        (status = 200, description = "Stored diagnosis", body = StoredDiagnosisRecord),
        (status = 400, description = "Invalid file type or size", body = ErrorResponse),
        (status = 502, description = "Model or storage call failed", body = ErrorResponse),
    )
)]
pub async fn analyze_and_store(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<StoredDiagnosisRecord>> {
    let fields = read_fields(&state, &mut multipart).await?;
    let record = state
        .diagnosis
        .analyze_and_store(&fields.upload, fields.patient_id)
        .await?;
    Ok(Json(record))
}
