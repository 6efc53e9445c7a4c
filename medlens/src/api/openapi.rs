use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Medical Image Analysis API",
        version = "1.0.0",
        description = "Medical image analysis and bilingual (English/Arabic) medical chat backed by a generative vision model.",
    ),
    paths(
        handlers::health::root,
        handlers::health::health_check,
        handlers::analyze::analyze,
        handlers::analyze::analyze_and_store,
        handlers::records::list_records,
        handlers::records::get_record,
        handlers::records::delete_record,
        handlers::chat::chat,
        handlers::chat::chat_history,
        handlers::chat::delete_chat_session,
    ),
    components(schemas(
        models::DiagnosisRecord,
        models::StoredDiagnosisRecord,
        models::ChatExchange,
        dto::ServiceDescriptor,
        dto::HealthResponse,
        dto::DatabaseStatus,
        dto::LlmStatus,
        dto::StorageStatus,
        dto::AnalyzeForm,
        dto::RecordListResponse,
        dto::DeleteResponse,
        dto::ChatRequest,
        dto::ChatHistoryResponse,
        dto::ErrorResponse,
    )),
    tags(
        (name = "service", description = "Descriptor and health check"),
        (name = "diagnosis", description = "Image analysis"),
        (name = "records", description = "Stored diagnoses"),
        (name = "chat", description = "Bilingual medical chat"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/",
            "/health",
            "/analyze",
            "/analyze-and-store",
            "/records",
            "/records/{id}",
            "/chat",
            "/chat/history",
            "/chat/history/{session_id}",
        ] {
            assert!(paths.contains(&expected), "missing {expected}");
        }
    }
}
