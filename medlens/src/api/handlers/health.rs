use std::collections::BTreeMap;

use axum::extract::State;
use axum::Json;

use crate::api::dto::{DatabaseStatus, HealthResponse, LlmStatus, ServiceDescriptor, StorageStatus};
use crate::api::state::AppState;
use crate::llm::LlmBackend;

pub const SERVICE_NAME: &str = "Medical Image Analysis API";

/// `GET /`
#[utoipa::path(
    get,
    path = "/",
    tag = "service",
    responses((status = 200, description = "Service descriptor", body = ServiceDescriptor))
)]
pub async fn root() -> Json<ServiceDescriptor> {
    let endpoints: BTreeMap<String, String> = [
        ("/analyze", "POST - Upload medical image for analysis"),
        ("/analyze-and-store", "POST - Analyze an image and store the result"),
        ("/records", "GET - List stored diagnoses"),
        ("/records/{id}", "GET, DELETE - Fetch or remove one stored diagnosis"),
        ("/chat", "POST - Ask a medical question (English/Arabic reply)"),
        ("/chat/history", "GET - List chat turns"),
        ("/chat/history/{session_id}", "DELETE - Remove a chat session"),
        ("/health", "GET - Check API health"),
        ("/docs", "GET - API documentation"),
    ]
    .into_iter()
    .map(|(path, description)| (path.to_string(), description.to_string()))
    .collect();

    Json(ServiceDescriptor {
        message: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints,
    })
}

/// `GET /health`
#[utoipa::path(
    get,
    path = "/health",
    tag = "service",
    responses((status = 200, description = "Service health status", body = HealthResponse))
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match state.db.ping().await {
        Ok(()) => DatabaseStatus {
            status: "ok".to_string(),
        },
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            DatabaseStatus {
                status: "error".to_string(),
            }
        }
    };

    let llm = if state.llm.is_available() {
        let provider = match state.llm.backend() {
            LlmBackend::Gemini => "gemini",
            LlmBackend::OpenAI => "openai",
            LlmBackend::OpenRouter => "openrouter",
            LlmBackend::Ollama => "ollama",
            LlmBackend::LmStudio => "lmstudio",
            LlmBackend::OpenAICompatible { .. } => "openai-compatible",
            LlmBackend::Unavailable { .. } => "unavailable",
        };
        LlmStatus {
            status: "available".to_string(),
            provider: Some(provider.to_string()),
            model: state.llm.model().map(str::to_string),
        }
    } else {
        LlmStatus {
            status: "unavailable".to_string(),
            provider: None,
            model: None,
        }
    };

    let storage = StorageStatus {
        status: if state.storage.is_available() {
            "available"
        } else {
            "unavailable"
        }
        .to_string(),
        backend: state.storage.kind().to_string(),
    };

    let status = if database.status == "ok" {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        llm,
        storage,
    })
}
