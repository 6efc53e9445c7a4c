//! Request and response bodies for the HTTP API.
//!
//! Field names are snake_case on the wire, matching the stored records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{ChatExchange, StoredDiagnosisRecord};

/// `GET /`
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ServiceDescriptor {
    pub message: String,
    pub version: String,
    /// Path to a one-line description of what it does.
    pub endpoints: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// `healthy`, or `degraded` when the database does not answer.
    pub status: String,
    pub service: String,
    pub version: String,
    pub database: DatabaseStatus,
    pub llm: LlmStatus,
    pub storage: StorageStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DatabaseStatus {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LlmStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StorageStatus {
    pub status: String,
    pub backend: String,
}

/// Multipart body for the analyze endpoints. Documentation only; the
/// handlers read the form field by field.
#[derive(Debug, utoipa::ToSchema)]
#[allow(dead_code)]
pub struct AnalyzeForm {
    /// Image file: jpg, jpeg, png, gif, bmp, tiff or webp, at most 10MB.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Only read by `/analyze-and-store`.
    pub patient_id: Option<String>,
}

/// Query parameters for `GET /records`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct RecordsQuery {
    pub patient_id: Option<String>,
    /// Page size, default 50, clamped to 1..=100.
    pub limit: Option<u32>,
    pub skip: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RecordListResponse {
    pub records: Vec<StoredDiagnosisRecord>,
    pub total: u64,
    pub limit: u32,
    pub skip: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DeleteResponse {
    pub message: String,
    pub deleted_count: u64,
}

/// Body for `POST /chat`.
#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 4000, message = "Message must be 1-4000 characters"))]
    pub message: String,
    #[validate(length(max = 255, message = "patient_id must be at most 255 characters"))]
    pub patient_id: Option<String>,
    /// Omit to start a new session; the reply carries the generated id.
    #[validate(length(max = 255, message = "session_id must be at most 255 characters"))]
    pub session_id: Option<String>,
}

/// Query parameters for `GET /chat/history`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct ChatHistoryQuery {
    pub session_id: Option<String>,
    pub patient_id: Option<String>,
    pub limit: Option<u32>,
    pub skip: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ChatHistoryResponse {
    pub messages: Vec<ChatExchange>,
    pub total: u64,
    pub limit: u32,
    pub skip: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}
