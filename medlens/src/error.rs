use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum MedlensError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("LLM rate limit exceeded, retry after {retry_after:?} seconds")]
    LlmRateLimit { retry_after: Option<u64> },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl MedlensError {
    pub fn status(&self) -> StatusCode {
        match self {
            MedlensError::NotFound(_) => StatusCode::NOT_FOUND,
            MedlensError::Validation(_) => StatusCode::BAD_REQUEST,
            MedlensError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MedlensError::Http(_) => StatusCode::BAD_GATEWAY,
            MedlensError::Json(_) => StatusCode::BAD_REQUEST,
            MedlensError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MedlensError::Image(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MedlensError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MedlensError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MedlensError::Llm(_) => StatusCode::BAD_GATEWAY,
            MedlensError::LlmUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            MedlensError::LlmRateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
            MedlensError::Storage(_) => StatusCode::BAD_GATEWAY,
            MedlensError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for MedlensError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            MedlensError::NotFound(msg) => msg.clone(),
            MedlensError::Validation(msg) => msg.clone(),
            MedlensError::Internal(msg) => msg.clone(),
            MedlensError::Llm(msg) => msg.clone(),
            MedlensError::LlmUnavailable(msg) => msg.clone(),
            MedlensError::Storage(msg) => msg.clone(),
            MedlensError::StorageUnavailable(msg) => msg.clone(),
            MedlensError::Database(e) => e.to_string(),
            MedlensError::Http(e) => e.to_string(),
            MedlensError::Json(e) => e.to_string(),
            MedlensError::Io(e) => e.to_string(),
            MedlensError::Image(e) => e.to_string(),
            MedlensError::Config(e) => e.to_string(),
            MedlensError::LlmRateLimit { .. } => self.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "Request failed");
        }

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, MedlensError>;
