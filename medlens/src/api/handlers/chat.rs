use axum::extract::{Path, State};
use axum::Json;
use axum_extra::extract::Query;

use crate::api::dto::{
    ChatHistoryQuery, ChatHistoryResponse, ChatRequest, DeleteResponse, ErrorResponse,
};
use crate::api::extractors::ValidatedJson;
use crate::api::state::AppState;
use crate::error::Result;
use crate::models::{ChatExchange, ChatHistoryFilter, Page};

/// `POST /chat`
#[utoipa::path(
    post,
    path = "/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Stored chat turn", body = ChatExchange),
        (status = 400, description = "Invalid message", body = ErrorResponse),
        (status = 502, description = "Model call failed", body = ErrorResponse),
    )
)]
pub async fn chat(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ChatRequest>,
) -> Result<Json<ChatExchange>> {
    let exchange = state
        .chat
        .respond(&request.message, request.patient_id, request.session_id)
        .await?;
    Ok(Json(exchange))
}

/// `GET /chat/history`
#[utoipa::path(
    get,
    path = "/chat/history",
    tag = "chat",
    params(ChatHistoryQuery),
    responses((status = 200, description = "Chat turns, newest first", body = ChatHistoryResponse))
)]
pub async fn chat_history(
    State(state): State<AppState>,
    Query(query): Query<ChatHistoryQuery>,
) -> Result<Json<ChatHistoryResponse>> {
    let filter = ChatHistoryFilter {
        session_id: query.session_id,
        patient_id: query.patient_id,
        page: Page::new(query.limit, query.skip),
    };

    let (messages, total) = state.chat.history(&filter).await?;

    Ok(Json(ChatHistoryResponse {
        messages,
        total,
        limit: filter.page.limit,
        skip: filter.page.skip,
    }))
}

/// `DELETE /chat/history/{session_id}`
#[utoipa::path(
    delete,
    path = "/chat/history/{session_id}",
    tag = "chat",
    params(("session_id" = String, Path, description = "Chat session id")),
    responses(
        (status = 200, description = "Session deleted", body = DeleteResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse),
    )
)]
pub async fn delete_chat_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let deleted_count = state.chat.delete_session(&session_id).await?;
    Ok(Json(DeleteResponse {
        message: format!("Deleted {deleted_count} messages"),
        deleted_count,
    }))
}
