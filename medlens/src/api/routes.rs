use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::openapi;
use super::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
        .route("/analyze", post(handlers::analyze::analyze))
        .route(
            "/analyze-and-store",
            post(handlers::analyze::analyze_and_store),
        )
        .route("/records", get(handlers::records::list_records))
        .route(
            "/records/{id}",
            get(handlers::records::get_record).delete(handlers::records::delete_record),
        )
        .route("/chat", post(handlers::chat::chat))
        .route("/chat/history", get(handlers::chat::chat_history))
        .route(
            "/chat/history/{session_id}",
            axum::routing::delete(handlers::chat::delete_chat_session),
        )
        .route("/openapi.json", get(openapi::openapi_json))
        .merge(openapi::redoc_router());

    if let Some(root) = state.storage.local_root() {
        router = router.nest_service("/uploads", ServeDir::new(root));
    }

    router
        .layer(DefaultBodyLimit::max(state.config.server.max_request_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
