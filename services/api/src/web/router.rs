//! services/api/src/web/router.rs
//!
//! Assembles the HTTP routes into a single Axum router.

use crate::web::{
    rest::{ask_handler, link_handler, normalize_handler, response_handler, upload_handler},
    sessions::{
        ask_session_handler, create_session_handler, generate_handler, generate_upload_handler,
        get_session_handler, list_sessions_handler, select_session_handler,
    },
    state::AppState,
};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Builds the API router. Uploads larger than `max_upload_bytes` are refused
/// before any handler runs.
pub fn build_router(app_state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let stateless_routes = Router::new()
        .route("/api/response", post(response_handler))
        .route("/api/upload", post(upload_handler))
        .route("/api/link", post(link_handler))
        .route("/api/ask", post(ask_handler))
        .route("/api/normalize", post(normalize_handler));

    let session_routes = Router::new()
        .route(
            "/api/sessions",
            get(list_sessions_handler).post(create_session_handler),
        )
        .route("/api/sessions/{id}", get(get_session_handler))
        .route("/api/sessions/{id}/select", post(select_session_handler))
        .route("/api/sessions/{id}/generate", post(generate_handler))
        .route(
            "/api/sessions/{id}/generate/upload",
            post(generate_upload_handler),
        )
        .route("/api/sessions/{id}/ask", post(ask_session_handler));

    Router::new()
        .merge(stateless_routes)
        .merge(session_routes)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
