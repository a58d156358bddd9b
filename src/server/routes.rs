//! Router configuration for the web server.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Search intake and polling
        .route("/api/search", post(handlers::submit_search))
        .route("/api/status/:job_id", get(handlers::job_status))
        // Latest result
        .route("/api/result", get(handlers::latest_result))
        .route("/status", get(handlers::latest_result))
        .route("/download/:filename", get(handlers::download))
        .route("/clear", post(handlers::clear_data))
        // Diagnostics
        .route("/test", get(handlers::test_scraper))
        .route("/logs", get(handlers::view_logs))
        .route("/database/status", get(handlers::database_status))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
