//! HTTP request handlers for the web server.

mod diagnostics;
mod results;
mod search;

pub use diagnostics::{database_status, health, test_scraper, view_logs};
pub use results::{clear_data, download, latest_result};
pub use search::{job_status, submit_search};

use axum::{http::StatusCode, response::IntoResponse, Json};

/// `{"error": message}` with the given status.
fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}
