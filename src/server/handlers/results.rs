//! Latest result, export downloads and clearing.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, warn};

use super::super::AppState;
use super::error_response;
use crate::export::CaseExporter;

/// The most recently finished record, good or bad.
pub async fn latest_result(State(state): State<AppState>) -> Response {
    match state.orchestrator.store().latest() {
        Some(record) => Json(record.as_ref().clone()).into_response(),
        None => Json(serde_json::json!({
            "status": "No Data",
            "error": "No case data available",
        }))
        .into_response(),
    }
}

/// Serve `case_data.csv` or `case_data.pdf` as an attachment.
pub async fn download(State(state): State<AppState>, Path(filename): Path<String>) -> Response {
    let path = match state.files.as_ref().and_then(|f| f.path_for(&filename)) {
        Some(path) => path,
        None => return error_response(StatusCode::NOT_FOUND, "File not found"),
    };

    let content = match tokio::fs::read(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return error_response(
                StatusCode::NOT_FOUND,
                "File not found or not ready for download. Please search for a case first.",
            )
        }
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read file");
        }
    };

    let (mime, download_name) = if filename.ends_with(".pdf") {
        ("application/pdf", "case_information.pdf")
    } else {
        ("text/csv; charset=utf-8", "case_information.csv")
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download_name),
        )
        .body(Body::from(content))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Drop every job status, the latest result and the exported files.
pub async fn clear_data(State(state): State<AppState>) -> Response {
    state.orchestrator.store().clear();

    if let Some(files) = state.files.clone() {
        let cleared = tokio::task::spawn_blocking(move || files.clear()).await;
        match cleared {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Failed to remove exported files: {}", e);
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Error clearing data: {}", e),
                );
            }
            Err(e) => {
                warn!("Failed to remove exported files: {}", e);
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error clearing data");
            }
        }
    }

    info!("Cleared all case data");
    Json(serde_json::json!({
        "status": "success",
        "message": "All data cleared successfully!",
    }))
    .into_response()
}
