//! Health, setup check and search log endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::warn;

use super::super::AppState;
use super::error_response;

/// Default number of log rows returned.
const DEFAULT_LOG_LIMIT: usize = 50;
const MAX_LOG_LIMIT: usize = 500;

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// Probe the court website, then start and stop a browser.
pub async fn test_scraper(State(state): State<AppState>) -> Response {
    let url = state.search_url.clone();

    if !state.orchestrator.probe().is_reachable().await {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({
                "status": "error",
                "message": "Delhi High Court website is not accessible",
                "url": url,
                "website_accessible": false,
            })),
        )
            .into_response();
    }

    match state.orchestrator.scraper().check().await {
        Ok(()) => Json(serde_json::json!({
            "status": "success",
            "message": "Browser setup successful! Scraper is ready.",
            "url": url,
            "website_accessible": true,
        }))
        .into_response(),
        Err(e) => {
            warn!("Scraper self-check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "error",
                    "message": format!("Test failed: {}", e.user_message()),
                    "error_type": e.kind(),
                    "url": url,
                    "website_accessible": true,
                })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LogParams {
    pub limit: Option<usize>,
}

/// Most recent searches from the search log.
pub async fn view_logs(State(state): State<AppState>, Query(params): Query<LogParams>) -> Response {
    let Some(log) = state.orchestrator.search_log().cloned() else {
        return log_unavailable();
    };
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LOG_LIMIT)
        .clamp(1, MAX_LOG_LIMIT);

    match tokio::task::spawn_blocking(move || log.recent_searches(limit)).await {
        Ok(Ok(logs)) => Json(serde_json::json!({
            "status": "success",
            "total_count": logs.len(),
            "logs": logs,
            "source": "database",
        }))
        .into_response(),
        Ok(Err(e)) => {
            warn!("Failed to read search log: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Search log statistics and schema health.
pub async fn database_status(State(state): State<AppState>) -> Response {
    let Some(log) = state.orchestrator.search_log().cloned() else {
        return log_unavailable();
    };

    let cached = state.stats_cache.get_statistics();
    let result = tokio::task::spawn_blocking(move || {
        let health = log.health();
        let stats = match cached {
            Some(stats) => Ok(stats),
            None => log.statistics(),
        };
        (health, stats)
    })
    .await;

    let (health, stats) = match result {
        Ok(pair) => pair,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };

    let statistics = match stats {
        Ok(stats) => {
            state.stats_cache.set_statistics(stats.clone());
            stats
        }
        Err(e) => {
            warn!("Failed to compute search statistics: {}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let status = if health.tables_created {
        "success"
    } else {
        "warning"
    };
    Json(serde_json::json!({
        "status": status,
        "database_available": health.connection,
        "database_path": health.database_path,
        "file_size": health.database_size,
        "tables": health.existing_tables,
        "statistics": statistics,
    }))
    .into_response()
}

fn log_unavailable() -> Response {
    Json(serde_json::json!({
        "status": "info",
        "database_available": false,
        "message": "Search log not configured",
    }))
    .into_response()
}
