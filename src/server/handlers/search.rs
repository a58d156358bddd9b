//! Search intake and per-job status polling.

use axum::{
    extract::{FromRequest, Path, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::super::AppState;
use super::error_response;
use crate::jobs::SubmitError;
use crate::models::JobId;

/// Raw search fields as submitted by an HTML form.
#[derive(Debug, Default, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub case_type: String,
    #[serde(default)]
    pub case_number: String,
    #[serde(default)]
    pub filing_year: String,
}

/// JSON variant; numbers may arrive as numbers or strings.
#[derive(Debug, Deserialize)]
struct JsonSearch {
    #[serde(default)]
    case_type: Value,
    #[serde(default)]
    case_number: Value,
    #[serde(default)]
    filing_year: Value,
}

impl From<JsonSearch> for SearchForm {
    fn from(body: JsonSearch) -> Self {
        Self {
            case_type: value_text(&body.case_type),
            case_number: value_text(&body.case_number),
            filing_year: value_text(&body.filing_year),
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Accept a search (form-encoded or JSON) and queue it.
pub async fn submit_search(State(state): State<AppState>, request: Request) -> Response {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));

    let form: SearchForm = if is_json {
        match Json::<JsonSearch>::from_request(request, &state).await {
            Ok(Json(body)) => body.into(),
            Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
        }
    } else {
        match Form::<SearchForm>::from_request(request, &state).await {
            Ok(Form(form)) => form,
            Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
        }
    };

    let result = state
        .orchestrator
        .submit_form(&form.case_type, &form.case_number, &form.filing_year)
        .await;

    match result {
        Ok(job_id) => {
            info!("Accepted search {}", job_id);
            (
                StatusCode::ACCEPTED,
                Json(serde_json::json!({
                    "job_id": job_id,
                    "status_url": format!("/api/status/{}", job_id),
                    "message": format!(
                        "Search started for {} {}/{}! Please wait for results...",
                        form.case_type.trim(),
                        form.case_number.trim(),
                        form.filing_year.trim()
                    ),
                })),
            )
                .into_response()
        }
        Err(e @ SubmitError::Validation(_)) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e @ SubmitError::Unreachable) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
    }
}

/// Poll one job. Unknown or expired ids get the not-found shape.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let view = state.orchestrator.store().poll(&JobId::from(job_id));
    Json(view)
}
