//! HTTP API for submitting searches and polling their progress.
//!
//! Provides:
//! - Search intake that queues a background job
//! - Per-job status polling and the latest result
//! - Downloads of the CSV/PDF exports
//! - Diagnostics for the court website, the browser and the search log

mod cache;
mod handlers;
mod routes;

pub use routes::create_router;

use std::sync::Arc;

use crate::config::Settings;
use crate::export::FileExporter;
use crate::jobs::{Orchestrator, StatusStore};

use cache::StatsCache;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    /// Export files offered for download, when exporting is enabled.
    pub files: Option<FileExporter>,
    /// Search form URL, reported by the diagnostics endpoint.
    pub search_url: String,
    pub stats_cache: Arc<StatsCache>,
}

impl AppState {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let store = Arc::new(StatusStore::with_ttl(settings.status_ttl));
        let files = settings.create_exporter();
        let orchestrator = Orchestrator::new(
            settings.create_scraper(),
            settings.create_probe()?,
            store,
        )
        .with_exporter(Arc::new(files.clone()))
        .with_search_log(settings.create_search_log()?)
        .with_retry_policy(settings.retry);

        Ok(Self::from_parts(orchestrator, Some(files), settings.search_url()))
    }

    pub fn from_parts(
        orchestrator: Orchestrator,
        files: Option<FileExporter>,
        search_url: impl Into<String>,
    ) -> Self {
        Self {
            orchestrator,
            files,
            search_url: search_url.into(),
            stats_cache: Arc::new(StatsCache::new()),
        }
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::new(settings)?;
    let app = create_router(state);

    tracing::info!("Starting server at http://{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::Utc;
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::jobs::StaticProbe;
    use crate::models::{CaseRecord, SearchQuery};
    use crate::repository::SearchLog;
    use crate::scrapers::{CaseScraper, ScrapeError};

    struct FixedScraper {
        check_ok: bool,
    }

    #[async_trait]
    impl CaseScraper for FixedScraper {
        async fn scrape(&self, query: &SearchQuery) -> Result<CaseRecord, ScrapeError> {
            let mut record = CaseRecord::blank("https://court.test/result", Utc::now());
            record.case_info = query.to_string();
            record.parties = "Petitioner: A, Respondent: B".to_string();
            Ok(record)
        }

        async fn check(&self) -> Result<(), ScrapeError> {
            if self.check_ok {
                Ok(())
            } else {
                Err(ScrapeError::Launch("chrome binary not found".to_string()))
            }
        }
    }

    struct TestApp {
        router: axum::Router,
        orchestrator: Orchestrator,
        _dir: tempfile::TempDir,
    }

    fn setup_test_app(reachable: bool, check_ok: bool) -> TestApp {
        let dir = tempdir().unwrap();
        let files = FileExporter::new(dir.path());
        let log = SearchLog::new(&dir.path().join("test.db")).unwrap();

        let orchestrator = Orchestrator::new(
            Arc::new(FixedScraper { check_ok }),
            Arc::new(StaticProbe(reachable)),
            Arc::new(StatusStore::new()),
        )
        .with_exporter(Arc::new(files.clone()))
        .with_search_log(log);

        let state = AppState::from_parts(
            orchestrator.clone(),
            Some(files),
            "https://court.test/app/get-case-type-status",
        );
        TestApp {
            router: create_router(state),
            orchestrator,
            _dir: dir,
        }
    }

    async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_form(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn wait_finished(app: &TestApp, job_id: &str) -> serde_json::Value {
        for _ in 0..200 {
            let (_, json) = send(app, get(&format!("/api/status/{}", job_id))).await;
            if json["progress"] == 100 {
                return json;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("job {} never finished", job_id);
    }

    #[tokio::test]
    async fn test_health() {
        let app = setup_test_app(true, true);
        let response = app.router.clone().oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_json_search_runs_to_completion() {
        let app = setup_test_app(true, true);

        let (status, json) = send(
            &app,
            post_json(
                "/api/search",
                serde_json::json!({"case_type": "W.P.(C)", "case_number": 1234, "filing_year": "2023"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let job_id = json["job_id"].as_str().unwrap().to_string();
        assert_eq!(json["status_url"], format!("/api/status/{}", job_id));

        let finished = wait_finished(&app, &job_id).await;
        assert_eq!(finished["found"], true);
        assert_eq!(finished["status"], "completed");
        assert_eq!(finished["data_available"], true);

        let (status, record) = send(&app, get("/api/result")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["status"], "Success");
        assert_eq!(record["case_info"], "W.P.(C) 1234/2023");

        let (_, legacy) = send(&app, get("/status")).await;
        assert_eq!(legacy, record);
    }

    #[tokio::test]
    async fn test_form_search_validation_error() {
        let app = setup_test_app(true, true);

        let (status, json) = send(
            &app,
            post_form("/api/search", "case_type=W.P.(C)&case_number=-4&filing_year=2023"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Case number must be a positive number.");
        assert!(app.orchestrator.store().is_empty());
    }

    #[tokio::test]
    async fn test_search_rejected_when_site_unreachable() {
        let app = setup_test_app(false, true);

        let (status, json) = send(
            &app,
            post_form("/api/search", "case_type=W.P.(C)&case_number=12&filing_year=2023"),
        )
        .await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(json["error"].as_str().unwrap().contains("not accessible"));
        assert!(app.orchestrator.store().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_job_status() {
        let app = setup_test_app(true, true);

        let (status, json) = send(&app, get("/api/status/nope")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["found"], false);
        assert_eq!(json["status"], "not_found");
        assert_eq!(json["message"], "Case ID not found or expired");
    }

    #[tokio::test]
    async fn test_result_without_data() {
        let app = setup_test_app(true, true);

        let (_, json) = send(&app, get("/api/result")).await;

        assert_eq!(json["status"], "No Data");
        assert_eq!(json["error"], "No case data available");
    }

    #[tokio::test]
    async fn test_download_and_clear() {
        let app = setup_test_app(true, true);

        let (status, _) = send(&app, get("/download/case_data.csv")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let query = SearchQuery::new("W.P.(C)", 1234, 2023).unwrap();
        let id = app.orchestrator.submit(query).await.unwrap();
        wait_finished(&app, id.as_str()).await;

        let response = app
            .router
            .clone()
            .oneshot(get("/download/case_data.csv"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"case_information.csv\""
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&body).contains("W.P.(C) 1234/2023"));

        let (status, _) = send(&app, get("/download/case_data.pdf")).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, get("/download/secrets.txt")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = send(&app, post_form("/clear", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");

        let (status, _) = send(&app, get("/download/case_data.csv")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, json) = send(&app, get("/api/result")).await;
        assert_eq!(json["status"], "No Data");
        let (_, json) = send(&app, get(&format!("/api/status/{}", id))).await;
        assert_eq!(json["found"], false);
    }

    #[tokio::test]
    async fn test_scraper_diagnostics() {
        let app = setup_test_app(true, true);
        let (status, json) = send(&app, get("/test")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(json["website_accessible"], true);

        let app = setup_test_app(false, true);
        let (status, json) = send(&app, get("/test")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["website_accessible"], false);

        let app = setup_test_app(true, false);
        let (status, json) = send(&app, get("/test")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error_type"], "BROWSER_ERROR");
        assert!(json["message"]
            .as_str()
            .unwrap()
            .starts_with("Test failed: Browser setup issue"));
    }

    #[tokio::test]
    async fn test_logs_and_database_status() {
        let app = setup_test_app(true, true);
        let query = SearchQuery::new("W.P.(C)", 1234, 2023).unwrap();
        let id = app.orchestrator.submit(query).await.unwrap();
        wait_finished(&app, id.as_str()).await;

        let (status, json) = send(&app, get("/logs?limit=10")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total_count"], 1);
        assert_eq!(json["logs"][0]["job_id"], id.as_str());
        assert_eq!(json["logs"][0]["status"], "SUCCESS");

        let (status, json) = send(&app, get("/database/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(json["database_available"], true);
        assert_eq!(json["statistics"]["total_searches"], 1);
        assert_eq!(json["statistics"]["successful_searches"], 1);
    }
}
