//! Job orchestration: retries, terminal states, persistence and the
//! latest-result slot.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use casefetch::export::{CaseExporter, ExportError, FileExporter, CSV_FILE, PDF_FILE};
use casefetch::jobs::{
    Orchestrator, RetryPolicy, StaticProbe, StatusStore, StatusView, SubmitError,
};
use casefetch::models::{CaseOutcome, CaseRecord, JobId, JobState, SearchQuery};
use casefetch::repository::{SearchLog, SearchOutcome};
use casefetch::scrapers::{ErrorKind, ScrapeError};

use common::{not_found_record, query, success_record, timeout, ScriptedScraper, Step};

struct FailingExporter;

impl CaseExporter for FailingExporter {
    fn export(&self, _record: &CaseRecord) -> Result<(), ExportError> {
        Err(ExportError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only data directory",
        )))
    }

    fn clear(&self) -> Result<(), ExportError> {
        Ok(())
    }
}

fn orchestrator(scraper: Arc<ScriptedScraper>, reachable: bool) -> Orchestrator {
    Orchestrator::new(
        scraper,
        Arc::new(StaticProbe(reachable)),
        Arc::new(StatusStore::new()),
    )
    .with_retry_policy(RetryPolicy::default().with_unit(Duration::from_millis(1)))
}

fn new_job(orch: &Orchestrator, query: &SearchQuery) -> JobId {
    let id = JobId::new(query, Utc::now());
    orch.store().create(id.clone());
    id
}

async fn wait_terminal(orch: &Orchestrator, id: &JobId) -> (StatusView, Vec<u8>) {
    let mut progress = Vec::new();
    for _ in 0..500 {
        let view = orch.store().poll(id);
        progress.push(view.progress);
        let terminal = JobState::from_str(&view.status)
            .map(|s| s.is_terminal())
            .unwrap_or(false);
        if terminal {
            return (view, progress);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {} never finished", id);
}

#[tokio::test]
async fn test_transient_failures_are_retried_with_backoff() {
    let scraper = Arc::new(ScriptedScraper::new(vec![
        Step::Error(timeout()),
        Step::Error(timeout()),
        Step::Record(success_record("W.P.(C) 1234/2023")),
    ]));
    let orch = orchestrator(scraper.clone(), true);
    let id = new_job(&orch, &query());

    let report = orch.run_job(&id, query()).await;

    assert_eq!(report.state, JobState::Completed);
    assert_eq!(report.attempts, 3);
    assert_eq!(
        report.delays,
        vec![Duration::from_millis(2), Duration::from_millis(4)]
    );
    assert_eq!(scraper.calls(), 3);

    let view = orch.store().poll(&id);
    assert_eq!(view.status, "completed");
    assert_eq!(view.progress, 100);
    assert!(view.data_available);
    assert_eq!(
        orch.store().latest().unwrap().case_info,
        "W.P.(C) 1234/2023"
    );
}

#[tokio::test]
async fn test_unclassified_error_fails_without_retry() {
    let scraper = Arc::new(ScriptedScraper::new(vec![Step::Error(ScrapeError::Other(
        "something odd happened".to_string(),
    ))]));
    let orch = orchestrator(scraper.clone(), true);
    let id = new_job(&orch, &query());

    let report = orch.run_job(&id, query()).await;

    assert_eq!(report.state, JobState::Failed);
    assert_eq!(report.attempts, 1);
    assert!(report.delays.is_empty());
    assert_eq!(scraper.calls(), 1);

    let view = orch.store().poll(&id);
    assert_eq!(view.status, "failed");
    assert_eq!(view.error_type, Some(ErrorKind::Unknown));
    assert_eq!(view.retryable, Some(false));
    assert!(view
        .message
        .starts_with("An unexpected error occurred: something odd happened"));

    let latest = orch.store().latest().unwrap();
    assert_eq!(latest.status, CaseOutcome::Failed);
    assert_eq!(latest.error_type, Some(ErrorKind::Unknown));
}

#[tokio::test]
async fn test_retries_stop_at_max_attempts() {
    let scraper = Arc::new(ScriptedScraper::new(vec![Step::Error(timeout())]));
    let orch = orchestrator(scraper.clone(), true);
    let id = new_job(&orch, &query());

    let report = orch.run_job(&id, query()).await;

    assert_eq!(report.state, JobState::Failed);
    assert_eq!(report.attempts, 3);
    assert_eq!(report.delays.len(), 2);
    assert_eq!(scraper.calls(), 3);

    let view = orch.store().poll(&id);
    assert_eq!(view.error_type, Some(ErrorKind::Timeout));
    assert_eq!(view.retryable, Some(true));
    assert!(view.message.starts_with("Request timed out"));
}

#[tokio::test]
async fn test_case_not_found_fails_without_data() {
    let scraper = Arc::new(ScriptedScraper::new(vec![Step::Record(not_found_record())]));
    let orch = orchestrator(scraper.clone(), true);
    let id = new_job(&orch, &query());

    let report = orch.run_job(&id, query()).await;

    assert_eq!(report.state, JobState::Failed);
    assert_eq!(scraper.calls(), 1);
    let view = orch.store().poll(&id);
    assert_eq!(
        view.message,
        "Search completed but no data found: Case not found in court records"
    );
    assert!(!view.data_available);
    assert_eq!(view.error_type, None);
}

#[tokio::test]
async fn test_scraper_panic_ends_job_failed() {
    let scraper = Arc::new(ScriptedScraper::new(vec![Step::Panic]));
    let orch = orchestrator(scraper.clone(), true);
    let id = new_job(&orch, &query());

    let report = orch.run_job(&id, query()).await;

    assert_eq!(report.state, JobState::Failed);
    assert_eq!(report.attempts, 1);
    assert_eq!(orch.store().poll(&id).status, "failed");
}

#[tokio::test]
async fn test_export_failure_downgrades_to_warning() {
    let scraper = Arc::new(ScriptedScraper::new(vec![Step::Record(success_record(
        "W.P.(C) 1234/2023",
    ))]));
    let orch = orchestrator(scraper, true).with_exporter(Arc::new(FailingExporter));
    let id = new_job(&orch, &query());

    let report = orch.run_job(&id, query()).await;

    assert_eq!(report.state, JobState::CompletedWithWarning);
    let view = orch.store().poll(&id);
    assert_eq!(view.status, "completed_with_warning");
    assert!(view.data_available);
    assert_eq!(
        view.message,
        "Case information retrieved but file saving failed"
    );
}

#[tokio::test]
async fn test_successful_job_writes_exports() {
    let dir = tempfile::tempdir().unwrap();
    let scraper = Arc::new(ScriptedScraper::new(vec![Step::Record(success_record(
        "W.P.(C) 1234/2023",
    ))]));
    let orch = orchestrator(scraper, true).with_exporter(Arc::new(FileExporter::new(dir.path())));
    let id = new_job(&orch, &query());

    let report = orch.run_job(&id, query()).await;

    assert_eq!(report.state, JobState::Completed);
    let csv = std::fs::read_to_string(dir.path().join(CSV_FILE)).unwrap();
    assert!(csv.starts_with("Field,Value\n"));
    assert!(csv.contains("W.P.(C) 1234/2023"));
    let pdf = std::fs::read(dir.path().join(PDF_FILE)).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_search_log_records_outcome_before_job_finishes() {
    let dir = tempfile::tempdir().unwrap();
    let log = SearchLog::new(&dir.path().join("case_search.db")).unwrap();
    let record = success_record("W.P.(C) 1234/2023");
    let scraper = Arc::new(ScriptedScraper::new(vec![Step::Record(record.clone())]));
    let orch = orchestrator(scraper, true).with_search_log(log.clone());

    let id = orch.submit(query()).await.unwrap();
    let (view, _) = wait_terminal(&orch, &id).await;
    assert_eq!(view.status, "completed");

    assert_eq!(log.search_status(&id).unwrap(), Some(SearchOutcome::Success));
    assert_eq!(log.latest_result(&id).unwrap(), Some(record));

    let stats = log.statistics().unwrap();
    assert_eq!(stats.total_searches, 1);
    assert_eq!(stats.successful_searches, 1);
}

#[tokio::test]
async fn test_failed_search_is_logged_without_result() {
    let dir = tempfile::tempdir().unwrap();
    let log = SearchLog::new(&dir.path().join("case_search.db")).unwrap();
    let scraper = Arc::new(ScriptedScraper::new(vec![Step::Record(not_found_record())]));
    let orch = orchestrator(scraper, true).with_search_log(log.clone());
    let id = new_job(&orch, &query());

    orch.run_job(&id, query()).await;

    assert_eq!(log.search_status(&id).unwrap(), Some(SearchOutcome::NoData));
    assert_eq!(log.latest_result(&id).unwrap(), None);
    let entries = log.recent_searches(10).unwrap();
    assert_eq!(
        entries[0].error_message.as_deref(),
        Some("Case not found in court records")
    );
}

#[tokio::test]
async fn test_invalid_input_creates_no_job() {
    let scraper = Arc::new(ScriptedScraper::new(vec![Step::Record(success_record("x"))]));
    let orch = orchestrator(scraper.clone(), true);

    let err = orch.submit_form("W.P.(C)", "abc", "2023").await.unwrap_err();
    assert!(matches!(err, SubmitError::Validation(_)));
    assert_eq!(
        err.to_string(),
        "Case number and filing year must be valid numbers."
    );

    let err = orch.submit_form("W.P.(C)", "12", "1989").await.unwrap_err();
    assert_eq!(err.to_string(), "Please enter a valid filing year (1990-2030).");

    assert!(orch.store().is_empty());
    assert_eq!(scraper.calls(), 0);
}

#[tokio::test]
async fn test_unreachable_site_creates_no_job() {
    let scraper = Arc::new(ScriptedScraper::new(vec![Step::Record(success_record("x"))]));
    let orch = orchestrator(scraper.clone(), false);

    let err = orch.submit(query()).await.unwrap_err();

    assert!(matches!(err, SubmitError::Unreachable));
    assert!(orch.store().is_empty());
    assert_eq!(scraper.calls(), 0);
}

#[tokio::test]
async fn test_polled_progress_never_decreases() {
    let scraper = Arc::new(ScriptedScraper::new(vec![
        Step::Error(timeout()),
        Step::Slow(
            Duration::from_millis(40),
            success_record("W.P.(C) 1234/2023"),
        ),
    ]));
    let orch = orchestrator(scraper, true);

    let id = orch.submit(query()).await.unwrap();
    let (view, progress) = wait_terminal(&orch, &id).await;

    assert_eq!(view.status, "completed");
    assert!(progress.windows(2).all(|w| w[0] <= w[1]), "{:?}", progress);
    assert_eq!(progress.last(), Some(&100));
}

#[tokio::test]
async fn test_concurrent_jobs_publish_whole_records() {
    let steps = (0..6)
        .map(|i| {
            Step::Slow(
                Duration::from_millis(10 * (6 - i)),
                success_record(&format!("W.P.(C) {}/2023", 100 + i)),
            )
        })
        .collect();
    let scraper = Arc::new(ScriptedScraper::new(steps));
    let orch = orchestrator(scraper, true);

    let mut ids = Vec::new();
    for i in 0..6 {
        let q = SearchQuery::new("W.P.(C)", 100 + i, 2023).unwrap();
        ids.push(orch.submit(q).await.unwrap());
    }

    let reader = {
        let orch = orch.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                if let Some(latest) = orch.store().latest() {
                    assert_eq!(latest.status, CaseOutcome::Success);
                    assert!(latest.case_info.starts_with("W.P.(C) 1"));
                    assert_eq!(latest.parties, "Petitioner: A, Respondent: B");
                    assert_eq!(latest.filing_date, "12/03/2023");
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
    };

    for id in &ids {
        let (view, _) = wait_terminal(&orch, id).await;
        assert_eq!(view.status, "completed");
    }
    reader.await.unwrap();

    assert_eq!(orch.store().len(), 6);
    assert_eq!(orch.store().active_count(), 0);
    assert!(orch.store().latest().is_some());
}

#[tokio::test]
async fn test_cleared_job_still_publishes_latest() {
    let scraper = Arc::new(ScriptedScraper::new(vec![Step::Record(success_record(
        "W.P.(C) 1234/2023",
    ))]));
    let orch = orchestrator(scraper, true);
    let id = JobId::from("never-registered");

    let report = orch.run_job(&id, query()).await;

    assert_eq!(report.state, JobState::Completed);
    assert!(!orch.store().poll(&id).found);
    assert_eq!(
        orch.store().latest().unwrap().case_info,
        "W.P.(C) 1234/2023"
    );
}
