//! Background search jobs: validation, pre-flight probe, retrying scrape,
//! export and persistence, and the status updates polling clients see.

use std::fmt::Display;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::probe::HostProbe;
use super::retry::RetryPolicy;
use super::store::{StatusStore, TerminalUpdate};
use crate::export::CaseExporter;
use crate::models::{CaseRecord, JobId, JobState, SearchQuery, ValidationError};
use crate::repository::{SearchLog, SearchOutcome};
use crate::scrapers::{CaseScraper, ScrapeError};

pub const STARTING_MESSAGE: &str = "Initializing case search...";
pub const RUNNING_MESSAGE: &str = "Browser initialized, accessing court website...";
pub const PROCESSING_MESSAGE: &str = "Processing retrieved data...";
pub const COMPLETED_MESSAGE: &str = "Case information retrieved and saved successfully!";
pub const EXPORT_WARNING_MESSAGE: &str = "Case information retrieved but file saving failed";

/// Why a search request was turned away before a job existed.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Delhi High Court website is currently not accessible. Please try again later.")]
    Unreachable,
}

/// What happened inside one job, for callers that run it inline.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub state: JobState,
    pub attempts: u32,
    /// Backoff slept before each retry, in order.
    pub delays: Vec<Duration>,
    pub record: CaseRecord,
}

/// Runs search jobs against a scraper and publishes their progress.
#[derive(Clone)]
pub struct Orchestrator {
    scraper: Arc<dyn CaseScraper>,
    probe: Arc<dyn HostProbe>,
    store: Arc<StatusStore>,
    exporter: Option<Arc<dyn CaseExporter>>,
    search_log: Option<SearchLog>,
    policy: RetryPolicy,
}

impl Orchestrator {
    pub fn new(
        scraper: Arc<dyn CaseScraper>,
        probe: Arc<dyn HostProbe>,
        store: Arc<StatusStore>,
    ) -> Self {
        Self {
            scraper,
            probe,
            store,
            exporter: None,
            search_log: None,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn CaseExporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn with_search_log(mut self, log: SearchLog) -> Self {
        self.search_log = Some(log);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &Arc<StatusStore> {
        &self.store
    }

    pub fn scraper(&self) -> &Arc<dyn CaseScraper> {
        &self.scraper
    }

    pub fn probe(&self) -> &Arc<dyn HostProbe> {
        &self.probe
    }

    pub fn exporter(&self) -> Option<&Arc<dyn CaseExporter>> {
        self.exporter.as_ref()
    }

    pub fn search_log(&self) -> Option<&SearchLog> {
        self.search_log.as_ref()
    }

    /// Validate raw form input, then [`submit`](Self::submit) it.
    pub async fn submit_form(
        &self,
        case_type: &str,
        case_number: &str,
        filing_year: &str,
    ) -> Result<JobId, SubmitError> {
        let query = SearchQuery::parse(case_type, case_number, filing_year)?;
        self.submit(query).await
    }

    /// Accept a search and start it in the background.
    ///
    /// Returns as soon as the job is queued. Nothing is created when the
    /// court website does not answer the probe.
    pub async fn submit(&self, query: SearchQuery) -> Result<JobId, SubmitError> {
        if !self.probe.is_reachable().await {
            warn!("Rejecting search for {}: court website unreachable", query);
            return Err(SubmitError::Unreachable);
        }

        let id = JobId::new(&query, Utc::now());
        self.store.create(id.clone());
        info!("Queued search {} for {}", id, query);

        let this = self.clone();
        let job_id = id.clone();
        tokio::spawn(async move {
            let report = this.run_job(&job_id, query).await;
            debug!(
                "Job {} finished as {} after {} attempt(s)",
                job_id,
                report.state.as_str(),
                report.attempts
            );
        });

        Ok(id)
    }

    /// Run a queued job to its terminal state.
    ///
    /// The job must already exist in the store; updates for unknown ids are
    /// dropped, but the final record is still published as the latest result.
    pub async fn run_job(&self, id: &JobId, query: SearchQuery) -> JobReport {
        let started = Instant::now();
        self.blocking("log search start", {
            let log = self.search_log.clone();
            let (id, query) = (id.clone(), query.clone());
            move || match log {
                Some(log) => log.log_search_start(&id, &query),
                None => Ok(()),
            }
        })
        .await;

        self.store
            .update(id, JobState::Starting, STARTING_MESSAGE, 10);
        self.store.update(id, JobState::Running, RUNNING_MESSAGE, 30);

        let mut delays = Vec::new();
        let (result, attempts) = self.scrape_with_retry(id, &query, &mut delays).await;

        let (update, record, outcome, log_error) = match result {
            Ok(record) if record.is_success() => {
                self.store
                    .update(id, JobState::Running, PROCESSING_MESSAGE, 90);
                let exported = self.export(&record).await;
                if exported {
                    info!("Case data for {} retrieved and saved", id);
                    (
                        terminal(JobState::Completed, COMPLETED_MESSAGE, true),
                        record,
                        SearchOutcome::Success,
                        None,
                    )
                } else {
                    (
                        terminal(JobState::CompletedWithWarning, EXPORT_WARNING_MESSAGE, true),
                        record,
                        SearchOutcome::SuccessWithWarning,
                        Some("File saving failed".to_string()),
                    )
                }
            }
            Ok(record) => {
                self.store
                    .update(id, JobState::Running, PROCESSING_MESSAGE, 90);
                let reason = record
                    .error
                    .clone()
                    .unwrap_or_else(|| "Case not found or scraping failed".to_string());
                warn!("No data found for {}: {}", id, reason);
                (
                    terminal(
                        JobState::Failed,
                        &format!("Search completed but no data found: {}", reason),
                        false,
                    ),
                    record,
                    SearchOutcome::NoData,
                    Some(reason),
                )
            }
            Err(e) => {
                let kind = e.kind();
                let message = e.user_message();
                error!("Search {} failed ({}): {}", id, kind, e);
                let record = CaseRecord::failed(message.clone(), Utc::now()).with_error_kind(kind);
                let update = TerminalUpdate {
                    state: JobState::Failed,
                    message,
                    data_ready: false,
                    error_type: Some(kind),
                    retryable: Some(kind.is_retryable()),
                };
                (update, record, SearchOutcome::Failed, Some(e.to_string()))
            }
        };

        let elapsed = started.elapsed();
        self.blocking("log search result", {
            let log = self.search_log.clone();
            let (id, record) = (id.clone(), record.clone());
            move || match log {
                Some(log) => log.log_search_result(
                    &id,
                    outcome,
                    Some(&record),
                    Some(elapsed),
                    log_error.as_deref(),
                ),
                None => Ok(()),
            }
        })
        .await;

        let state = update.state;
        self.store.finish(id, update, record.clone());

        JobReport {
            state,
            attempts,
            delays,
            record,
        }
    }

    async fn scrape_with_retry(
        &self,
        id: &JobId,
        query: &SearchQuery,
        delays: &mut Vec<Duration>,
    ) -> (Result<CaseRecord, ScrapeError>, u32) {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let progress = (30 + 20 * attempt).min(90) as u8;
            self.store.update(
                id,
                JobState::Running,
                format!(
                    "Searching case information (attempt {}/{})...",
                    attempt, max_attempts
                ),
                progress,
            );

            let err = match self.scrape_once(query).await {
                Ok(record) => return (Ok(record), attempt),
                Err(e) => e,
            };

            let kind = err.kind();
            warn!(
                "Attempt {}/{} for {} failed ({}): {}",
                attempt, max_attempts, id, kind, err
            );

            let delay = if attempt < max_attempts {
                self.policy.next_delay(attempt, kind)
            } else {
                None
            };
            let Some(delay) = delay else {
                return (Err(err), attempt);
            };

            self.store.set_message(
                id,
                format!(
                    "Retrying in {}... (attempt {}/{})",
                    describe_delay(delay),
                    attempt + 1,
                    max_attempts
                ),
            );
            delays.push(delay);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    /// One scrape with panics turned into errors, so a bug in the scraper
    /// still ends the job in `failed`.
    async fn scrape_once(&self, query: &SearchQuery) -> Result<CaseRecord, ScrapeError> {
        match AssertUnwindSafe(self.scraper.scrape(query)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(ScrapeError::Other(format!("Scraper panicked: {}", detail)))
            }
        }
    }

    async fn export(&self, record: &CaseRecord) -> bool {
        let Some(exporter) = self.exporter.clone() else {
            return true;
        };
        let record = record.clone();
        self.blocking("export case data", move || exporter.export(&record))
            .await
    }

    /// Run blocking I/O off the runtime. Failures are logged and reported
    /// as `false`; they never fail the job.
    async fn blocking<E, F>(&self, what: &str, f: F) -> bool
    where
        E: Display + Send + 'static,
        F: FnOnce() -> Result<(), E> + Send + 'static,
    {
        match tokio::task::spawn_blocking(f).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("Failed to {}: {}", what, e);
                false
            }
            Err(e) => {
                warn!("Failed to {}: {}", what, e);
                false
            }
        }
    }
}

fn terminal(state: JobState, message: &str, data_ready: bool) -> TerminalUpdate {
    TerminalUpdate {
        state,
        message: message.to_string(),
        data_ready,
        error_type: None,
        retryable: None,
    }
}

fn describe_delay(delay: Duration) -> String {
    if delay.subsec_millis() == 0 && delay.as_secs() > 0 {
        format!("{} seconds", delay.as_secs())
    } else {
        format!("{} ms", delay.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_delay() {
        assert_eq!(describe_delay(Duration::from_secs(4)), "4 seconds");
        assert_eq!(describe_delay(Duration::from_millis(20)), "20 ms");
    }

    #[test]
    fn test_submit_error_messages() {
        let err = SubmitError::from(ValidationError::YearOutOfRange);
        assert_eq!(
            err.to_string(),
            "Please enter a valid filing year (1990-2030)."
        );
        assert!(SubmitError::Unreachable
            .to_string()
            .contains("not accessible"));
    }
}
