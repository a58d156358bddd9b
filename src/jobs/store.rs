//! Job status store and the latest-result slot.
//!
//! Both live behind one mutex so a terminal status and the record it
//! describes are published together. Critical sections only copy or
//! replace small structures; no I/O happens under the lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::models::{CaseRecord, JobId, JobState, JobStatus};
use crate::scrapers::ErrorKind;

/// Status entries untouched for this long are evicted on the next poll.
pub const DEFAULT_STATUS_TTL: Duration = Duration::from_secs(3600);

/// What a polling client sees for one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
    pub found: bool,
    pub status: String,
    pub message: String,
    pub progress: u8,
    pub data_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl StatusView {
    pub fn not_found() -> Self {
        Self {
            found: false,
            status: "not_found".to_string(),
            message: "Case ID not found or expired".to_string(),
            progress: 0,
            data_available: false,
            error_type: None,
            retryable: None,
        }
    }
}

/// Final outcome of a job, published atomically with its record.
#[derive(Debug, Clone)]
pub struct TerminalUpdate {
    pub state: JobState,
    pub message: String,
    pub data_ready: bool,
    pub error_type: Option<ErrorKind>,
    pub retryable: Option<bool>,
}

#[derive(Default)]
struct StoreInner {
    jobs: HashMap<JobId, JobStatus>,
    latest: Option<Arc<CaseRecord>>,
}

/// Process-wide job status table plus the latest result.
pub struct StatusStore {
    inner: Mutex<StoreInner>,
    ttl: Duration,
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusStore {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_STATUS_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
            ttl,
        }
    }

    /// A panicked writer cannot leave a half-written entry behind (every
    /// write is a single insert or assignment), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a new job in the queued state.
    pub fn create(&self, id: JobId) -> JobStatus {
        let status = JobStatus::queued();
        self.lock().jobs.insert(id, status.clone());
        status
    }

    /// Move a job to a non-terminal state.
    ///
    /// Progress never goes backwards. Returns false if the job is unknown or
    /// already terminal, in which case nothing changes.
    pub fn update(&self, id: &JobId, state: JobState, message: impl Into<String>, progress: u8) -> bool {
        let mut inner = self.lock();
        let Some(status) = inner.jobs.get_mut(id) else {
            return false;
        };
        if status.state.is_terminal() {
            debug!("Ignoring update for finished job {}", id);
            return false;
        }

        status.state = state;
        status.message = message.into();
        status.progress = status.progress.max(progress.min(100));
        status.updated_at = Utc::now();
        true
    }

    /// Change only the message of a running job.
    pub fn set_message(&self, id: &JobId, message: impl Into<String>) -> bool {
        let mut inner = self.lock();
        match inner.jobs.get_mut(id) {
            Some(status) if !status.state.is_terminal() => {
                status.message = message.into();
                status.updated_at = Utc::now();
                true
            }
            _ => false,
        }
    }

    /// Put a job in its terminal state and publish its record as the latest
    /// result, in one critical section.
    pub fn finish(&self, id: &JobId, update: TerminalUpdate, record: CaseRecord) -> bool {
        let record = Arc::new(record);
        let mut inner = self.lock();

        let Some(status) = inner.jobs.get_mut(id) else {
            // Cleared or evicted mid-flight: the result is still the latest.
            inner.latest = Some(record);
            return false;
        };
        if status.state.is_terminal() {
            return false;
        }

        status.state = update.state;
        status.message = update.message;
        status.progress = 100;
        status.data_ready = update.data_ready;
        status.error_type = update.error_type;
        status.retryable = update.retryable;
        status.updated_at = Utc::now();
        inner.latest = Some(record);
        true
    }

    /// Poll a job. Stale entries are evicted before the lookup.
    pub fn poll(&self, id: &JobId) -> StatusView {
        self.poll_at(id, Utc::now())
    }

    pub fn poll_at(&self, id: &JobId, now: DateTime<Utc>) -> StatusView {
        let mut inner = self.lock();
        evict(&mut inner, self.ttl, now);

        let has_latest = inner.latest.is_some();
        match inner.jobs.get(id) {
            Some(status) => StatusView {
                found: true,
                status: status.state.as_str().to_string(),
                message: status.message.clone(),
                progress: status.progress,
                data_available: status.data_ready && has_latest,
                error_type: status.error_type,
                retryable: status.retryable,
            },
            None => StatusView::not_found(),
        }
    }

    /// Raw status without eviction.
    pub fn get(&self, id: &JobId) -> Option<JobStatus> {
        self.lock().jobs.get(id).cloned()
    }

    /// The most recently finished record, if any.
    pub fn latest(&self) -> Option<Arc<CaseRecord>> {
        self.lock().latest.clone()
    }

    /// Drop every job and the latest result.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.jobs.clear();
        inner.latest = None;
    }

    /// Number of jobs not yet in a terminal state.
    pub fn active_count(&self) -> usize {
        self.lock()
            .jobs
            .values()
            .filter(|s| s.state.is_active())
            .count()
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn evict(inner: &mut StoreInner, ttl: Duration, now: DateTime<Utc>) {
    let ttl_secs = ttl.as_secs() as i64;
    let before = inner.jobs.len();
    inner.jobs.retain(|_, status| status.age_secs(now) <= ttl_secs);
    let evicted = before - inner.jobs.len();
    if evicted > 0 {
        debug!("Evicted {} stale job statuses", evicted);
    }
}
