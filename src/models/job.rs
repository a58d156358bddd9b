//! Background job identity and progress models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SearchQuery;
use crate::scrapers::ErrorKind;

/// Handle for one scrape attempt, derived from the query and creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Derive a new id. A short random suffix keeps ids unique when the same
    /// query is submitted twice within the same millisecond.
    pub fn new(query: &SearchQuery, created_at: DateTime<Utc>) -> Self {
        let case_type: String = query
            .case_type()
            .chars()
            .map(|c| {
                if c.is_whitespace() || c == '/' || c == '?' || c == '#' {
                    '-'
                } else {
                    c
                }
            })
            .collect();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}_{}_{}_{}_{}",
            case_type,
            query.case_number(),
            query.filing_year(),
            created_at.timestamp_millis(),
            &suffix[..8]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Starting,
    Running,
    Completed,
    CompletedWithWarning,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::CompletedWithWarning => "completed_with_warning",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "starting" => Some(Self::Starting),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "completed_with_warning" => Some(Self::CompletedWithWarning),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::CompletedWithWarning | Self::Failed
        )
    }

    /// Whether a job in this state is still being worked on.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

/// Progress record for one job, as seen by polling clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,
    pub message: String,
    /// 0-100, non-decreasing within an attempt.
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub data_ready: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl JobStatus {
    /// Fresh status for a newly accepted request.
    pub fn queued() -> Self {
        let now = Utc::now();
        Self {
            state: JobState::Queued,
            message: "Search request received, starting soon...".to_string(),
            progress: 5,
            created_at: now,
            updated_at: now,
            data_ready: false,
            error_type: None,
            retryable: None,
        }
    }

    /// Seconds since the last update.
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.updated_at).num_seconds()
    }
}
