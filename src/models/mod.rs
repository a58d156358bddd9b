//! Data models for casefetch.

mod case_record;
mod job;
mod query;

pub use case_record::{truncate_chars, CaseOutcome, CaseRecord, NOT_AVAILABLE, RAW_CONTENT_LIMIT};
pub use job::{JobId, JobState, JobStatus};
pub use query::{SearchQuery, ValidationError, MAX_FILING_YEAR, MIN_FILING_YEAR};
