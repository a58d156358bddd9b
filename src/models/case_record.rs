//! Normalized case-status record produced by a scrape session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scrapers::ErrorKind;

/// Sentinel stored in any field the result page did not yield.
pub const NOT_AVAILABLE: &str = "N/A";

/// Number of characters of localized page text kept for diagnosis.
pub const RAW_CONTENT_LIMIT: usize = 1000;

/// Overall outcome of an extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseOutcome {
    Success,
    Failed,
}

impl CaseOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failed => "Failed",
        }
    }
}

/// A case-status record.
///
/// Built once by the extractor (or by the orchestrator for failed jobs) and
/// never mutated after it is handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub status: CaseOutcome,
    pub case_info: String,
    pub parties: String,
    pub filing_date: String,
    pub next_hearing: String,
    pub case_status: String,
    pub judge: String,
    pub advocate: String,
    pub pdf_link: String,
    pub extracted_at: DateTime<Utc>,
    /// Page URL the record was extracted from.
    pub source_url: String,
    /// Localized page text, truncated to [`RAW_CONTENT_LIMIT`] characters.
    pub raw_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl CaseRecord {
    /// A successful record with every field at the sentinel.
    pub fn blank(source_url: &str, extracted_at: DateTime<Utc>) -> Self {
        Self {
            status: CaseOutcome::Success,
            case_info: NOT_AVAILABLE.to_string(),
            parties: NOT_AVAILABLE.to_string(),
            filing_date: NOT_AVAILABLE.to_string(),
            next_hearing: NOT_AVAILABLE.to_string(),
            case_status: NOT_AVAILABLE.to_string(),
            judge: NOT_AVAILABLE.to_string(),
            advocate: NOT_AVAILABLE.to_string(),
            pdf_link: NOT_AVAILABLE.to_string(),
            extracted_at,
            source_url: source_url.to_string(),
            raw_content: String::new(),
            error: None,
            error_type: None,
            retryable: None,
        }
    }

    /// A failed record carrying a diagnostic message.
    pub fn failed(message: impl Into<String>, extracted_at: DateTime<Utc>) -> Self {
        Self {
            status: CaseOutcome::Failed,
            error: Some(message.into()),
            ..Self::blank("", extracted_at)
        }
    }

    /// Attach an error classification to a failed record.
    pub fn with_error_kind(mut self, kind: ErrorKind) -> Self {
        self.error_type = Some(kind);
        self.retryable = Some(kind.is_retryable());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == CaseOutcome::Success
    }

    /// Whether any of the case-identifying fields were recovered.
    pub fn has_meaningful_data(&self) -> bool {
        [
            &self.case_info,
            &self.parties,
            &self.filing_date,
            &self.next_hearing,
            &self.case_status,
        ]
        .iter()
        .any(|v| v.as_str() != NOT_AVAILABLE)
    }

    /// Field name/value pairs in display order, used by the exporters.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("status", self.status.as_str().to_string()),
            ("case_info", self.case_info.clone()),
            ("parties", self.parties.clone()),
            ("filing_date", self.filing_date.clone()),
            ("next_hearing", self.next_hearing.clone()),
            ("case_status", self.case_status.clone()),
            ("judge", self.judge.clone()),
            ("advocate", self.advocate.clone()),
            ("pdf_link", self.pdf_link.clone()),
            (
                "extracted_at",
                self.extracted_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ),
            ("source_url", self.source_url.clone()),
            ("raw_content", self.raw_content.clone()),
        ];
        if let Some(ref error) = self.error {
            fields.push(("error", error.clone()));
        }
        fields
    }
}

/// Truncate to at most `limit` characters on a char boundary.
pub fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_record_has_no_meaningful_data() {
        let record = CaseRecord::blank("https://example.org", Utc::now());
        assert!(record.is_success());
        assert!(!record.has_meaningful_data());
        assert_eq!(record.pdf_link, NOT_AVAILABLE);
    }

    #[test]
    fn test_failed_record_carries_classification() {
        let record = CaseRecord::failed("boom", Utc::now()).with_error_kind(ErrorKind::Timeout);
        assert_eq!(record.status, CaseOutcome::Failed);
        assert_eq!(record.error.as_deref(), Some("boom"));
        assert_eq!(record.retryable, Some(true));
    }

    #[test]
    fn test_fields_include_error_only_when_present() {
        let ok = CaseRecord::blank("u", Utc::now());
        assert!(!ok.fields().iter().any(|(k, _)| *k == "error"));

        let failed = CaseRecord::failed("nope", Utc::now());
        assert!(failed.fields().iter().any(|(k, v)| *k == "error" && v == "nope"));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_serialized_status_names() {
        let record = CaseRecord::blank("u", Utc::now());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "Success");
        assert!(json.get("error").is_none());
    }
}
