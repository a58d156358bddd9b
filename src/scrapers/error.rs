//! Scrape error types and their closed classification.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed classification of scrape failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Timeout,
    Network,
    DnsError,
    BrowserError,
    ElementNotFound,
    Unknown,
}

impl ErrorKind {
    /// Classify a failure from its message text.
    ///
    /// Checks run in a fixed order; the first match wins.
    pub fn classify(message: &str) -> Self {
        let msg = message.to_lowercase();
        if msg.contains("timeout") || msg.contains("timed out") {
            Self::Timeout
        } else if msg.contains("connection") || msg.contains("network") {
            Self::Network
        } else if msg.contains("dns") || msg.contains("name resolution") {
            Self::DnsError
        } else if msg.contains("browser")
            || msg.contains("webdriver")
            || msg.contains("chrome")
            || msg.contains("cdp")
        {
            Self::BrowserError
        } else if msg.contains("element not found") || msg.contains("no such element") {
            Self::ElementNotFound
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "TIMEOUT",
            Self::Network => "NETWORK",
            Self::DnsError => "DNS_ERROR",
            Self::BrowserError => "BROWSER_ERROR",
            Self::ElementNotFound => "ELEMENT_NOT_FOUND",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Only transient kinds are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Network | Self::ElementNotFound)
    }

    /// Message shown to the user for this kind. `detail` is only used for
    /// unclassified errors.
    pub fn user_message(&self, detail: &str) -> String {
        match self {
            Self::Timeout => {
                "Request timed out. The court website is responding slowly. Please try again."
                    .to_string()
            }
            Self::Network => {
                "Network connection issue. Please check your internet connection and try again."
                    .to_string()
            }
            Self::DnsError => {
                "Unable to reach the court website. Please check your internet connection."
                    .to_string()
            }
            Self::BrowserError => {
                "Browser setup issue. Please try refreshing the page or contact support."
                    .to_string()
            }
            Self::ElementNotFound => {
                "Court website layout has changed. Please try again or contact support."
                    .to_string()
            }
            Self::Unknown => {
                let short: String = detail.chars().take(100).collect();
                format!("An unexpected error occurred: {}...", short)
            }
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single page operation failed.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    #[error("Timeout: {0}")]
    Timeout(String),
    #[error("Element not found: {0}")]
    ElementNotFound(String),
    #[error("Element not interactable: {0}")]
    NotInteractable(String),
    #[error("Browser protocol error: {0}")]
    Protocol(String),
    #[error("Script error: {0}")]
    Script(String),
}

impl DriverError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::ElementNotFound(_) => ErrorKind::ElementNotFound,
            Self::NotInteractable(msg) | Self::Script(msg) => ErrorKind::classify(msg),
            Self::Protocol(msg) => match ErrorKind::classify(msg) {
                ErrorKind::Unknown => ErrorKind::BrowserError,
                kind => kind,
            },
        }
    }
}

/// A scrape session could not produce a record.
#[derive(Debug, Clone, Error)]
pub enum ScrapeError {
    #[error("Failed to start browser: {0}")]
    Launch(String),
    #[error("Failed to load court website after {attempts} attempts: {last_error}")]
    Navigation { attempts: u32, last_error: String },
    #[error("Element not found: {0}")]
    ElementNotFound(String),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("{0}")]
    Other(String),
}

impl ScrapeError {
    /// Classify this error for the retry policy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Launch(msg) => match ErrorKind::classify(msg) {
                ErrorKind::Timeout => ErrorKind::Timeout,
                _ => ErrorKind::BrowserError,
            },
            Self::Navigation { last_error, .. } => match ErrorKind::classify(last_error) {
                ErrorKind::Unknown | ErrorKind::BrowserError => ErrorKind::Network,
                kind => kind,
            },
            Self::ElementNotFound(_) => ErrorKind::ElementNotFound,
            Self::Driver(e) => e.kind(),
            Self::Other(msg) => ErrorKind::classify(msg),
        }
    }

    pub fn user_message(&self) -> String {
        self.kind().user_message(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_order() {
        assert_eq!(ErrorKind::classify("operation timed out"), ErrorKind::Timeout);
        assert_eq!(
            ErrorKind::classify("Connection timeout to host"),
            ErrorKind::Timeout
        );
        assert_eq!(ErrorKind::classify("connection refused"), ErrorKind::Network);
        assert_eq!(
            ErrorKind::classify("temporary failure in name resolution"),
            ErrorKind::DnsError
        );
        assert_eq!(
            ErrorKind::classify("WebDriver session died"),
            ErrorKind::BrowserError
        );
        assert_eq!(
            ErrorKind::classify("no such element: #search"),
            ErrorKind::ElementNotFound
        );
        assert_eq!(ErrorKind::classify("something odd"), ErrorKind::Unknown);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ErrorKind::Timeout.is_retryable());
        assert!(ErrorKind::Network.is_retryable());
        assert!(ErrorKind::ElementNotFound.is_retryable());
        assert!(!ErrorKind::DnsError.is_retryable());
        assert!(!ErrorKind::BrowserError.is_retryable());
        assert!(!ErrorKind::Unknown.is_retryable());
    }

    #[test]
    fn test_unknown_message_is_truncated() {
        let detail = "x".repeat(300);
        let msg = ErrorKind::Unknown.user_message(&detail);
        assert_eq!(msg.len(), "An unexpected error occurred: ...".len() + 100);
    }

    #[test]
    fn test_scrape_error_kinds() {
        assert_eq!(
            ScrapeError::Launch("Chrome/Chromium not found".into()).kind(),
            ErrorKind::BrowserError
        );
        assert_eq!(
            ScrapeError::Navigation {
                attempts: 3,
                last_error: "page load timeout".into()
            }
            .kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            ScrapeError::Navigation {
                attempts: 3,
                last_error: "net::ERR_ABORTED".into()
            }
            .kind(),
            ErrorKind::Network
        );
        assert_eq!(
            ScrapeError::from(DriverError::Protocol("ws closed".into())).kind(),
            ErrorKind::BrowserError
        );
        assert_eq!(
            ScrapeError::ElementNotFound("submit control".into()).kind(),
            ErrorKind::ElementNotFound
        );
    }

    #[test]
    fn test_kind_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::ElementNotFound).unwrap(),
            "\"ELEMENT_NOT_FOUND\""
        );
        assert_eq!(ErrorKind::DnsError.to_string(), "DNS_ERROR");
    }
}
