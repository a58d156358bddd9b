//! Page automation seam.
//!
//! The session, form filler and submitter talk to the court website only
//! through [`PageDriver`]. Production uses the CDP implementation in
//! [`super::browser`]; tests script a fake page.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::DriverError;
use super::locator::Locator;

/// One option of a `<select>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
}

/// What a probe learned about a located element.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementInfo {
    /// Lowercase tag name.
    pub tag: String,
    pub visible: bool,
    pub enabled: bool,
    /// Trimmed rendered text (or the current value for form inputs).
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub options: Vec<SelectOption>,
}

impl ElementInfo {
    pub fn is_select(&self) -> bool {
        self.tag.eq_ignore_ascii_case("select")
    }
}

/// How to choose an option in a `<select>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectMethod {
    /// Option whose `value` attribute equals the string.
    ByValue(String),
    /// Option whose visible text equals the string.
    ByText(String),
    /// Option whose visible text contains the string, ignoring case.
    ByPartialText(String),
    /// Click the option element whose value or text equals the string.
    ClickOption(String),
    /// Assign the control's value by script and fire a change event.
    ScriptAssign(String),
}

impl SelectMethod {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ByValue(_) => "value",
            Self::ByText(_) => "visible text",
            Self::ByPartialText(_) => "partial text",
            Self::ClickOption(_) => "option click",
            Self::ScriptAssign(_) => "script assignment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClickMode {
    /// Scroll into view and dispatch a real mouse click.
    Native,
    /// Call `element.click()` from page script.
    Script,
}

/// The rendered page, as handed to the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub url: String,
    pub html: String,
}

/// Browser page operations used by a scrape session.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), DriverError>;

    /// `document.readyState` of the current document.
    async fn ready_state(&self) -> Result<String, DriverError>;

    async fn current_url(&self) -> Result<String, DriverError>;

    async fn title(&self) -> Result<String, DriverError>;

    /// Serialized DOM of the current document.
    async fn content(&self) -> Result<String, DriverError>;

    /// Look up one element. `Ok(None)` means the locator matched nothing.
    async fn probe(&self, locator: &Locator) -> Result<Option<ElementInfo>, DriverError>;

    /// Clear a text control and type into it.
    async fn fill(&self, locator: &Locator, text: &str) -> Result<(), DriverError>;

    async fn select(&self, locator: &Locator, method: &SelectMethod) -> Result<(), DriverError>;

    async fn click(&self, locator: &Locator, mode: ClickMode) -> Result<(), DriverError>;

    /// Submit the first form on the page directly.
    async fn submit_form(&self) -> Result<(), DriverError>;

    /// Press Enter on the focused element.
    async fn press_enter(&self) -> Result<(), DriverError>;

    /// Capture the current URL and DOM.
    async fn snapshot(&self) -> Result<PageSnapshot, DriverError> {
        let url = self.current_url().await?;
        let html = self.content().await?;
        Ok(PageSnapshot { url, html })
    }
}

/// Waits used throughout a scrape session.
///
/// Defaults mirror what the court website needs in practice; tests zero them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeTimings {
    /// Upper bound on a single navigation and its ready-state wait.
    pub page_load_timeout: Duration,
    /// Settle time after the document reports ready.
    pub post_load_settle: Duration,
    /// Pause between navigation attempts.
    pub navigation_retry_delay: Duration,
    /// Settle time before touching the form.
    pub pre_fill_settle: Duration,
    /// Settle time between filling and submitting.
    pub post_fill_settle: Duration,
    /// Settle time right after submission.
    pub post_submit_settle: Duration,
    /// Upper bound on waiting for a loading indicator to clear.
    pub loading_timeout: Duration,
    /// Settle time after the loading indicator clears.
    pub post_loading_settle: Duration,
    /// Settle time before taking the final snapshot.
    pub pre_extract_settle: Duration,
    /// Per-strategy wait when locating form fields.
    pub locate_timeout: Duration,
    /// Per-strategy wait when locating the submit control.
    pub submit_locate_timeout: Duration,
    /// Delay between probes while waiting on an element.
    pub poll_interval: Duration,
}

impl Default for ScrapeTimings {
    fn default() -> Self {
        Self {
            page_load_timeout: Duration::from_secs(45),
            post_load_settle: Duration::from_secs(5),
            navigation_retry_delay: Duration::from_secs(5),
            pre_fill_settle: Duration::from_secs(3),
            post_fill_settle: Duration::from_secs(2),
            post_submit_settle: Duration::from_secs(10),
            loading_timeout: Duration::from_secs(30),
            post_loading_settle: Duration::from_secs(5),
            pre_extract_settle: Duration::from_secs(5),
            locate_timeout: Duration::from_secs(5),
            submit_locate_timeout: Duration::from_secs(3),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl ScrapeTimings {
    /// No waiting at all. Element lookups still probe each strategy once.
    pub fn immediate() -> Self {
        Self {
            page_load_timeout: Duration::from_secs(5),
            post_load_settle: Duration::ZERO,
            navigation_retry_delay: Duration::ZERO,
            pre_fill_settle: Duration::ZERO,
            post_fill_settle: Duration::ZERO,
            post_submit_settle: Duration::ZERO,
            loading_timeout: Duration::ZERO,
            post_loading_settle: Duration::ZERO,
            pre_extract_settle: Duration::ZERO,
            locate_timeout: Duration::ZERO,
            submit_locate_timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
        }
    }
}

/// Sleep for the duration. A zero duration still yields to the scheduler
/// so polling loops stay cancellable.
pub(crate) async fn settle(duration: Duration) {
    if duration.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(duration).await;
    }
}
