//! One end-to-end scrape: launch, navigate, fill, submit, extract, release.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::driver::{settle, PageDriver, ScrapeTimings};
use super::error::{DriverError, ScrapeError};
use super::extract::extract;
use super::form::FormFiller;
use super::submit::Submitter;
use crate::models::{CaseRecord, SearchQuery};

/// Navigation attempts before giving up on the court website.
pub const DEFAULT_NAVIGATION_ATTEMPTS: u32 = 3;

/// Anything that can turn a query into a case record.
///
/// `Ok` covers every page-level outcome, including "case not found".
/// `Err` means the session itself broke and may be worth retrying.
#[async_trait]
pub trait CaseScraper: Send + Sync {
    async fn scrape(&self, query: &SearchQuery) -> Result<CaseRecord, ScrapeError>;

    /// Verify the scraper could run at all, without searching.
    async fn check(&self) -> Result<(), ScrapeError> {
        Ok(())
    }
}

/// Starts browser instances.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ScrapeError>;
}

/// A running browser owned by one scrape.
#[async_trait]
pub trait BrowserSession: Send {
    async fn open_page(&mut self) -> Result<Box<dyn PageDriver>, ScrapeError>;

    /// Shut the browser down. Errors are logged, never raised.
    async fn close(self: Box<Self>);
}

/// Settings for a single session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Full URL of the case-status search form.
    pub search_url: String,
    pub navigation_attempts: u32,
    pub timings: ScrapeTimings,
}

impl SessionConfig {
    pub fn new(search_url: impl Into<String>) -> Self {
        Self {
            search_url: search_url.into(),
            navigation_attempts: DEFAULT_NAVIGATION_ATTEMPTS,
            timings: ScrapeTimings::default(),
        }
    }

    pub fn with_timings(mut self, timings: ScrapeTimings) -> Self {
        self.timings = timings;
        self
    }
}

/// Drives one page through the search flow.
pub struct ScrapeSession<'a, D: ?Sized> {
    driver: &'a D,
    config: &'a SessionConfig,
}

impl<'a, D: PageDriver + ?Sized> ScrapeSession<'a, D> {
    pub fn new(driver: &'a D, config: &'a SessionConfig) -> Self {
        Self { driver, config }
    }

    pub async fn run(&self, query: &SearchQuery) -> Result<CaseRecord, ScrapeError> {
        let timings = &self.config.timings;

        self.navigate().await?;

        settle(timings.pre_fill_settle).await;
        let report = FormFiller::new(self.driver, timings).fill(query).await;
        if !report.all_filled() {
            warn!("Form partially filled for {}: {:?}", query, report);
        }
        settle(timings.post_fill_settle).await;

        Submitter::new(self.driver, timings).submit().await?;

        settle(timings.pre_extract_settle).await;
        let snapshot = self.driver.snapshot().await?;
        if let Ok(title) = self.driver.title().await {
            debug!("Results page '{}' at {}", title, snapshot.url);
        }

        Ok(extract(&snapshot, &self.config.search_url))
    }

    /// Load the search form, retrying with a fixed delay.
    pub async fn navigate(&self) -> Result<(), ScrapeError> {
        let attempts = self.config.navigation_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            info!(
                "Navigating to {} (attempt {}/{})",
                self.config.search_url, attempt, attempts
            );
            match self.load_once().await {
                Ok(()) => {
                    if let Ok(title) = self.driver.title().await {
                        info!("Loaded '{}'", title);
                    }
                    return Ok(());
                }
                Err(e) => {
                    warn!("Navigation attempt {} failed: {}", attempt, e);
                    last_error = e.to_string();
                    if attempt < attempts {
                        settle(self.config.timings.navigation_retry_delay).await;
                    }
                }
            }
        }

        Err(ScrapeError::Navigation {
            attempts,
            last_error,
        })
    }

    async fn load_once(&self) -> Result<(), DriverError> {
        let timings = &self.config.timings;
        let load = async {
            self.driver.goto(&self.config.search_url).await?;
            loop {
                if self.driver.ready_state().await? == "complete" {
                    return Ok::<(), DriverError>(());
                }
                settle(timings.poll_interval).await;
            }
        };

        match tokio::time::timeout(timings.page_load_timeout, load).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(DriverError::Timeout(format!(
                    "page did not finish loading within {}s",
                    timings.page_load_timeout.as_secs()
                )))
            }
        }

        settle(timings.post_load_settle).await;
        Ok(())
    }
}

/// Production scraper: a fresh browser per scrape, always released.
pub struct BrowserScraper<L> {
    launcher: L,
    config: SessionConfig,
}

impl<L: BrowserLauncher> BrowserScraper<L> {
    pub fn new(launcher: L, config: SessionConfig) -> Self {
        Self { launcher, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

#[async_trait]
impl<L: BrowserLauncher> CaseScraper for BrowserScraper<L> {
    async fn scrape(&self, query: &SearchQuery) -> Result<CaseRecord, ScrapeError> {
        let mut browser = self.launcher.launch().await?;

        let result = match browser.open_page().await {
            Ok(page) => ScrapeSession::new(page.as_ref(), &self.config).run(query).await,
            Err(e) => Err(e),
        };

        browser.close().await;
        debug!("Browser released for {}", query);
        result
    }

    async fn check(&self) -> Result<(), ScrapeError> {
        let mut browser = self.launcher.launch().await?;
        let page = browser.open_page().await.map(drop);
        browser.close().await;
        page
    }
}
