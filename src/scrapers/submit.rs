//! Submitting the search form and waiting for results.

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::driver::{settle, ClickMode, PageDriver, ScrapeTimings};
use super::error::ScrapeError;
use super::locator::{find_one, is_interactable, LocateOptions, Locator};

pub const SUBMIT_CONTROLS: &[Locator] = &[
    Locator::id("search"),
    Locator::xpath("//button[@id='search']"),
    Locator::xpath("//button[contains(translate(text(), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'search')]"),
    Locator::xpath("//input[contains(translate(@value, 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'search')]"),
    Locator::xpath("//button[contains(translate(text(), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'submit')]"),
    Locator::xpath("//button[contains(translate(text(), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'get status')]"),
    Locator::xpath("//button[contains(translate(text(), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'check')]"),
    Locator::xpath("//input[@type='submit']"),
    Locator::xpath("//button[@type='submit']"),
    Locator::name("submit"),
    Locator::class("btn-search"),
    Locator::class("search"),
    Locator::class("submit"),
    Locator::xpath("//button[contains(@class, 'search')]"),
    Locator::xpath("//button[contains(@class, 'submit')]"),
    Locator::xpath("//input[contains(@class, 'search')]"),
    Locator::xpath("//input[contains(@class, 'submit')]"),
    Locator::xpath("//button[position()=1]"),
    Locator::xpath("//button[last()]"),
];

pub const LOADING_INDICATORS: &[Locator] = &[
    Locator::xpath("//*[contains(text(), 'Loading')]"),
    Locator::xpath("//*[contains(text(), 'Please wait')]"),
    Locator::class("loading"),
    Locator::id("loading"),
];

/// Which mechanism ended up submitting the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitMechanism {
    Clicked(Locator),
    ScriptClicked(Locator),
    FormSubmit,
    EnterKey,
}

pub struct Submitter<'a, D: ?Sized> {
    driver: &'a D,
    timings: &'a ScrapeTimings,
}

impl<'a, D: PageDriver + ?Sized> Submitter<'a, D> {
    pub fn new(driver: &'a D, timings: &'a ScrapeTimings) -> Self {
        Self { driver, timings }
    }

    /// Submit the form and wait for the results to render.
    pub async fn submit(&self) -> Result<SubmitMechanism, ScrapeError> {
        let mechanism = self.trigger().await?;
        info!("Search submitted ({:?})", mechanism);
        self.wait_for_results().await;
        Ok(mechanism)
    }

    /// Click the submit control, then fall back to submitting the form,
    /// then to pressing Enter.
    pub async fn trigger(&self) -> Result<SubmitMechanism, ScrapeError> {
        let opts = LocateOptions::new(
            self.timings.submit_locate_timeout,
            self.timings.poll_interval,
        );

        for locator in SUBMIT_CONTROLS {
            let Some(info) = find_one(self.driver, locator, opts, is_interactable).await else {
                continue;
            };
            debug!("Submit control {} found (text '{}')", locator, info.text);

            match self.driver.click(locator, ClickMode::Native).await {
                Ok(()) => return Ok(SubmitMechanism::Clicked(locator.clone())),
                Err(e) => debug!("Native click on {} failed: {}", locator, e),
            }
            match self.driver.click(locator, ClickMode::Script).await {
                Ok(()) => return Ok(SubmitMechanism::ScriptClicked(locator.clone())),
                Err(e) => debug!("Script click on {} failed: {}", locator, e),
            }
        }

        warn!("No submit control could be clicked, submitting form directly");
        match self.driver.submit_form().await {
            Ok(()) => return Ok(SubmitMechanism::FormSubmit),
            Err(e) => debug!("Form submit failed: {}", e),
        }

        warn!("Form submit failed, pressing Enter on the focused element");
        match self.driver.press_enter().await {
            Ok(()) => return Ok(SubmitMechanism::EnterKey),
            Err(e) => debug!("Enter key failed: {}", e),
        }

        Err(ScrapeError::ElementNotFound(
            "search submit control".to_string(),
        ))
    }

    /// Settle, wait out the first visible loading indicator, settle again.
    pub async fn wait_for_results(&self) {
        settle(self.timings.post_submit_settle).await;

        if let Ok(url) = self.driver.current_url().await {
            debug!("URL after submit: {}", url);
        }

        for locator in LOADING_INDICATORS {
            let visible = matches!(
                self.driver.probe(locator).await,
                Ok(Some(ref info)) if info.visible
            );
            if !visible {
                continue;
            }

            info!("Waiting for loading indicator {} to clear", locator);
            let deadline = Instant::now() + self.timings.loading_timeout;
            loop {
                let still_visible = matches!(
                    self.driver.probe(locator).await,
                    Ok(Some(ref info)) if info.visible
                );
                if !still_visible {
                    break;
                }
                if Instant::now() >= deadline {
                    warn!("Loading indicator still visible after timeout");
                    break;
                }
                settle(self.timings.poll_interval).await;
            }
            break;
        }

        settle(self.timings.post_loading_settle).await;
    }
}
