//! Filling the case-status search form.

use tracing::{debug, info, warn};

use super::driver::{ElementInfo, PageDriver, ScrapeTimings, SelectMethod};
use super::locator::{find_one, is_interactable, is_visible, locate, LocateOptions, Locator};
use crate::models::SearchQuery;

/// Where the case type control has lived across site revisions.
pub const CASE_TYPE_FIELDS: &[Locator] = &[
    Locator::name("case_type"),
    Locator::id("case_type"),
    Locator::name("caseType"),
    Locator::id("caseType"),
    Locator::xpath("//select[contains(@class, 'case')]"),
    Locator::xpath("//select[contains(@name, 'type')]"),
    Locator::xpath("//select[position()=1]"),
    Locator::xpath("//input[contains(@name, 'type')]"),
    Locator::xpath("//select[@aria-label='Case Type']"),
];

pub const CASE_NUMBER_FIELDS: &[Locator] = &[
    Locator::name("case_number"),
    Locator::id("case_number"),
    Locator::name("caseNumber"),
    Locator::id("caseNumber"),
    Locator::name("case_no"),
    Locator::id("case_no"),
    Locator::xpath("//input[contains(@name, 'number')]"),
    Locator::xpath("//input[contains(@placeholder, 'number')]"),
    Locator::xpath("//input[@type='number']"),
    Locator::xpath("//input[@type='text'][1]"),
];

pub const FILING_YEAR_FIELDS: &[Locator] = &[
    Locator::name("case_year"),
    Locator::id("case_year"),
    Locator::xpath("/html/body/div[3]/div/div/div/div/div/div/div[1]/div[3]/div/select"),
    Locator::xpath("//select[contains(@name, 'year')]"),
    Locator::xpath("//select[contains(@id, 'year')]"),
    Locator::xpath("//select[position()=2]"),
    Locator::xpath("//select[last()]"),
];

/// The element displaying the plain-text captcha.
pub const CAPTCHA_CODE_FIELDS: &[Locator] = &[
    Locator::id("captcha-code"),
    Locator::xpath("/html/body/div[3]/div/div/div/div/div/div/div[2]/div[1]/div/label/span"),
    Locator::class("captcha-code"),
    Locator::xpath("//span[contains(@class, 'captcha-code')]"),
    Locator::xpath("//span[contains(@id, 'captcha')]"),
];

pub const CAPTCHA_INPUT_FIELDS: &[Locator] = &[
    Locator::name("captcha"),
    Locator::id("captcha"),
    Locator::name("captchaInput"),
    Locator::id("captchaInput"),
    Locator::name("captcha_code"),
    Locator::id("captcha_code"),
    Locator::xpath("//input[contains(@name, 'captcha')]"),
    Locator::xpath("//input[contains(@id, 'captcha')]"),
    Locator::xpath("//input[contains(@placeholder, 'captcha')]"),
    Locator::xpath("//input[@type='text'][last()]"),
];

/// How many `<select>` elements the year fallback scan inspects.
const MAX_SELECT_SCAN: usize = 12;

/// Which fields were filled. Nothing here is fatal; the page decides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    pub case_type: bool,
    pub case_number: bool,
    pub filing_year: bool,
    pub captcha: bool,
}

impl FillReport {
    pub fn all_filled(&self) -> bool {
        self.case_type && self.case_number && self.filing_year && self.captcha
    }
}

/// Fills the search form on the current page.
pub struct FormFiller<'a, D: ?Sized> {
    driver: &'a D,
    opts: LocateOptions,
}

impl<'a, D: PageDriver + ?Sized> FormFiller<'a, D> {
    pub fn new(driver: &'a D, timings: &ScrapeTimings) -> Self {
        Self {
            driver,
            opts: LocateOptions::new(timings.locate_timeout, timings.poll_interval),
        }
    }

    /// Fill every field, then copy the captcha. Missing fields are logged
    /// and left for the result page to reveal.
    pub async fn fill(&self, query: &SearchQuery) -> FillReport {
        let report = FillReport {
            case_type: self.fill_case_type(query.case_type()).await,
            case_number: self.fill_case_number(query.case_number()).await,
            filing_year: self.fill_filing_year(query.filing_year()).await,
            captcha: self.fill_captcha().await,
        };

        if !report.captcha {
            warn!("Captcha could not be copied, continuing anyway");
        }
        debug!("Form fill report: {:?}", report);
        report
    }

    pub async fn fill_case_type(&self, case_type: &str) -> bool {
        for locator in CASE_TYPE_FIELDS {
            let Some(info) = find_one(self.driver, locator, self.opts, is_visible).await else {
                continue;
            };

            if info.is_select() {
                let methods = [
                    SelectMethod::ByText(case_type.to_string()),
                    SelectMethod::ByValue(case_type.to_string()),
                    SelectMethod::ByPartialText(case_type.to_string()),
                ];
                if self.select_first(locator, &methods).await {
                    info!("Case type '{}' selected via {}", case_type, locator);
                    return true;
                }
            } else {
                match self.driver.fill(locator, case_type).await {
                    Ok(()) => {
                        info!("Case type '{}' entered via {}", case_type, locator);
                        return true;
                    }
                    Err(e) => debug!("Case type input {} rejected text: {}", locator, e),
                }
            }
        }

        warn!("Could not fill case type field");
        false
    }

    pub async fn fill_case_number(&self, case_number: u64) -> bool {
        let value = case_number.to_string();
        for locator in CASE_NUMBER_FIELDS {
            if find_one(self.driver, locator, self.opts, is_visible)
                .await
                .is_none()
            {
                continue;
            }
            match self.driver.fill(locator, &value).await {
                Ok(()) => {
                    info!("Case number {} entered via {}", value, locator);
                    return true;
                }
                Err(e) => debug!("Case number input {} rejected text: {}", locator, e),
            }
        }

        warn!("Could not fill case number field");
        false
    }

    pub async fn fill_filing_year(&self, filing_year: i32) -> bool {
        let year = filing_year.to_string();
        let is_year_select = |info: &ElementInfo| info.visible && info.is_select();

        for locator in FILING_YEAR_FIELDS {
            let Some(info) = find_one(self.driver, locator, self.opts, is_year_select).await
            else {
                continue;
            };
            debug!(
                "Year control {} offers {} options",
                locator,
                info.options.len()
            );

            let methods = [
                SelectMethod::ByValue(year.clone()),
                SelectMethod::ByText(year.clone()),
                SelectMethod::ClickOption(year.clone()),
                SelectMethod::ScriptAssign(year.clone()),
            ];
            if self.select_first(locator, &methods).await {
                info!("Filing year {} selected via {}", year, locator);
                return true;
            }
        }

        warn!("Could not fill filing year field, scanning every select");
        self.scan_selects_for_year(&year).await
    }

    /// Last resort: pick whichever select lists the year among its options.
    async fn scan_selects_for_year(&self, year: &str) -> bool {
        for index in 1..=MAX_SELECT_SCAN {
            let locator = Locator::xpath_owned(format!("(//select)[{}]", index));
            let info = match self.driver.probe(&locator).await {
                Ok(Some(info)) => info,
                Ok(None) => break,
                Err(e) => {
                    debug!("Select #{} probe failed: {}", index, e);
                    continue;
                }
            };

            if !info.options.iter().any(|o| o.text.trim() == year) {
                continue;
            }
            if self
                .driver
                .select(&locator, &SelectMethod::ByText(year.to_string()))
                .await
                .is_ok()
            {
                info!("Filing year {} selected from select #{}", year, index);
                return true;
            }
        }

        warn!("No select on the page offers year {}", year);
        false
    }

    /// Read the displayed captcha text and type it into the captcha input.
    pub async fn fill_captcha(&self) -> bool {
        let Some(span) = locate(
            self.driver,
            "captcha code",
            CAPTCHA_CODE_FIELDS,
            self.opts,
            is_visible,
        )
        .await
        else {
            warn!("Could not find captcha code element");
            return false;
        };

        let code = span.info.text.trim().to_string();
        if code.is_empty() {
            warn!("Captcha element {} is empty", span.locator);
            return false;
        }
        debug!("Captcha code '{}' read via {}", code, span.locator);

        for locator in CAPTCHA_INPUT_FIELDS {
            if find_one(self.driver, locator, self.opts, is_interactable)
                .await
                .is_none()
            {
                continue;
            }
            match self.driver.fill(locator, &code).await {
                Ok(()) => {
                    info!("Captcha filled via {}", locator);
                    return true;
                }
                Err(e) => debug!("Captcha input {} rejected text: {}", locator, e),
            }
        }

        warn!("Could not find captcha input field");
        false
    }

    async fn select_first(&self, locator: &Locator, methods: &[SelectMethod]) -> bool {
        for method in methods {
            match self.driver.select(locator, method).await {
                Ok(()) => {
                    debug!("Selected by {} on {}", method.label(), locator);
                    return true;
                }
                Err(e) => debug!("Select by {} failed on {}: {}", method.label(), locator, e),
            }
        }
        false
    }
}
