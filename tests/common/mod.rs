//! Scripted stand-ins for the browser and the scraper.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use casefetch::models::{CaseRecord, SearchQuery};
use casefetch::scrapers::{
    BrowserLauncher, BrowserSession, CaseScraper, ClickMode, DriverError, ElementInfo, Locator,
    PageDriver, ScrapeError, SelectMethod, SelectOption,
};

pub const FORM_URL: &str = "https://court.test/app/get-case-type-status";
pub const RESULT_URL: &str = "https://court.test/app/case-type-status-result";

pub const RESULT_HTML: &str = "<html><body><h2>High Court of Delhi</h2>\
    <table class=\"case-result\">\
    <tr><td>Petitioner: ABC Industries vs Respondent: State</td></tr>\
    <tr><td>Filing Date: 12/03/2023</td></tr>\
    <tr><td>Next Hearing: 21/11/2024</td></tr>\
    <tr><td>Case Status: Pending for admission</td></tr>\
    <tr><td><a href=\"/orders/123.pdf\">Order PDF</a></td></tr>\
    </table></body></html>";

pub const NOT_FOUND_HTML: &str =
    "<html><body><div class=\"alert\">No Record Found</div></body></html>";

pub fn query() -> SearchQuery {
    SearchQuery::new("W.P.(C)", 1234, 2023).unwrap()
}

pub fn text_input() -> ElementInfo {
    ElementInfo {
        tag: "input".to_string(),
        visible: true,
        enabled: true,
        ..Default::default()
    }
}

pub fn select(options: &[&str]) -> ElementInfo {
    ElementInfo {
        tag: "select".to_string(),
        visible: true,
        enabled: true,
        text: String::new(),
        options: options
            .iter()
            .map(|o| SelectOption {
                value: o.to_string(),
                text: o.to_string(),
            })
            .collect(),
    }
}

pub fn span(text: &str) -> ElementInfo {
    ElementInfo {
        tag: "span".to_string(),
        visible: true,
        enabled: true,
        text: text.to_string(),
        options: Vec::new(),
    }
}

pub fn button(text: &str) -> ElementInfo {
    ElementInfo {
        tag: "button".to_string(),
        visible: true,
        enabled: true,
        text: text.to_string(),
        options: Vec::new(),
    }
}

struct PageState {
    elements: Mutex<HashMap<Locator, ElementInfo>>,
    result_html: String,
    goto_failures: AtomicU32,
    failing_clicks: Mutex<HashSet<ClickMode>>,
    form_submit_fails: AtomicBool,
    enter_fails: AtomicBool,
    failing_probes: Mutex<HashSet<Locator>>,
    /// Probes left for which the loading indicator is still showing.
    loading_polls: AtomicU32,
    loading_probes: AtomicU32,
    never_ready: AtomicBool,
    /// Only this select method succeeds, when set.
    select_only: Mutex<Option<&'static str>>,
    submitted: AtomicBool,
    log: Mutex<Vec<String>>,
}

/// In-memory search form. Shows the form until something submits it, then
/// the configured result page.
#[derive(Clone)]
pub struct FakePage {
    state: Arc<PageState>,
}

impl FakePage {
    /// The current court form: selects by name, plain-text captcha, a
    /// search button.
    pub fn court_form(result_html: &str) -> Self {
        let page = Self::blank(result_html);
        page.set(Locator::name("case_type"), select(&["W.P.(C)", "CRL.A."]));
        page.set(Locator::name("case_number"), text_input());
        page.set(Locator::name("case_year"), select(&["2022", "2023", "2024"]));
        page.set(Locator::id("captcha-code"), span("4821"));
        page.set(Locator::name("captcha"), text_input());
        page.set(Locator::id("search"), button("Search"));
        page
    }

    pub fn blank(result_html: &str) -> Self {
        Self {
            state: Arc::new(PageState {
                elements: Mutex::new(HashMap::new()),
                result_html: result_html.to_string(),
                goto_failures: AtomicU32::new(0),
                failing_clicks: Mutex::new(HashSet::new()),
                form_submit_fails: AtomicBool::new(false),
                enter_fails: AtomicBool::new(false),
                failing_probes: Mutex::new(HashSet::new()),
                loading_polls: AtomicU32::new(0),
                loading_probes: AtomicU32::new(0),
                never_ready: AtomicBool::new(false),
                select_only: Mutex::new(None),
                submitted: AtomicBool::new(false),
                log: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn set(&self, locator: Locator, info: ElementInfo) {
        self.state.elements.lock().unwrap().insert(locator, info);
    }

    pub fn remove(&self, locator: &Locator) {
        self.state.elements.lock().unwrap().remove(locator);
    }

    pub fn fail_goto(&self, times: u32) {
        self.state.goto_failures.store(times, Ordering::SeqCst);
    }

    pub fn fail_click(&self, mode: ClickMode) {
        self.state.failing_clicks.lock().unwrap().insert(mode);
    }

    pub fn fail_form_submit(&self) {
        self.state.form_submit_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_enter(&self) {
        self.state.enter_fails.store(true, Ordering::SeqCst);
    }

    /// Make lookups through this locator error out.
    pub fn fail_probe(&self, locator: Locator) {
        self.state.failing_probes.lock().unwrap().insert(locator);
    }

    /// After submission, keep `.loading` visible for this many probes.
    pub fn show_loading_for(&self, polls: u32) {
        self.state.loading_polls.store(polls, Ordering::SeqCst);
    }

    pub fn loading_probes(&self) -> u32 {
        self.state.loading_probes.load(Ordering::SeqCst)
    }

    /// The document never reports `complete`.
    pub fn never_ready(&self) {
        self.state.never_ready.store(true, Ordering::SeqCst);
    }

    pub fn accept_select_only(&self, label: &'static str) {
        *self.state.select_only.lock().unwrap() = Some(label);
    }

    pub fn submitted(&self) -> bool {
        self.state.submitted.load(Ordering::SeqCst)
    }

    /// Every mutating call, in order.
    pub fn log(&self) -> Vec<String> {
        self.state.log.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.state.log.lock().unwrap().push(entry);
    }

    fn submit(&self) {
        self.state.submitted.store(true, Ordering::SeqCst);
    }

    fn require(&self, locator: &Locator) -> Result<(), DriverError> {
        if self.state.elements.lock().unwrap().contains_key(locator) {
            Ok(())
        } else {
            Err(DriverError::ElementNotFound(locator.to_string()))
        }
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.record(format!("goto {}", url));
        let remaining = self.state.goto_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.state.goto_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(DriverError::Protocol("net::ERR_CONNECTION_RESET".to_string()));
        }
        Ok(())
    }

    async fn ready_state(&self) -> Result<String, DriverError> {
        if self.state.never_ready.load(Ordering::SeqCst) {
            return Ok("loading".to_string());
        }
        Ok("complete".to_string())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(if self.submitted() { RESULT_URL } else { FORM_URL }.to_string())
    }

    async fn title(&self) -> Result<String, DriverError> {
        Ok("Case Status".to_string())
    }

    async fn content(&self) -> Result<String, DriverError> {
        if self.submitted() {
            Ok(self.state.result_html.clone())
        } else {
            Ok("<html><body><form></form></body></html>".to_string())
        }
    }

    async fn probe(&self, locator: &Locator) -> Result<Option<ElementInfo>, DriverError> {
        if self.state.failing_probes.lock().unwrap().contains(locator) {
            return Err(DriverError::Script(format!("stale element for {}", locator)));
        }
        if self.submitted() {
            if *locator != Locator::class("loading") {
                return Ok(None);
            }
            self.state.loading_probes.fetch_add(1, Ordering::SeqCst);
            let remaining = self.state.loading_polls.load(Ordering::SeqCst);
            if remaining == 0 {
                return Ok(None);
            }
            self.state.loading_polls.store(remaining - 1, Ordering::SeqCst);
            return Ok(Some(span("Loading...")));
        }
        Ok(self.state.elements.lock().unwrap().get(locator).cloned())
    }

    async fn fill(&self, locator: &Locator, text: &str) -> Result<(), DriverError> {
        self.require(locator)?;
        self.record(format!("fill {} {}", locator, text));
        Ok(())
    }

    async fn select(&self, locator: &Locator, method: &SelectMethod) -> Result<(), DriverError> {
        self.require(locator)?;
        if let Some(only) = *self.state.select_only.lock().unwrap() {
            if method.label() != only {
                return Err(DriverError::Script(format!(
                    "select by {} not supported",
                    method.label()
                )));
            }
        }
        self.record(format!("select {} by {}", locator, method.label()));
        Ok(())
    }

    async fn click(&self, locator: &Locator, mode: ClickMode) -> Result<(), DriverError> {
        self.require(locator)?;
        if self.state.failing_clicks.lock().unwrap().contains(&mode) {
            return Err(DriverError::NotInteractable(format!(
                "click intercepted on {}",
                locator
            )));
        }
        self.record(format!("click {} {:?}", locator, mode));
        self.submit();
        Ok(())
    }

    async fn submit_form(&self) -> Result<(), DriverError> {
        if self.state.form_submit_fails.load(Ordering::SeqCst) {
            return Err(DriverError::Script("no form on page".to_string()));
        }
        self.record("submit form".to_string());
        self.submit();
        Ok(())
    }

    async fn press_enter(&self) -> Result<(), DriverError> {
        if self.state.enter_fails.load(Ordering::SeqCst) {
            return Err(DriverError::Script("nothing focused".to_string()));
        }
        self.record("press enter".to_string());
        self.submit();
        Ok(())
    }
}

/// Hands out one [`FakePage`] per launch and counts what happened to the
/// browsers.
#[derive(Clone)]
pub struct FakeLauncher {
    page: FakePage,
    pub launches: Arc<AtomicU32>,
    pub closes: Arc<AtomicU32>,
    fail_launch: Arc<AtomicBool>,
    fail_open: Arc<AtomicBool>,
}

impl FakeLauncher {
    pub fn new(page: FakePage) -> Self {
        Self {
            page,
            launches: Arc::new(AtomicU32::new(0)),
            closes: Arc::new(AtomicU32::new(0)),
            fail_launch: Arc::new(AtomicBool::new(false)),
            fail_open: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn failing_launch(self) -> Self {
        self.fail_launch.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_open(self) -> Self {
        self.fail_open.store(true, Ordering::SeqCst);
        self
    }

    pub fn launches(&self) -> u32 {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ScrapeError> {
        if self.fail_launch.load(Ordering::SeqCst) {
            return Err(ScrapeError::Launch("chrome binary not found".to_string()));
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeBrowser {
            page: self.page.clone(),
            closes: self.closes.clone(),
            fail_open: self.fail_open.load(Ordering::SeqCst),
        }))
    }
}

struct FakeBrowser {
    page: FakePage,
    closes: Arc<AtomicU32>,
    fail_open: bool,
}

#[async_trait]
impl BrowserSession for FakeBrowser {
    async fn open_page(&mut self) -> Result<Box<dyn PageDriver>, ScrapeError> {
        if self.fail_open {
            return Err(ScrapeError::Driver(DriverError::Protocol(
                "target crashed".to_string(),
            )));
        }
        Ok(Box::new(self.page.clone()))
    }

    async fn close(self: Box<Self>) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// One scripted outcome per call to [`CaseScraper::scrape`].
pub enum Step {
    Record(CaseRecord),
    Error(ScrapeError),
    Panic,
    /// Wait, then return the record.
    Slow(Duration, CaseRecord),
}

/// Plays back [`Step`]s in order; repeats the last one when exhausted.
pub struct ScriptedScraper {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicU32,
    check_ok: bool,
}

impl ScriptedScraper {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicU32::new(0),
            check_ok: true,
        }
    }

    pub fn failing_check(mut self) -> Self {
        self.check_ok = false;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        let step = if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().map(Step::repeat)
        };
        step.unwrap_or_else(|| Step::Error(ScrapeError::Other("script exhausted".to_string())))
    }
}

impl Step {
    fn repeat(&self) -> Step {
        match self {
            Step::Record(r) => Step::Record(r.clone()),
            Step::Error(e) => Step::Error(e.clone()),
            Step::Panic => Step::Panic,
            Step::Slow(d, r) => Step::Slow(*d, r.clone()),
        }
    }
}

#[async_trait]
impl CaseScraper for ScriptedScraper {
    async fn scrape(&self, _query: &SearchQuery) -> Result<CaseRecord, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.next_step() {
            Step::Record(record) => Ok(record),
            Step::Error(e) => Err(e),
            Step::Panic => panic!("scripted scraper panic"),
            Step::Slow(delay, record) => {
                tokio::time::sleep(delay).await;
                Ok(record)
            }
        }
    }

    async fn check(&self) -> Result<(), ScrapeError> {
        if self.check_ok {
            Ok(())
        } else {
            Err(ScrapeError::Launch("chrome binary not found".to_string()))
        }
    }
}

pub fn success_record(case_info: &str) -> CaseRecord {
    let mut record = CaseRecord::blank(RESULT_URL, Utc::now());
    record.case_info = case_info.to_string();
    record.parties = "Petitioner: A, Respondent: B".to_string();
    record.filing_date = "12/03/2023".to_string();
    record.raw_content = format!("{}\nFiling Date: 12/03/2023", case_info);
    record
}

pub fn not_found_record() -> CaseRecord {
    CaseRecord::failed("Case not found in court records", Utc::now())
}

pub fn timeout() -> ScrapeError {
    ScrapeError::Driver(DriverError::Timeout("page did not finish loading".to_string()))
}
