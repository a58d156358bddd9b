//! Browser automation for the court's case-status search.
//!
//! A scrape is one pass of [`ScrapeSession`]: load the search form, fill it
//! (copying the plain-text captcha), submit, and hand the rendered page to
//! the [`extract`] heuristics.

pub mod browser;
pub mod driver;
pub mod error;
pub mod extract;
pub mod form;
pub mod locator;
pub mod session;
pub mod submit;

pub use browser::{BrowserSettings, ChromeLauncher};
pub use driver::{
    ClickMode, ElementInfo, PageDriver, PageSnapshot, ScrapeTimings, SelectMethod, SelectOption,
};
pub use error::{DriverError, ErrorKind, ScrapeError};
pub use extract::{extract, extract_at};
pub use form::{FillReport, FormFiller};
pub use locator::{locate, LocateOptions, Located, Locator};
pub use session::{
    BrowserLauncher, BrowserScraper, BrowserSession, CaseScraper, ScrapeSession, SessionConfig,
};
pub use submit::{SubmitMechanism, Submitter};
