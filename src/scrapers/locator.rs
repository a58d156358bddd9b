//! Element location with ordered fallback strategies.
//!
//! The court website has changed its markup several times, so every field
//! is described by a list of alternative locators tried in order. A strategy
//! that errors or never produces an acceptable element is skipped.

use std::borrow::Cow;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::driver::{settle, ElementInfo, PageDriver};

/// One way of finding an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    Id(Cow<'static, str>),
    Name(Cow<'static, str>),
    /// A single CSS class token.
    Class(Cow<'static, str>),
    /// Relative or absolute XPath expression.
    XPath(Cow<'static, str>),
}

impl Locator {
    pub const fn id(id: &'static str) -> Self {
        Self::Id(Cow::Borrowed(id))
    }

    pub const fn name(name: &'static str) -> Self {
        Self::Name(Cow::Borrowed(name))
    }

    pub const fn class(class: &'static str) -> Self {
        Self::Class(Cow::Borrowed(class))
    }

    pub const fn xpath(expr: &'static str) -> Self {
        Self::XPath(Cow::Borrowed(expr))
    }

    pub fn xpath_owned(expr: String) -> Self {
        Self::XPath(Cow::Owned(expr))
    }

    /// Compile to an XPath expression the browser can evaluate.
    pub fn to_xpath(&self) -> String {
        match self {
            Self::Id(id) => format!("//*[@id={}]", xpath_literal(id)),
            Self::Name(name) => format!("//*[@name={}]", xpath_literal(name)),
            Self::Class(class) => format!(
                "//*[contains(concat(' ', normalize-space(@class), ' '), {})]",
                xpath_literal(&format!(" {} ", class))
            ),
            Self::XPath(expr) => expr.to_string(),
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(v) => write!(f, "id={}", v),
            Self::Name(v) => write!(f, "name={}", v),
            Self::Class(v) => write!(f, "class={}", v),
            Self::XPath(v) => write!(f, "xpath={}", v),
        }
    }
}

/// Quote a string as an XPath 1.0 literal.
///
/// XPath has no escape syntax, so strings holding both quote kinds are
/// assembled with `concat()`.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{}'", s)
    } else if !s.contains('"') {
        format!("\"{}\"", s)
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Per-strategy wait settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocateOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl LocateOptions {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }
}

/// A located element and the strategy that found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub locator: Locator,
    pub info: ElementInfo,
}

pub fn is_visible(info: &ElementInfo) -> bool {
    info.visible
}

pub fn is_interactable(info: &ElementInfo) -> bool {
    info.visible && info.enabled
}

/// Poll a single locator until it yields an element `accept` approves or
/// the timeout runs out. The locator is always probed at least once.
pub async fn find_one<D, F>(
    driver: &D,
    locator: &Locator,
    opts: LocateOptions,
    accept: F,
) -> Option<ElementInfo>
where
    D: PageDriver + ?Sized,
    F: Fn(&ElementInfo) -> bool,
{
    let deadline = Instant::now() + opts.timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(remaining, driver.probe(locator)).await {
            Ok(Ok(Some(info))) if accept(&info) => return Some(info),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                debug!("Locator {} failed: {}", locator, e);
                return None;
            }
            Err(_) => return None,
        }

        if Instant::now() >= deadline {
            return None;
        }
        settle(opts.poll_interval).await;
    }
}

/// Try each strategy in order and return the first acceptable element.
pub async fn locate<D, F>(
    driver: &D,
    target: &str,
    strategies: &[Locator],
    opts: LocateOptions,
    accept: F,
) -> Option<Located>
where
    D: PageDriver + ?Sized,
    F: Fn(&ElementInfo) -> bool,
{
    for locator in strategies {
        if let Some(info) = find_one(driver, locator, opts, &accept).await {
            debug!("Located {} via {}", target, locator);
            return Some(Located {
                locator: locator.clone(),
                info,
            });
        }
    }
    debug!(
        "No strategy located {} ({} tried)",
        target,
        strategies.len()
    );
    None
}
