//! Chrome launch and teardown for scrape sessions.
//!
//! Each scrape gets its own browser. The session owns it and shuts it down
//! on every exit path; if the owning task is torn down first, dropping the
//! session kills the browser process.

mod config;
#[cfg(feature = "browser")]
mod page;

pub use config::BrowserSettings;
#[cfg(feature = "browser")]
pub use page::CdpPage;

use async_trait::async_trait;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

use super::error::ScrapeError;
use super::session::{BrowserLauncher, BrowserSession};
#[cfg(feature = "browser")]
use super::driver::PageDriver;

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;

/// Starts Chrome according to [`BrowserSettings`].
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    settings: BrowserSettings,
}

impl ChromeLauncher {
    /// Common Chrome executable paths to check.
    #[cfg(feature = "browser")]
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Common install locations
        "/opt/google/chrome/google-chrome",
    ];

    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &BrowserSettings {
        &self.settings
    }
}

#[cfg(feature = "browser")]
impl ChromeLauncher {
    /// Find a Chrome executable.
    fn find_chrome(&self) -> Result<std::path::PathBuf, ScrapeError> {
        if let Some(ref path) = self.settings.chrome_path {
            if path.exists() {
                return Ok(path.clone());
            }
            warn!("Configured Chrome path {} does not exist", path.display());
        }

        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                debug!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(path) = which::which(cmd) {
                debug!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(ScrapeError::Launch(
            "Chrome/Chromium not found. Please install it:\n\
             - Ubuntu/Debian: sudo apt install chromium-browser\n\
             - Fedora: sudo dnf install chromium\n\
             - Or download from: https://www.google.com/chrome/"
                .to_string(),
        ))
    }

    async fn launch_local(&self) -> Result<ChromeSession, ScrapeError> {
        info!("Launching browser (headless={})", self.settings.headless);
        let chrome_path = self.find_chrome()?;

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);

        // with_head means NOT headless
        if !self.settings.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = self.settings.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--disable-notifications")
            .arg("--disable-popup-blocking")
            .arg("--no-sandbox") // Often needed for headless in containers
            .arg("--disable-gpu")
            .arg("--window-size=1920,1080");

        for arg in &self.settings.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| ScrapeError::Launch(format!("invalid browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(ChromeSession::new(browser, handler, false, &self.settings))
    }

    /// Connect to a remote Chrome instance.
    async fn connect_remote(&self, url: &str) -> Result<ChromeSession, ScrapeError> {
        info!("Connecting to remote browser at {}", url);

        // Get WebSocket URL from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await
            .map_err(|e| ScrapeError::Launch(format!("remote browser unreachable: {}", e)))?
            .json()
            .await
            .map_err(|e| ScrapeError::Launch(format!("bad browser version info: {}", e)))?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ScrapeError::Launch("No webSocketDebuggerUrl in browser response".to_string())
            })?;

        let (browser, mut handler) = Browser::connect(ws_url)
            .await
            .map_err(|e| ScrapeError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(ChromeSession::new(browser, handler, true, &self.settings))
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    #[cfg(feature = "browser")]
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ScrapeError> {
        let session = match self.settings.remote_url.clone() {
            Some(url) => self.connect_remote(&url).await?,
            None => self.launch_local().await?,
        };
        Ok(Box::new(session))
    }

    #[cfg(not(feature = "browser"))]
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ScrapeError> {
        Err(ScrapeError::Launch(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }
}

/// One running (or connected) browser.
#[cfg(feature = "browser")]
pub struct ChromeSession {
    browser: Browser,
    handler: Option<tokio::task::JoinHandle<()>>,
    /// Connected browsers belong to someone else: only our pages are closed.
    remote: bool,
    pages: Vec<Page>,
    user_agent: String,
    stealth: bool,
}

#[cfg(feature = "browser")]
impl ChromeSession {
    fn new(
        browser: Browser,
        handler: tokio::task::JoinHandle<()>,
        remote: bool,
        settings: &BrowserSettings,
    ) -> Self {
        Self {
            browser,
            handler: Some(handler),
            remote,
            pages: Vec::new(),
            user_agent: settings.user_agent.clone(),
            stealth: settings.stealth,
        }
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl BrowserSession for ChromeSession {
    async fn open_page(&mut self) -> Result<Box<dyn PageDriver>, ScrapeError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::Launch(format!("browser could not open a page: {}", e)))?;

        // Set user agent before any navigation
        if let Err(e) = page
            .execute(SetUserAgentOverrideParams::new(self.user_agent.clone()))
            .await
        {
            warn!("Could not override user agent: {}", e);
        }

        self.pages.push(page.clone());
        Ok(Box::new(CdpPage::new(page, self.stealth)))
    }

    async fn close(self: Box<Self>) {
        let mut this = self;
        for page in std::mem::take(&mut this.pages) {
            if let Err(e) = page.close().await {
                debug!("Page close failed: {}", e);
            }
        }

        if !this.remote {
            if let Err(e) = this.browser.close().await {
                warn!("Browser close failed: {}", e);
            }
            match tokio::time::timeout(std::time::Duration::from_secs(5), this.browser.wait()).await {
                Ok(Ok(_)) => debug!("Browser process exited"),
                Ok(Err(e)) => warn!("Waiting for browser exit failed: {}", e),
                Err(_) => warn!("Browser did not exit in time, it will be killed on drop"),
            }
        }

        if let Some(handler) = this.handler.take() {
            handler.abort();
        }
    }
}

#[cfg(feature = "browser")]
impl Drop for ChromeSession {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}
