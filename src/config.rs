//! Configuration management for casefetch using the prefer crate.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::export::FileExporter;
use crate::jobs::{HostProbe, HttpProbe, RetryPolicy, DEFAULT_PROBE_TIMEOUT, DEFAULT_STATUS_TTL};
use crate::repository::SearchLog;
use crate::scrapers::{
    BrowserScraper, BrowserSettings, CaseScraper, ChromeLauncher, ScrapeTimings, SessionConfig,
};

/// Court website root. Also the reachability probe target.
pub const DEFAULT_BASE_URL: &str = "https://delhihighcourt.nic.in";

/// Path of the case-status search form under the base URL.
pub const DEFAULT_SEARCH_PATH: &str = "/app/get-case-type-status";

pub const DEFAULT_BIND: &str = "127.0.0.1:5001";

/// Default database filename inside the data directory.
pub const DEFAULT_DATABASE_FILENAME: &str = "case_search.db";

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Holds the search log and the exported files.
    pub data_dir: PathBuf,
    pub database_filename: String,
    pub base_url: String,
    pub search_path: String,
    /// Address the HTTP server listens on.
    pub bind: String,
    pub probe_timeout: Duration,
    /// Job statuses idle for longer are evicted.
    pub status_ttl: Duration,
    pub navigation_attempts: u32,
    pub browser: BrowserSettings,
    pub timings: ScrapeTimings,
    pub retry: RetryPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("casefetch");

        Self {
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            search_path: DEFAULT_SEARCH_PATH.to_string(),
            bind: DEFAULT_BIND.to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            status_ttl: DEFAULT_STATUS_TTL,
            navigation_attempts: crate::scrapers::session::DEFAULT_NAVIGATION_ATTEMPTS,
            browser: BrowserSettings::default(),
            timings: ScrapeTimings::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Full URL of the search form.
    pub fn search_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.search_path.trim_start_matches('/')
        )
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Directory the CSV/PDF exports are written to.
    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::new(self.search_url()).with_timings(self.timings.clone());
        config.navigation_attempts = self.navigation_attempts;
        config
    }

    /// Browser-backed scraper for these settings.
    pub fn create_scraper(&self) -> Arc<dyn CaseScraper> {
        Arc::new(BrowserScraper::new(
            ChromeLauncher::new(self.browser.clone()),
            self.session_config(),
        ))
    }

    /// Reachability probe against the site root.
    pub fn create_probe(&self) -> anyhow::Result<Arc<dyn HostProbe>> {
        let probe = HttpProbe::new(self.base_url.clone(), self.probe_timeout)
            .context("Failed to build HTTP client for the reachability probe")?;
        Ok(Arc::new(probe))
    }

    pub fn create_search_log(&self) -> anyhow::Result<SearchLog> {
        SearchLog::new(&self.database_path()).with_context(|| {
            format!(
                "Failed to open search log at {}",
                self.database_path().display()
            )
        })
    }

    pub fn create_exporter(&self) -> FileExporter {
        FileExporter::new(self.exports_dir())
    }

    /// Apply `CASEFETCH_*` overrides. `lookup` is `std::env::var` in
    /// production.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("CASEFETCH_BASE_URL") {
            tracing::debug!("Using CASEFETCH_BASE_URL from environment: {}", url);
            self.base_url = url;
        }
        if let Some(dir) = var("CASEFETCH_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(headless) = var("CASEFETCH_HEADLESS") {
            self.browser.headless = !matches!(
                headless.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
        }
        if let Some(url) = var("CASEFETCH_BROWSER_URL") {
            self.browser.remote_url = Some(url);
        }
        if let Some(bind) = var("CASEFETCH_BIND") {
            self.bind = bind;
        }
    }
}

/// Waits in milliseconds; unset fields keep their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimingsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_load_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_load_settle_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_retry_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_fill_settle_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_fill_settle_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_submit_settle_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loading_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_loading_settle_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_extract_settle_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locate_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_locate_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
}

impl TimingsConfig {
    fn apply(&self, timings: &mut ScrapeTimings) {
        let pairs = [
            (self.page_load_timeout_ms, &mut timings.page_load_timeout),
            (self.post_load_settle_ms, &mut timings.post_load_settle),
            (
                self.navigation_retry_delay_ms,
                &mut timings.navigation_retry_delay,
            ),
            (self.pre_fill_settle_ms, &mut timings.pre_fill_settle),
            (self.post_fill_settle_ms, &mut timings.post_fill_settle),
            (self.post_submit_settle_ms, &mut timings.post_submit_settle),
            (self.loading_timeout_ms, &mut timings.loading_timeout),
            (self.post_loading_settle_ms, &mut timings.post_loading_settle),
            (self.pre_extract_settle_ms, &mut timings.pre_extract_settle),
            (self.locate_timeout_ms, &mut timings.locate_timeout),
            (
                self.submit_locate_timeout_ms,
                &mut timings.submit_locate_timeout,
            ),
            (self.poll_interval_ms, &mut timings.poll_interval),
        ];
        for (ms, slot) in pairs {
            if let Some(ms) = ms {
                *slot = Duration::from_millis(ms);
            }
        }
    }
}

/// Whole-session retry tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    /// One backoff unit in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_units: Option<u32>,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_ttl_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<BrowserSettings>,
    #[serde(default)]
    pub timings: TimingsConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Falls back to defaults when no casefetch config file is found.
    pub async fn load() -> Self {
        match prefer::load("casefetch").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("Ignoring config at {}: {:#}", path.display(), e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> anyhow::Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let config = match ext {
            "toml" => toml::from_str(contents).context("Failed to parse TOML config")?,
            "yaml" | "yml" => {
                serde_yaml::from_str(contents).context("Failed to parse YAML config")?
            }
            _ => serde_json::from_str(contents).context("Failed to parse JSON config")?,
        };
        Ok(config)
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Apply configuration to settings. Relative paths resolve against
    /// `base_dir`.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            let path = Path::new(data_dir);
            settings.data_dir = if path.is_absolute() {
                path.to_path_buf()
            } else {
                base_dir.join(path)
            };
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref url) = self.base_url {
            settings.base_url = url.clone();
        }
        if let Some(ref path) = self.search_path {
            settings.search_path = path.clone();
        }
        if let Some(ref bind) = self.bind {
            settings.bind = bind.clone();
        }
        if let Some(secs) = self.probe_timeout_secs {
            settings.probe_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.status_ttl_secs {
            settings.status_ttl = Duration::from_secs(secs);
        }
        if let Some(attempts) = self.navigation_attempts {
            settings.navigation_attempts = attempts;
        }
        if let Some(ref browser) = self.browser {
            settings.browser = browser.clone();
        }

        self.timings.apply(&mut settings.timings);

        if let Some(max_attempts) = self.retry.max_attempts {
            settings.retry.max_attempts = max_attempts;
        }
        if let Some(ms) = self.retry.unit_ms {
            settings.retry.unit = Duration::from_millis(ms);
        }
        if let Some(max_units) = self.retry.max_units {
            settings.retry.max_units = max_units;
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file (--config); skips discovery.
    pub config_path: Option<PathBuf>,
}

/// Load settings: config file (explicit or discovered), then environment.
pub async fn load_settings(options: LoadOptions) -> anyhow::Result<(Settings, Config)> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut settings = Settings::default();
    config.apply_to_settings(&mut settings, &base_dir);
    settings.apply_env(|name| std::env::var(name).ok());

    Ok((settings, config))
}
