//! Browser launch configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How the scrape browser is started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Run in headless mode (default: true).
    /// Set to false to watch the form being filled.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Explicit Chrome/Chromium executable. Searched for when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default)]
    pub proxy: Option<String>,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Hide the usual automation fingerprints after each page load.
    #[serde(default = "default_stealth")]
    pub stealth: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            chrome_path: None,
            remote_url: None,
            proxy: None,
            chrome_args: Vec::new(),
            user_agent: default_user_agent(),
            stealth: default_stealth(),
        }
    }
}

pub fn default_headless() -> bool {
    true
}

pub fn default_stealth() -> bool {
    true
}

pub fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}
