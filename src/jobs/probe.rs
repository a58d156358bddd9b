//! Reachability check run before a job is accepted.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait HostProbe: Send + Sync {
    /// Whether the target host answered within the probe's timeout.
    async fn is_reachable(&self) -> bool;
}

/// GETs the site root with a bounded timeout. Reachable means a 2xx after
/// redirects.
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("casefetch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl HostProbe for HttpProbe {
    async fn is_reachable(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(resp) => {
                debug!("Probe {} -> {}", self.url, resp.status());
                resp.status().is_success()
            }
            Err(e) => {
                warn!("Probe {} failed: {}", self.url, e);
                false
            }
        }
    }
}

/// Fixed answer, for offline use and tests.
pub struct StaticProbe(pub bool);

#[async_trait]
impl HostProbe for StaticProbe {
    async fn is_reachable(&self) -> bool {
        self.0
    }
}
