//! In-memory cache for search log statistics.
//!
//! Statistics only move when a job finishes, so a short TTL keeps the
//! status endpoint from scanning the log on every poll.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::repository::SearchStatistics;

/// Default TTL for cached stats.
const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// A cached value with expiration time.
struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

impl<T: Clone> CacheEntry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn get(&self) -> Option<T> {
        if self.is_expired() {
            None
        } else {
            Some(self.value.clone())
        }
    }
}

pub struct StatsCache {
    statistics: RwLock<Option<CacheEntry<SearchStatistics>>>,
    ttl: Duration,
}

impl Default for StatsCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            statistics: RwLock::new(None),
            ttl,
        }
    }

    /// Get cached statistics, or None if expired/missing.
    pub fn get_statistics(&self) -> Option<SearchStatistics> {
        self.statistics
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().and_then(|e| e.get()))
    }

    pub fn set_statistics(&self, stats: SearchStatistics) {
        if let Ok(mut guard) = self.statistics.write() {
            *guard = Some(CacheEntry::new(stats, self.ttl));
        }
    }

    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.statistics.write() {
            *guard = None;
        }
    }
}
