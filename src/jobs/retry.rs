//! Retry policy for whole scrape sessions.

use std::time::Duration;

use crate::scrapers::ErrorKind;

/// Bounded exponential backoff over classified errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// One backoff unit; delays are whole multiples of it.
    pub unit: Duration,
    /// Largest delay, in units.
    pub max_units: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            unit: Duration::from_secs(1),
            max_units: 10,
        }
    }
}

impl RetryPolicy {
    /// Same shape with a different unit. Tests use a millisecond unit.
    pub fn with_unit(mut self, unit: Duration) -> Self {
        self.unit = unit;
        self
    }

    /// Delay in units after the given failed attempt (1-based):
    /// `min(2^attempt, max_units)`.
    pub fn delay_units(&self, attempt: u32) -> u32 {
        2u32.checked_pow(attempt)
            .unwrap_or(u32::MAX)
            .min(self.max_units)
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.unit * self.delay_units(attempt)
    }

    /// Whether a failure on `attempt` of this kind earns another attempt,
    /// and after how long.
    pub fn next_delay(&self, attempt: u32, kind: ErrorKind) -> Option<Duration> {
        if attempt >= self.max_attempts || !kind.is_retryable() {
            None
        } else {
            Some(self.delay_for(attempt))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_double_then_cap() {
        let policy = RetryPolicy::default();
        let units: Vec<u32> = (1..=5).map(|a| policy.delay_units(a)).collect();
        assert_eq!(units, vec![2, 4, 8, 10, 10]);
        assert_eq!(policy.delay_units(64), 10);
    }

    #[test]
    fn test_only_retryable_kinds_retry() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.next_delay(1, ErrorKind::Timeout),
            Some(Duration::from_secs(2))
        );
        assert_eq!(policy.next_delay(1, ErrorKind::Unknown), None);
        assert_eq!(policy.next_delay(1, ErrorKind::DnsError), None);
    }

    #[test]
    fn test_attempts_are_bounded() {
        let policy = RetryPolicy::default();
        assert!(policy.next_delay(2, ErrorKind::Network).is_some());
        assert!(policy.next_delay(3, ErrorKind::Network).is_none());
    }
}
