//! Bounded re-fetch policy for URLs that produced no response
//!
//! A flaky URL cycles to the back of the URL queue instead of blocking it,
//! but only up to a fixed number of times. After that it is recorded as a
//! permanent failure and dropped for the rest of the scan.

use dashmap::DashMap;
use log::{info, warn};
use parking_lot::Mutex;

use crate::utils::MAX_FETCH_RETRIES;

/// Outcome of recording a failed fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-queue the URL; `attempt` is the retry number (1-based)
    Retry { attempt: u8 },
    /// Retry budget exhausted; the URL is now a permanent failure
    GiveUp,
}

/// Fingerprint → attempt count, plus the permanent failure list
#[derive(Debug)]
pub struct RetryTracker {
    attempts: DashMap<String, u8>,
    failures: Mutex<Vec<String>>,
    max_attempts: u8,
}

impl Default for RetryTracker {
    fn default() -> Self {
        Self::new(MAX_FETCH_RETRIES)
    }
}

impl RetryTracker {
    #[must_use]
    pub fn new(max_attempts: u8) -> Self {
        Self {
            attempts: DashMap::new(),
            failures: Mutex::new(Vec::new()),
            max_attempts,
        }
    }

    /// Record a fetch of `fingerprint` that got no response
    pub fn record_failure(&self, fingerprint: &str) -> RetryDecision {
        {
            let mut attempts = self.attempts.entry(fingerprint.to_string()).or_insert(0);
            if *attempts < self.max_attempts {
                *attempts += 1;
                info!(
                    "No response for {fingerprint}, retry {}/{}",
                    *attempts, self.max_attempts
                );
                return RetryDecision::Retry { attempt: *attempts };
            }
        }

        let mut failures = self.failures.lock();
        if !failures.iter().any(|url| url == fingerprint) {
            warn!(
                "Giving up on {fingerprint} after {} retries",
                self.max_attempts
            );
            failures.push(fingerprint.to_string());
        }
        RetryDecision::GiveUp
    }

    /// Forget the attempt count once a fetch succeeds
    pub fn record_success(&self, fingerprint: &str) {
        self.attempts.remove(fingerprint);
    }

    #[must_use]
    pub fn attempts(&self, fingerprint: &str) -> u8 {
        self.attempts
            .get(fingerprint)
            .map_or(0, |entry| *entry.value())
    }

    /// URLs dropped after exhausting their retries, in the order they failed
    #[must_use]
    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }

    #[must_use]
    pub fn max_attempts(&self) -> u8 {
        self.max_attempts
    }

    pub fn reset(&self) {
        self.attempts.clear();
        self.failures.lock().clear();
    }
}
