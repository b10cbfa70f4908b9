//! Cooperative pause with independent holders
//!
//! Every `pause()` call hands out its own token and `resume(token)` releases
//! exactly that token. The engine counts as paused while any token is held,
//! and only checks at its checkpoints (before popping the next queue item and
//! before running the next check); in-flight fetches, browser jobs and checks
//! are never interrupted.

use log::debug;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

/// Opaque handle for one pause request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PauseToken(u64);

impl PauseToken {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
pub struct PauseController {
    holders: Mutex<HashSet<PauseToken>>,
    next_token: AtomicU64,
    paused: watch::Sender<bool>,
}

impl Default for PauseController {
    fn default() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            holders: Mutex::new(HashSet::new()),
            next_token: AtomicU64::new(0),
            paused,
        }
    }
}

impl PauseController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pause holder
    pub fn pause(&self) -> PauseToken {
        let token = PauseToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let mut holders = self.holders.lock();
        holders.insert(token);
        self.paused.send_replace(true);
        debug!("Pause requested (token {}, {} holders)", token.0, holders.len());
        token
    }

    /// Release one holder; returns `false` if the token was not held
    pub fn resume(&self, token: PauseToken) -> bool {
        let mut holders = self.holders.lock();
        let removed = holders.remove(&token);
        if holders.is_empty() {
            self.paused.send_replace(false);
        }
        debug!(
            "Resume for token {} (removed: {removed}, {} holders left)",
            token.0,
            holders.len()
        );
        removed
    }

    /// Release every holder at once
    pub fn resume_all(&self) {
        self.holders.lock().clear();
        self.paused.send_replace(false);
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        !self.holders.lock().is_empty()
    }

    #[must_use]
    pub fn holder_count(&self) -> usize {
        self.holders.lock().len()
    }

    /// Checkpoint: return immediately unless paused, otherwise wait for the
    /// last holder to resume
    pub async fn wait_if_paused(&self) {
        let mut receiver = self.paused.subscribe();
        // The sender lives in `self`, so the channel cannot close under us
        let _ = receiver.wait_for(|paused| !*paused).await;
    }
}
