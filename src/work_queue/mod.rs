//! URL and Page work queues with their dedup filters
//!
//! Both queues are pushed from two places at once: the engine's main loop and
//! browser-cluster callbacks running on pool tasks. Every push also fires the
//! shared wake signal so the engine's idle wait returns as soon as work shows
//! up, instead of polling.

pub mod dedup;
pub mod fifo;

pub use dedup::DedupFilter;
pub use fifo::WorkQueue;

use log::{debug, trace};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::page::Page;
use crate::scope::ScopePolicy;
use crate::sitemap::Sitemap;
use crate::utils::normalize_url;

/// The engine's pending audit work
#[derive(Debug)]
pub struct AuditQueues {
    urls: WorkQueue<String>,
    pages: WorkQueue<Page>,
    url_filter: DedupFilter<String>,
    page_filter: DedupFilter<u64>,
    sitemap: Arc<Sitemap>,
    scope: ScopePolicy,
    url_limit: Option<usize>,
    wake: Arc<Notify>,
}

impl AuditQueues {
    #[must_use]
    pub fn new(
        scope: ScopePolicy,
        url_limit: Option<usize>,
        sitemap: Arc<Sitemap>,
        wake: Arc<Notify>,
    ) -> Self {
        Self {
            urls: WorkQueue::new(),
            pages: WorkQueue::new(),
            url_filter: DedupFilter::new(),
            page_filter: DedupFilter::new(),
            sitemap,
            scope,
            url_limit,
            wake,
        }
    }

    /// Queue a URL for re-fetch and audit
    ///
    /// Returns `false` when the URL limit has been reached, when the URL is
    /// malformed, out of scope or excluded, or when its normalized form was
    /// queued before.
    pub fn push_url(&self, url: &str) -> bool {
        if self.url_limit_reached() {
            trace!("URL limit reached, dropping {url}");
            return false;
        }

        let Some(normalized) = normalize_url(url) else {
            trace!("Not an absolute http(s) URL: {url}");
            return false;
        };

        if !self.scope.allows_url(&normalized) {
            trace!("Out of scope: {normalized}");
            return false;
        }

        if !self.url_filter.insert(normalized.clone()) {
            return false;
        }

        if !self.urls.push_bounded(normalized, self.url_limit) {
            return false;
        }

        self.wake.notify_one();
        true
    }

    /// Queue a fully resolved page for audit
    ///
    /// Returns `false` when the page is excluded or an identical page (same
    /// URL and DOM transitions) was queued before.
    pub fn push_page(&self, page: Page) -> bool {
        if self.scope.is_page_excluded(&page) {
            trace!("Excluded page: {}", page.url);
            return false;
        }

        if !self.page_filter.insert(page.fingerprint()) {
            return false;
        }

        self.sitemap.record(page.url.clone(), page.code);
        self.pages.push(page);
        self.wake.notify_one();
        true
    }

    /// Put a URL whose fetch failed back at the tail of the URL queue
    ///
    /// Bypasses the dedup filter and the lifetime counter: the URL was
    /// accepted once already.
    pub fn requeue_url(&self, url: String) {
        debug!("Re-queueing {url}");
        self.urls.requeue(url);
        self.wake.notify_one();
    }

    #[must_use]
    pub fn try_pop_url(&self) -> Option<String> {
        self.urls.try_pop()
    }

    #[must_use]
    pub fn try_pop_page(&self) -> Option<Page> {
        self.pages.try_pop()
    }

    /// Wait for the next URL; `None` once the queue is closed and empty
    pub async fn pop_url(&self) -> Option<String> {
        self.urls.pop().await
    }

    /// Wait for the next page; `None` once the queue is closed and empty
    pub async fn pop_page(&self) -> Option<Page> {
        self.pages.pop().await
    }

    /// Release anything blocked in `pop_url`/`pop_page`
    pub fn close(&self) {
        self.urls.close();
        self.pages.close();
    }

    /// Discard pending pages, returning how many were dropped
    pub fn flush_pages(&self) -> usize {
        self.pages.flush()
    }

    #[must_use]
    pub fn url_limit_reached(&self) -> bool {
        self.url_limit
            .is_some_and(|limit| self.urls.total_pushed() >= limit)
    }

    #[must_use]
    pub fn url_queue_len(&self) -> usize {
        self.urls.len()
    }

    #[must_use]
    pub fn page_queue_len(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn url_queue_is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    #[must_use]
    pub fn page_queue_is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// True when neither queue holds work
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty() && self.pages.is_empty()
    }

    #[must_use]
    pub fn url_queue_total(&self) -> usize {
        self.urls.total_pushed()
    }

    #[must_use]
    pub fn page_queue_total(&self) -> usize {
        self.pages.total_pushed()
    }

    #[must_use]
    pub fn scope(&self) -> &ScopePolicy {
        &self.scope
    }

    #[must_use]
    pub fn sitemap(&self) -> &Arc<Sitemap> {
        &self.sitemap
    }

    /// Clear both queues, both filters and both lifetime counters
    pub fn reset(&self) {
        self.urls.reset();
        self.pages.reset();
        self.url_filter.clear();
        self.page_filter.clear();
    }
}
