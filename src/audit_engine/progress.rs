//! Progress reporting abstraction for audit runs
//!
//! Defines the `ProgressReporter` trait for lifecycle event reporting
//! and provides a no-op implementation for callers that only want the result.

/// Trait for reporting audit progress at key lifecycle events
///
/// Hooks are called from the engine's main loop; page-level hooks fire once
/// per audited page.
pub trait ProgressReporter: Send + Sync {
    /// Report that the scan is preparing (plugins starting)
    fn report_preparing(&self);

    /// Report that the crawl phase has started at `url`
    fn report_crawl_started(&self, url: &str);

    /// Report that the audit phase has started with `queued` URLs
    fn report_audit_started(&self, queued: usize);

    /// Report that a page was audited; `audited` is the running total
    fn report_page_audited(&self, url: &str, audited: usize);

    /// Report that cleanup has started
    fn report_cleanup_started(&self);

    /// Report that the scan has completed
    fn report_completed(&self);

    /// Report an error that ended the audit phase early
    fn report_error(&self, error: &str);
}

/// Progress reporter that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgress;

impl ProgressReporter for NoOpProgress {
    #[inline(always)]
    fn report_preparing(&self) {}

    #[inline(always)]
    fn report_crawl_started(&self, _url: &str) {}

    #[inline(always)]
    fn report_audit_started(&self, _queued: usize) {}

    #[inline(always)]
    fn report_page_audited(&self, _url: &str, _audited: usize) {}

    #[inline(always)]
    fn report_cleanup_started(&self) {}

    #[inline(always)]
    fn report_completed(&self) {}

    #[inline(always)]
    fn report_error(&self, _error: &str) {}
}
