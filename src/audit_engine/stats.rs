//! Scan statistics snapshot

use serde::Serialize;
use std::time::Duration;

use super::state::ScanStatus;
use crate::http::HttpStats;

/// Point-in-time view of a scan, cheap enough to poll
#[derive(Debug, Clone, Serialize)]
pub struct ScanStats {
    pub status: ScanStatus,
    pub paused: bool,
    pub http: HttpStats,
    /// URLs with a known status code
    pub sitemap_size: usize,
    /// Pages run through the checks
    pub auditmap_size: usize,
    pub url_queue_size: usize,
    pub page_queue_size: usize,
    pub pending_browser_jobs: usize,
    pub issues: usize,
    pub failures: usize,
    /// Percent complete, always within `0.0..=100.0`
    pub progress: f64,
    pub runtime: Duration,
    /// Estimated time left; `None` until there is progress to extrapolate from
    pub eta: Option<Duration>,
}

/// Audited share of the sitemap as a percentage in `0.0..=100.0`
///
/// The audited count can briefly exceed the sitemap size while browser
/// callbacks are still recording pages, hence the clamp.
#[must_use]
pub fn progress_percent(audited: usize, sitemap_size: usize) -> f64 {
    if sitemap_size == 0 {
        return 0.0;
    }
    let percent = audited as f64 / sitemap_size as f64 * 100.0;
    percent.clamp(0.0, 100.0)
}

/// Time left if the rest of the scan runs at the pace so far
#[must_use]
pub fn estimate_remaining(elapsed: Duration, progress: f64) -> Option<Duration> {
    if progress.is_nan() || progress <= 0.0 {
        return None;
    }
    if progress >= 100.0 {
        return Some(Duration::ZERO);
    }
    let total = elapsed.as_secs_f64() * 100.0 / progress;
    Some(Duration::from_secs_f64((total - elapsed.as_secs_f64()).max(0.0)))
}
