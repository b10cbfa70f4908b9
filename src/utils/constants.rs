//! Shared configuration constants for the audit engine
//!
//! Default values used by the config builder and the engine so the same
//! numbers are not repeated across modules.

/// Maximum re-fetch attempts for a URL that returned no response
///
/// A URL whose fetch keeps yielding status code 0 is re-queued at most this
/// many times. After that it lands in the permanent failure list and is not
/// queued again for the rest of the scan.
pub const MAX_FETCH_RETRIES: u8 = 5;

/// Default DOM depth limit for browser analysis
///
/// Pages whose DOM transition depth is at or beyond this value are not handed
/// to the browser pool again. Bounds how far event-driven exploration recurses.
pub const DEFAULT_DOM_DEPTH_LIMIT: usize = 5;

/// Default maximum crawl depth: 10 levels
pub const DEFAULT_MAX_CRAWL_DEPTH: u8 = 10;

/// Default number of browser workers
///
/// Each worker owns one Chrome instance. Set the pool size to 0 to disable
/// browser analysis entirely.
pub const DEFAULT_BROWSER_POOL_SIZE: usize = 4;

/// Default timeout for a single browser job, in seconds
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 25;

/// Default timeout for a single HTTP request, in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Fallback wake interval for the audit loop, in milliseconds
///
/// The loop is normally woken by queue pushes and pool idle transitions.
/// This interval only bounds how long it sleeps if a wake is missed.
pub const DEFAULT_IDLE_POLL_INTERVAL_MS: u64 = 100;

/// Chrome user agent string used by both the HTTP client and the browser
///
/// Kept in sync with the browser so responses fetched over plain HTTP match
/// what the browser sees.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
