//! Core configuration types for audit scans
//!
//! This module contains the main `AuditConfig` struct. A serialized copy of it
//! is embedded in every `AuditReport`, so every field that matters for
//! reproducing a scan is serializable.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::utils::{
    CHROME_USER_AGENT, DEFAULT_BROWSER_POOL_SIZE, DEFAULT_DOM_DEPTH_LIMIT,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_IDLE_POLL_INTERVAL_MS, DEFAULT_JOB_TIMEOUT_SECS,
    DEFAULT_MAX_CRAWL_DEPTH, normalize_url,
};

/// Main configuration struct for audit scans
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Seed URL for the crawl. Always carries an explicit scheme.
    pub(crate) start_url: String,

    /// Explicit path list. When set, these URLs are queued directly and the
    /// crawl phase is skipped.
    pub(crate) restrict_paths: Option<Vec<String>>,

    /// Maximum number of URLs accepted into the URL queue over a whole scan
    pub(crate) url_limit: Option<usize>,

    /// Pages at or beyond this DOM depth are not sent to the browser pool
    pub(crate) dom_depth_limit: usize,

    /// Link depth limit for the crawler
    pub(crate) max_crawl_depth: u8,

    /// Number of browser workers. 0 disables browser analysis.
    pub(crate) browser_pool_size: usize,

    /// Timeout for a single browser job
    pub(crate) job_timeout_secs: u64,

    pub(crate) headless: bool,
    pub(crate) allow_subdomains: bool,
    pub(crate) allowed_domains: Option<Vec<String>>,
    pub(crate) excluded_patterns: Option<Vec<String>>,
    pub(crate) include_patterns: Option<Vec<String>>,

    /// Compiled regex patterns from `excluded_patterns`
    /// Pre-compiled at config creation to avoid hot-path regex compilation
    #[serde(skip)]
    pub(crate) excluded_patterns_compiled: Vec<regex::Regex>,

    /// Compiled regex patterns from `include_patterns`
    #[serde(skip)]
    pub(crate) include_patterns_compiled: Vec<regex::Regex>,

    /// Timeout for a single HTTP request
    pub(crate) http_timeout_secs: u64,
    pub(crate) user_agent: String,

    /// Upper bound on how long the audit loop sleeps between queue checks
    /// when no wake signal arrives
    pub(crate) idle_poll_interval_ms: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            start_url: String::new(),
            restrict_paths: None,
            url_limit: None,
            dom_depth_limit: DEFAULT_DOM_DEPTH_LIMIT,
            max_crawl_depth: DEFAULT_MAX_CRAWL_DEPTH,
            browser_pool_size: DEFAULT_BROWSER_POOL_SIZE,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            headless: true,
            allow_subdomains: false,
            allowed_domains: None,
            excluded_patterns: None,
            include_patterns: None,
            excluded_patterns_compiled: Vec::new(),
            include_patterns_compiled: Vec::new(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            user_agent: CHROME_USER_AGENT.to_string(),
            idle_poll_interval_ms: DEFAULT_IDLE_POLL_INTERVAL_MS,
        }
    }
}

impl AuditConfig {
    /// Load a configuration from its JSON form
    ///
    /// Missing fields take their defaults; `start_url` is required. Pattern
    /// lists are recompiled, so a config that went through
    /// [`AuditConfig::to_json`] and back behaves the same as the original.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut config: Self =
            serde_json::from_str(json).context("Failed to parse audit configuration")?;
        config.start_url = normalize_url(&config.start_url)
            .ok_or_else(|| anyhow!("Invalid start URL: '{}'", config.start_url))?;
        config.idle_poll_interval_ms = config.idle_poll_interval_ms.max(1);
        config.compile_patterns()?;
        Ok(config)
    }

    /// Serialize the configuration for snapshots and reports
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).context("Failed to serialize audit configuration")
    }

    pub(crate) fn compile_patterns(&mut self) -> Result<()> {
        self.excluded_patterns_compiled =
            super::builder::compile_glob_patterns(self.excluded_patterns.as_deref())?;
        self.include_patterns_compiled =
            super::builder::compile_glob_patterns(self.include_patterns.as_deref())?;
        Ok(())
    }
}
