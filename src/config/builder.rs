//! Type-safe builder for `AuditConfig` using the typestate pattern
//!
//! `build()` only exists once a start URL has been supplied, so a scan without
//! a seed cannot be configured.

use anyhow::{Result, anyhow};
use regex::Regex;
use std::marker::PhantomData;

use super::types::AuditConfig;
use crate::utils::{
    CHROME_USER_AGENT, DEFAULT_BROWSER_POOL_SIZE, DEFAULT_DOM_DEPTH_LIMIT,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_IDLE_POLL_INTERVAL_MS, DEFAULT_JOB_TIMEOUT_SECS,
    DEFAULT_MAX_CRAWL_DEPTH, normalize_url,
};

/// Compile a glob pattern into a regex
///
/// Converts glob patterns (where * matches any sequence) into proper regex patterns.
/// This is done once at config creation time to avoid repeated compilation in hot paths.
///
/// # Errors
///
/// Returns an error if the resulting regex pattern is invalid.
fn compile_glob_pattern(pattern: &str) -> Result<Regex> {
    // Escape everything except the glob star, then widen the star
    let regex_pattern = regex::escape(pattern).replace(r"\*", ".*");

    // Anchor pattern to match full string
    let anchored = format!("^{regex_pattern}$");

    Regex::new(&anchored).map_err(|e| anyhow!("Invalid glob pattern '{pattern}': {e}"))
}

pub(crate) fn compile_glob_patterns(patterns: Option<&[String]>) -> Result<Vec<Regex>> {
    patterns
        .unwrap_or_default()
        .iter()
        .map(|p| compile_glob_pattern(p))
        .collect()
}

// Type states for the builder
pub struct WithStartUrl;

pub struct AuditConfigBuilder<State = ()> {
    pub(crate) start_url: Option<String>,
    pub(crate) restrict_paths: Option<Vec<String>>,
    pub(crate) url_limit: Option<usize>,
    pub(crate) dom_depth_limit: usize,
    pub(crate) max_crawl_depth: u8,
    pub(crate) browser_pool_size: usize,
    pub(crate) job_timeout_secs: u64,
    pub(crate) headless: bool,
    pub(crate) allow_subdomains: bool,
    pub(crate) allowed_domains: Option<Vec<String>>,
    pub(crate) excluded_patterns: Option<Vec<String>>,
    pub(crate) include_patterns: Option<Vec<String>>,
    pub(crate) http_timeout_secs: u64,
    pub(crate) user_agent: String,
    pub(crate) idle_poll_interval_ms: u64,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for AuditConfigBuilder<()> {
    fn default() -> Self {
        Self {
            start_url: None,
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
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            user_agent: CHROME_USER_AGENT.to_string(),
            idle_poll_interval_ms: DEFAULT_IDLE_POLL_INTERVAL_MS,
            _phantom: PhantomData,
        }
    }
}

impl AuditConfig {
    /// Create a builder for configuring an `AuditConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> AuditConfigBuilder<()> {
        AuditConfigBuilder::default()
    }
}

impl AuditConfigBuilder<()> {
    pub fn start_url(self, url: impl Into<String>) -> AuditConfigBuilder<WithStartUrl> {
        let url_string = url.into();

        // Normalize URL: add https:// if no scheme is present
        let normalized_url =
            if url_string.starts_with("http://") || url_string.starts_with("https://") {
                url_string
            } else {
                format!("https://{url_string}")
            };

        AuditConfigBuilder {
            start_url: Some(normalized_url),
            restrict_paths: self.restrict_paths,
            url_limit: self.url_limit,
            dom_depth_limit: self.dom_depth_limit,
            max_crawl_depth: self.max_crawl_depth,
            browser_pool_size: self.browser_pool_size,
            job_timeout_secs: self.job_timeout_secs,
            headless: self.headless,
            allow_subdomains: self.allow_subdomains,
            allowed_domains: self.allowed_domains,
            excluded_patterns: self.excluded_patterns,
            include_patterns: self.include_patterns,
            http_timeout_secs: self.http_timeout_secs,
            user_agent: self.user_agent,
            idle_poll_interval_ms: self.idle_poll_interval_ms,
            _phantom: PhantomData,
        }
    }
}

// Build method only available when all required fields are set
impl AuditConfigBuilder<WithStartUrl> {
    pub fn build(self) -> Result<AuditConfig> {
        let start_url = self
            .start_url
            .ok_or_else(|| anyhow!("start_url is required"))?;
        let start_url =
            normalize_url(&start_url).ok_or_else(|| anyhow!("Invalid start URL: {start_url}"))?;

        // Enforce headless mode in release builds for production safety
        #[cfg(not(debug_assertions))]
        let headless = if !self.headless {
            tracing::warn!(
                "Forcing headless mode in release build. \
                Headed mode is only available in debug builds for development."
            );
            true
        } else {
            self.headless
        };

        #[cfg(debug_assertions)]
        let headless = self.headless;

        let mut config = AuditConfig {
            start_url,
            restrict_paths: self.restrict_paths,
            url_limit: self.url_limit,
            dom_depth_limit: self.dom_depth_limit,
            max_crawl_depth: self.max_crawl_depth,
            browser_pool_size: self.browser_pool_size,
            job_timeout_secs: self.job_timeout_secs,
            headless,
            allow_subdomains: self.allow_subdomains,
            allowed_domains: self.allowed_domains,
            excluded_patterns: self.excluded_patterns,
            include_patterns: self.include_patterns,
            excluded_patterns_compiled: Vec::new(),
            include_patterns_compiled: Vec::new(),
            http_timeout_secs: self.http_timeout_secs,
            user_agent: self.user_agent,
            idle_poll_interval_ms: self.idle_poll_interval_ms.max(1),
        };

        // Compile patterns once at config creation
        config.compile_patterns()?;
        Ok(config)
    }
}
