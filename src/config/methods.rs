//! Builder methods available for all states
//!
//! This module contains methods that can be called on the builder
//! regardless of its current type state.

use super::builder::AuditConfigBuilder;

impl<State> AuditConfigBuilder<State> {
    /// Audit exactly these URLs instead of crawling
    ///
    /// # Example
    ///
    /// ```rust
    /// # use kodegen_tools_webaudit::config::AuditConfig;
    /// # fn main() -> anyhow::Result<()> {
    /// let config = AuditConfig::builder()
    ///     .start_url("https://example.com")
    ///     .restrict_paths(vec!["https://example.com/login".to_string()])
    ///     .build()?;
    /// assert!(config.restrict_paths().is_some());
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn restrict_paths(mut self, paths: Vec<String>) -> Self {
        self.restrict_paths = Some(paths);
        self
    }

    #[must_use]
    pub fn url_limit(mut self, limit: usize) -> Self {
        self.url_limit = Some(limit);
        self
    }

    #[must_use]
    pub fn dom_depth_limit(mut self, depth: usize) -> Self {
        self.dom_depth_limit = depth;
        self
    }

    #[must_use]
    pub fn max_crawl_depth(mut self, depth: u8) -> Self {
        self.max_crawl_depth = depth;
        self
    }

    /// Set the number of browser workers
    ///
    /// A pool size of 0 turns browser analysis off: pages are still audited
    /// but never submitted to the browser.
    #[must_use]
    pub fn browser_pool_size(mut self, size: usize) -> Self {
        self.browser_pool_size = size;
        self
    }

    #[must_use]
    pub fn job_timeout_secs(mut self, secs: u64) -> Self {
        self.job_timeout_secs = secs;
        self
    }

    /// Set browser headless mode
    ///
    /// Headed mode is only honoured in debug builds; release builds force
    /// headless with a warning.
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    #[must_use]
    pub fn allow_subdomains(mut self, allow: bool) -> Self {
        self.allow_subdomains = allow;
        self
    }

    #[must_use]
    pub fn allowed_domains(mut self, domains: Vec<String>) -> Self {
        self.allowed_domains = Some(domains);
        self
    }

    /// Glob patterns (`*` wildcard) for URLs that must never be queued or audited
    #[must_use]
    pub fn excluded_patterns(mut self, patterns: Vec<String>) -> Self {
        self.excluded_patterns = Some(patterns);
        self
    }

    /// Glob patterns a URL must match at least one of to be in scope
    #[must_use]
    pub fn include_patterns(mut self, patterns: Vec<String>) -> Self {
        self.include_patterns = Some(patterns);
        self
    }

    #[must_use]
    pub fn http_timeout_secs(mut self, secs: u64) -> Self {
        self.http_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn idle_poll_interval_ms(mut self, ms: u64) -> Self {
        self.idle_poll_interval_ms = ms;
        self
    }
}
