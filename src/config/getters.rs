//! Getter methods for `AuditConfig`

use std::time::Duration;

use super::types::AuditConfig;

impl AuditConfig {
    #[must_use]
    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    #[must_use]
    pub fn restrict_paths(&self) -> Option<&[String]> {
        self.restrict_paths.as_deref()
    }

    #[must_use]
    pub fn url_limit(&self) -> Option<usize> {
        self.url_limit
    }

    #[must_use]
    pub fn dom_depth_limit(&self) -> usize {
        self.dom_depth_limit
    }

    #[must_use]
    pub fn max_crawl_depth(&self) -> u8 {
        self.max_crawl_depth
    }

    #[must_use]
    pub fn browser_pool_size(&self) -> usize {
        self.browser_pool_size
    }

    #[must_use]
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn allow_subdomains(&self) -> bool {
        self.allow_subdomains
    }

    #[must_use]
    pub fn allowed_domains(&self) -> Option<&[String]> {
        self.allowed_domains.as_deref()
    }

    #[must_use]
    pub fn excluded_patterns(&self) -> Option<&[String]> {
        self.excluded_patterns.as_deref()
    }

    /// Get the pre-compiled excluded patterns
    #[must_use]
    pub fn excluded_patterns_compiled(&self) -> &[regex::Regex] {
        &self.excluded_patterns_compiled
    }

    /// Get the pre-compiled include patterns
    #[must_use]
    pub fn include_patterns_compiled(&self) -> &[regex::Regex] {
        &self.include_patterns_compiled
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn idle_poll_interval(&self) -> Duration {
        Duration::from_millis(self.idle_poll_interval_ms)
    }
}
