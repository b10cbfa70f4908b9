//! Scope and exclusion rules applied before anything is queued or audited

use url::Url;

use crate::config::AuditConfig;
use crate::page::Page;

/// Compiled scope rules derived from an `AuditConfig`
#[derive(Debug, Clone)]
pub struct ScopePolicy {
    start: Option<Url>,
    allow_subdomains: bool,
    allowed_domains: Vec<String>,
    excluded: Vec<regex::Regex>,
    included: Vec<regex::Regex>,
}

impl ScopePolicy {
    #[must_use]
    pub fn from_config(config: &AuditConfig) -> Self {
        Self {
            start: Url::parse(config.start_url()).ok(),
            allow_subdomains: config.allow_subdomains(),
            allowed_domains: config.allowed_domains().map(<[String]>::to_vec).unwrap_or_default(),
            excluded: config.excluded_patterns_compiled().to_vec(),
            included: config.include_patterns_compiled().to_vec(),
        }
    }

    /// Whether `url` matches one of the exclusion patterns
    #[must_use]
    pub fn is_excluded(&self, url: &str) -> bool {
        self.excluded.iter().any(|regex| regex.is_match(url))
    }

    /// Whether `url` is on an allowed host and matches the include patterns
    #[must_use]
    pub fn is_in_scope(&self, url: &str) -> bool {
        let Ok(parsed_url) = Url::parse(url) else {
            return false;
        };
        let Some(start_url) = &self.start else {
            return false;
        };

        if parsed_url.scheme() != start_url.scheme() {
            return false;
        }

        let url_host = parsed_url.host_str().unwrap_or_default();
        let start_host = start_url.host_str().unwrap_or_default();

        let host_allowed = url_host == start_host
            || self.allow_subdomains && url_host.ends_with(&format!(".{start_host}"))
            || self
                .allowed_domains
                .iter()
                .any(|domain| url_host == domain || url_host.ends_with(&format!(".{domain}")));

        if !host_allowed {
            return false;
        }

        self.included.is_empty() || self.included.iter().any(|regex| regex.is_match(url))
    }

    /// Combined check used by the URL queue
    #[must_use]
    pub fn allows_url(&self, url: &str) -> bool {
        self.is_in_scope(url) && !self.is_excluded(url)
    }

    /// Exclusion check used by the page queue and the audit pipeline
    #[must_use]
    pub fn is_page_excluded(&self, page: &Page) -> bool {
        self.is_excluded(&page.url) || !self.is_in_scope(&page.url)
    }
}
