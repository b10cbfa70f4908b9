//! Audit checks and the context they run in

use futures::future::BoxFuture;
use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::{ComponentError, ComponentKind};
use crate::http::HttpClient;
use crate::page::Page;
use crate::work_queue::AuditQueues;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Informational,
    Low,
    Medium,
    High,
}

/// A finding logged by a check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Name of the check that logged it
    pub check: String,
    pub name: String,
    pub url: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<String>,
}

impl Issue {
    #[must_use]
    pub fn new(
        check: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            check: check.into(),
            name: name.into(),
            url: url.into(),
            severity,
            proof: None,
        }
    }

    #[must_use]
    pub fn with_proof(mut self, proof: impl Into<String>) -> Self {
        self.proof = Some(proof.into());
        self
    }

    fn same_finding(&self, other: &Self) -> bool {
        self.check == other.check && self.name == other.name && self.url == other.url
    }
}

/// An issue that only holds if re-fetching `url` is reliably slow
#[derive(Debug, Clone)]
pub struct TimingCandidate {
    pub url: String,
    /// Minimum response time that confirms the issue
    pub expected_delay: Duration,
    pub issue: Issue,
}

/// What a check gets to work with besides the page
pub struct CheckContext {
    queues: Arc<AuditQueues>,
    http: Arc<dyn HttpClient>,
    issues: Mutex<Vec<Issue>>,
    timing_candidates: Mutex<Vec<TimingCandidate>>,
}

impl std::fmt::Debug for CheckContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckContext")
            .field("issues", &self.issues.lock().len())
            .field("timing_candidates", &self.timing_candidates.lock().len())
            .finish_non_exhaustive()
    }
}

impl CheckContext {
    #[must_use]
    pub fn new(queues: Arc<AuditQueues>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            queues,
            http,
            issues: Mutex::new(Vec::new()),
            timing_candidates: Mutex::new(Vec::new()),
        }
    }

    /// Record a finding; returns `false` if the same check already logged the
    /// same issue for the same URL
    pub fn log_issue(&self, issue: Issue) -> bool {
        let mut issues = self.issues.lock();
        if issues.iter().any(|logged| logged.same_finding(&issue)) {
            return false;
        }
        info!(
            "[{:?}] {} at {} (by {})",
            issue.severity, issue.name, issue.url, issue.check
        );
        issues.push(issue);
        true
    }

    /// Ask for timing verification after the current page's checks
    pub fn flag_timing_candidate(&self, candidate: TimingCandidate) {
        debug!("Timing candidate flagged for {}", candidate.url);
        self.timing_candidates.lock().push(candidate);
    }

    pub(crate) fn take_timing_candidates(&self) -> Vec<TimingCandidate> {
        std::mem::take(&mut *self.timing_candidates.lock())
    }

    #[must_use]
    pub fn has_timing_candidates(&self) -> bool {
        !self.timing_candidates.lock().is_empty()
    }

    #[must_use]
    pub fn issues(&self) -> Vec<Issue> {
        self.issues.lock().clone()
    }

    #[must_use]
    pub fn issue_count(&self) -> usize {
        self.issues.lock().len()
    }

    /// Feed a page a check produced back into the audit
    pub fn push_page(&self, page: Page) -> bool {
        self.queues.push_page(page)
    }

    /// Feed a URL a check discovered back into the audit
    pub fn push_url(&self, url: &str) -> bool {
        self.queues.push_url(url)
    }

    #[must_use]
    pub fn http(&self) -> &Arc<dyn HttpClient> {
        &self.http
    }

    pub(crate) fn clear(&self) {
        self.issues.lock().clear();
        self.timing_candidates.lock().clear();
    }
}

/// One audit check, run against every audited page
pub trait Check: Send + Sync {
    fn name(&self) -> &str;

    /// Lower runs earlier; equal orders keep registration order
    fn order(&self) -> i32 {
        0
    }

    fn run<'a>(&'a self, page: &'a Page, ctx: &'a CheckContext)
    -> BoxFuture<'a, anyhow::Result<()>>;
}

/// Registry of loaded checks
#[derive(Default)]
pub struct Checks {
    loaded: Vec<Arc<dyn Check>>,
}

impl std::fmt::Debug for Checks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.loaded.iter().map(|check| check.name()))
            .finish()
    }
}

impl Checks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `check`, replacing a loaded check of the same name
    pub fn register(&mut self, check: Arc<dyn Check>) {
        self.loaded.retain(|loaded| loaded.name() != check.name());
        self.loaded.push(check);
    }

    #[must_use]
    pub fn with(mut self, check: Arc<dyn Check>) -> Self {
        self.register(check);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Check>, ComponentError> {
        self.loaded
            .iter()
            .find(|check| check.name() == name)
            .cloned()
            .ok_or_else(|| ComponentError::not_found(ComponentKind::Check, name))
    }

    /// Checks in the order they run against a page
    #[must_use]
    pub fn schedule(&self) -> Vec<Arc<dyn Check>> {
        let mut scheduled = self.loaded.clone();
        scheduled.sort_by_key(|check| check.order());
        scheduled
    }

    /// Run a single check by name
    pub async fn run_one(
        &self,
        name: &str,
        page: &Page,
        ctx: &CheckContext,
    ) -> Result<(), ComponentError> {
        let check = self.get(name)?;
        check
            .run(page, ctx)
            .await
            .map_err(|source| ComponentError::Failed {
                kind: ComponentKind::Check,
                name: name.to_string(),
                source,
            })
    }
}
