//! The audit engine: crawl, drain the work queues through the checks, clean up
//!
//! The main loop is the only place pages are audited. Browser callbacks run
//! on the cluster's tasks and only ever push into the queues; the loop picks
//! their output up on its next pass.

use chrono::Utc;
use futures::FutureExt;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::Notify;
use uuid::Uuid;

use super::audit_types::{AuditError, AuditResult};
use super::builder::EngineBuilder;
use super::progress::ProgressReporter;
use super::report::AuditReport;
use super::state::ScanStatus;
use super::stats::{ScanStats, estimate_remaining, progress_percent};
use crate::components::{CheckContext, Checks, PluginContext, Plugins, Reports, Session, TimingVerifier};
use crate::config::AuditConfig;
use crate::crawler::Crawler;
use crate::dispatcher::BrowserDispatcher;
use crate::http::HttpClient;
use crate::page::Page;
use crate::pause::{PauseController, PauseToken};
use crate::retry::{RetryDecision, RetryTracker};
use crate::sitemap::Sitemap;
use crate::utils::resolve_url;
use crate::work_queue::AuditQueues;

#[derive(Debug, Default)]
struct Clock {
    started_at: Option<chrono::DateTime<Utc>>,
    finished_at: Option<chrono::DateTime<Utc>>,
    started: Option<Instant>,
    finished: Option<Instant>,
}

pub struct Engine {
    pub(super) config: AuditConfig,
    pub(super) scan_id: Mutex<Uuid>,
    pub(super) status: Mutex<ScanStatus>,
    pub(super) sitemap: Arc<Sitemap>,
    pub(super) queues: Arc<AuditQueues>,
    pub(super) retry: RetryTracker,
    pub(super) pause: PauseController,
    pub(super) audited: AtomicUsize,
    pub(super) wake: Arc<Notify>,
    pub(super) dispatcher: BrowserDispatcher,
    pub(super) http: Arc<dyn HttpClient>,
    pub(super) crawler: Arc<dyn Crawler>,
    pub(super) checks: Checks,
    pub(super) reports: Reports,
    pub(super) plugins: Plugins,
    pub(super) session: Arc<dyn Session>,
    pub(super) timing: Arc<dyn TimingVerifier>,
    pub(super) progress: Arc<dyn ProgressReporter>,
    pub(super) check_ctx: CheckContext,
    clock: Mutex<Clock>,
    last_error: Mutex<Option<String>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("start_url", &self.config.start_url())
            .field("status", &*self.status.lock())
            .field("audited", &self.audited.load(Ordering::Relaxed))
            .field("checks", &self.checks)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Start building an engine for `config`
    #[must_use]
    pub fn builder(config: AuditConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn assemble(
        config: AuditConfig,
        sitemap: Arc<Sitemap>,
        queues: Arc<AuditQueues>,
        wake: Arc<Notify>,
        dispatcher: BrowserDispatcher,
        http: Arc<dyn HttpClient>,
        crawler: Arc<dyn Crawler>,
        checks: Checks,
        reports: Reports,
        plugins: Plugins,
        session: Arc<dyn Session>,
        timing: Arc<dyn TimingVerifier>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        let check_ctx = CheckContext::new(Arc::clone(&queues), Arc::clone(&http));
        Self {
            config,
            scan_id: Mutex::new(Uuid::new_v4()),
            status: Mutex::new(ScanStatus::Ready),
            sitemap,
            queues,
            retry: RetryTracker::default(),
            pause: PauseController::new(),
            audited: AtomicUsize::new(0),
            wake,
            dispatcher,
            http,
            crawler,
            checks,
            reports,
            plugins,
            session,
            timing,
            progress,
            check_ctx,
            clock: Mutex::new(Clock::default()),
            last_error: Mutex::new(None),
        }
    }

    /// Run a complete scan and return its result aggregate
    ///
    /// An error during the crawl or audit phase does not fail the run: it is
    /// logged, recorded in the report, and cleanup and reporting still happen.
    pub async fn run(&self) -> AuditResult<AuditReport> {
        {
            let mut status = self.status.lock();
            if *status != ScanStatus::Ready {
                return Err(AuditError::NotReady(*status));
            }
            *status = ScanStatus::Preparing;
        }

        self.prepare();

        let outcome = match AssertUnwindSafe(self.audit()).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => Err(AuditError::Other(format!(
                "audit phase panicked: {}",
                panic_message(payload.as_ref())
            ))),
        };
        if let Err(e) = outcome {
            let message = e.to_string();
            error!("Audit aborted: {message}");
            self.progress.report_error(&message);
            *self.last_error.lock() = Some(message);
        }

        self.cleanup().await;
        self.set_status(ScanStatus::Done);

        let report = self.report();
        self.reports.run(&report);
        self.progress.report_completed();
        info!(
            "Scan {} done: {} pages audited, {} issues",
            report.scan_id,
            self.audited.load(Ordering::SeqCst),
            report.issues.len()
        );
        Ok(report)
    }

    fn prepare(&self) {
        info!("Preparing scan of {}", self.config.start_url());
        self.progress.report_preparing();
        {
            let mut clock = self.clock.lock();
            clock.started_at = Some(Utc::now());
            clock.started = Some(Instant::now());
        }
        self.plugins.run(&PluginContext {
            queues: Arc::clone(&self.queues),
            http: Arc::clone(&self.http),
        });
    }

    async fn audit(&self) -> AuditResult<()> {
        match self.config.restrict_paths() {
            Some(paths) => {
                let start = self.config.start_url();
                let queued = paths
                    .iter()
                    .filter_map(|path| resolve_url(start, path))
                    .filter(|url| self.queues.push_url(url))
                    .count();
                info!("Auditing {queued} restricted paths, skipping crawl");
            }
            None => self.crawl().await?,
        }

        if self.checks.is_empty() {
            info!("No checks loaded, nothing to audit");
            return Ok(());
        }

        self.set_status(ScanStatus::Auditing);
        self.progress
            .report_audit_started(self.queues.url_queue_len());

        loop {
            self.pause.wait_if_paused().await;

            if self.queues.is_empty() && !self.dispatcher.is_idle() {
                // Woken by queue pushes and by the pool going idle
                let _ = tokio::time::timeout(
                    self.config.idle_poll_interval(),
                    self.wake.notified(),
                )
                .await;
                continue;
            }

            self.audit_queues().await;

            if self.queues.is_empty() && self.dispatcher.is_idle() {
                break;
            }
        }

        self.verify_timing().await;
        Ok(())
    }

    async fn crawl(&self) -> AuditResult<()> {
        let start = self.config.start_url();
        self.set_status(ScanStatus::Crawling);
        self.progress.report_crawl_started(start);

        let on_discover = |page: Page| {
            self.sitemap.record(page.url.clone(), page.code);
            self.queues.push_url(&page.url);
        };
        self.crawler
            .run(start, &on_discover)
            .await
            .map_err(|e| AuditError::Crawl(format!("{e:#}")))?;

        info!(
            "Crawl discovered {} URLs, {} queued",
            self.sitemap.len(),
            self.queues.url_queue_len()
        );
        Ok(())
    }

    /// Drain both queues through the audit pipeline
    ///
    /// URLs are re-fetched fresh; the crawl response is not kept around.
    pub(super) async fn audit_queues(&self) {
        if self.checks.is_empty() || self.queues.is_empty() {
            return;
        }

        self.drain_pages().await;

        while !self.queues.url_queue_is_empty() {
            self.pause.wait_if_paused().await;
            let Some(url) = self.queues.try_pop_url() else {
                break;
            };

            let page = self.http.fetch(&url).await;
            if !page.has_response() {
                match self.retry.record_failure(&url) {
                    RetryDecision::Retry { .. } => self.queues.requeue_url(url),
                    RetryDecision::GiveUp => {}
                }
                continue;
            }
            self.retry.record_success(&url);

            self.audit_page(page).await;
            self.drain_pages().await;
        }

        self.drain_pages().await;
    }

    async fn drain_pages(&self) {
        loop {
            self.pause.wait_if_paused().await;
            let Some(page) = self.queues.try_pop_page() else {
                break;
            };
            self.audit_page(page).await;
        }
    }

    /// Run one page through the browser dispatcher and every check
    pub(super) async fn audit_page(&self, page: Page) {
        if self.queues.scope().is_page_excluded(&page) {
            debug!("Skipping excluded page {}", page.url);
            return;
        }

        self.sitemap.record(page.url.clone(), page.code);
        let audited = self.audited.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            "Auditing {} [{}] (DOM depth {})",
            page.url,
            page.code,
            page.dom_depth()
        );

        self.dispatcher.consider(&page).await;

        for check in self.checks.schedule() {
            self.pause.wait_if_paused().await;
            let run = AssertUnwindSafe(async { check.run(&page, &self.check_ctx).await });
            match run.catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Check '{}' failed on {}: {e:#}", check.name(), page.url),
                Err(payload) => error!(
                    "Check '{}' panicked on {}: {}",
                    check.name(),
                    page.url,
                    panic_message(payload.as_ref())
                ),
            }
        }

        self.http.run_queued().await;

        match self.session.ensure_logged_in().await {
            Ok(true) => {}
            Ok(false) => warn!("Session lost and could not be restored"),
            Err(e) => warn!("Session check failed: {e:#}"),
        }

        self.verify_timing().await;
        self.progress.report_page_audited(&page.url, audited);
    }

    async fn verify_timing(&self) {
        if !self.check_ctx.has_timing_candidates() {
            return;
        }
        let candidates = self.check_ctx.take_timing_candidates();
        debug!("Verifying {} timing candidates", candidates.len());
        for issue in self.timing.verify(candidates).await {
            self.check_ctx.log_issue(issue);
        }
    }

    async fn cleanup(&self) {
        self.set_status(ScanStatus::Cleanup);
        self.progress.report_cleanup_started();

        self.sitemap.merge(self.dispatcher.sitemap());
        if let Err(e) = self.dispatcher.shutdown().await {
            warn!("Browser pool shutdown failed: {e:#}");
        }

        let flushed = self.queues.flush_pages();
        if flushed > 0 {
            debug!("Discarded {flushed} unaudited pages");
        }

        {
            let mut clock = self.clock.lock();
            clock.finished_at = Some(Utc::now());
            clock.finished = Some(Instant::now());
        }

        self.plugins.block().await;
    }

    fn set_status(&self, status: ScanStatus) {
        let mut current = self.status.lock();
        debug!("Scan status {} -> {status}", *current);
        *current = status;
    }

    #[must_use]
    pub fn status(&self) -> ScanStatus {
        *self.status.lock()
    }

    #[must_use]
    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    #[must_use]
    pub fn scan_id(&self) -> Uuid {
        *self.scan_id.lock()
    }

    /// Pause at the next checkpoint; the scan stays paused until this token
    /// and every other outstanding token are resumed
    pub fn pause(&self) -> PauseToken {
        info!("Pausing scan");
        self.pause.pause()
    }

    /// Release one pause token; `false` if it was not held
    pub fn resume(&self, token: PauseToken) -> bool {
        let released = self.pause.resume(token);
        if !self.pause.is_paused() {
            info!("Scan resumed");
        }
        released
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    #[must_use]
    pub fn audited_count(&self) -> usize {
        self.audited.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn sitemap(&self) -> &Arc<Sitemap> {
        &self.sitemap
    }

    #[must_use]
    pub fn queues(&self) -> &Arc<AuditQueues> {
        &self.queues
    }

    /// URLs given up on after exhausting their retries
    #[must_use]
    pub fn failures(&self) -> Vec<String> {
        self.retry.failures()
    }

    #[must_use]
    pub fn checks(&self) -> &Checks {
        &self.checks
    }

    #[must_use]
    pub fn reports(&self) -> &Reports {
        &self.reports
    }

    #[must_use]
    pub fn plugins(&self) -> &Plugins {
        &self.plugins
    }

    #[must_use]
    pub fn check_context(&self) -> &CheckContext {
        &self.check_ctx
    }

    /// Snapshot of counters, queue sizes and progress
    #[must_use]
    pub fn stats(&self) -> ScanStats {
        let status = self.status();
        let audited = self.audited.load(Ordering::SeqCst);
        let sitemap_size = self.sitemap.len();
        let progress = if status == ScanStatus::Done {
            100.0
        } else {
            progress_percent(audited, sitemap_size)
        };

        let runtime = {
            let clock = self.clock.lock();
            match (clock.started, clock.finished) {
                (Some(started), Some(finished)) => finished.duration_since(started),
                (Some(started), None) => started.elapsed(),
                _ => std::time::Duration::ZERO,
            }
        };

        ScanStats {
            status,
            paused: self.pause.is_paused(),
            http: self.http.stats(),
            sitemap_size,
            auditmap_size: audited,
            url_queue_size: self.queues.url_queue_len(),
            page_queue_size: self.queues.page_queue_len(),
            pending_browser_jobs: self.dispatcher.pending_jobs(),
            issues: self.check_ctx.issue_count(),
            failures: self.retry.failures().len(),
            progress,
            runtime,
            eta: estimate_remaining(runtime, progress),
        }
    }

    /// Result aggregate for the current state of the scan
    #[must_use]
    pub fn report(&self) -> AuditReport {
        let clock = self.clock.lock();
        AuditReport {
            scan_id: self.scan_id(),
            config: self.config.clone(),
            sitemap: self.sitemap.snapshot(),
            issues: self.check_ctx.issues(),
            plugins: self.plugins.results(),
            failures: self.retry.failures(),
            started_at: clock.started_at,
            finished_at: clock.finished_at,
            error: self.last_error.lock().clone(),
        }
    }

    /// Clear all scan state so the engine can run again
    ///
    /// Fails while a scan is in progress.
    pub fn reset(&self) -> AuditResult<()> {
        let mut status = self.status.lock();
        if status.is_running() {
            return Err(AuditError::NotReady(*status));
        }

        self.queues.reset();
        self.sitemap.clear();
        self.retry.reset();
        self.check_ctx.clear();
        self.plugins.clear_results();
        self.dispatcher.reset();
        self.pause.resume_all();
        self.audited.store(0, Ordering::SeqCst);
        *self.clock.lock() = Clock::default();
        *self.last_error.lock() = None;
        *self.scan_id.lock() = Uuid::new_v4();
        *status = ScanStatus::Ready;

        info!("Engine reset");
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
