//! Browser dispatcher: decides which pages get a browser pass
//!
//! The pool and the job template are created lazily on the first page that
//! qualifies. Every submission is a forward of the one template, so every job
//! shares the template's id and the single callback registered for it.
//! A page fingerprint is submitted at most once, so the rendered copy of a
//! page that comes back through the page queue is not rendered again.

use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Notify;

use crate::browser_cluster::{BrowserPool, JobCallback, JobOutcome, PoolLauncher};
use crate::job::{ExploreTask, Job, JobIdAllocator, JobOptions};
use crate::page::Page;
use crate::utils::resolve_url;
use crate::work_queue::{AuditQueues, DedupFilter};

enum PoolState {
    Unstarted,
    Ready(Arc<Pooled>),
    Unavailable,
}

struct Pooled {
    pool: Arc<dyn BrowserPool>,
    template: Job,
    callback: Mutex<Option<JobCallback>>,
}

pub struct BrowserDispatcher {
    dom_depth_limit: usize,
    launcher: Option<Arc<dyn PoolLauncher>>,
    queues: Arc<AuditQueues>,
    ids: Arc<JobIdAllocator>,
    wake: Arc<Notify>,
    submitted: DedupFilter<u64>,
    state: Mutex<PoolState>,
    launch_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for BrowserDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*self.state.lock() {
            PoolState::Unstarted => "unstarted",
            PoolState::Ready(_) => "ready",
            PoolState::Unavailable => "unavailable",
        };
        f.debug_struct("BrowserDispatcher")
            .field("dom_depth_limit", &self.dom_depth_limit)
            .field("pool", &state)
            .finish_non_exhaustive()
    }
}

impl BrowserDispatcher {
    /// `launcher` of `None` disables browser analysis
    pub fn new(
        dom_depth_limit: usize,
        launcher: Option<Arc<dyn PoolLauncher>>,
        queues: Arc<AuditQueues>,
        ids: Arc<JobIdAllocator>,
        wake: Arc<Notify>,
    ) -> Self {
        Self {
            dom_depth_limit,
            launcher,
            queues,
            ids,
            wake,
            submitted: DedupFilter::new(),
            state: Mutex::new(PoolState::Unstarted),
            launch_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Submit `page` for browser analysis if it qualifies
    ///
    /// Returns `true` when a job was submitted.
    pub async fn consider(&self, page: &Page) -> bool {
        if page.dom_depth() >= self.dom_depth_limit {
            debug!(
                "Skipping browser pass for {}: DOM depth {} reached limit {}",
                page.url,
                page.dom_depth(),
                self.dom_depth_limit
            );
            return false;
        }
        if self.launcher.is_none() || matches!(*self.state.lock(), PoolState::Unavailable) {
            return false;
        }
        if !page.has_script() {
            return false;
        }
        if self.submitted.contains(&page.fingerprint()) {
            debug!("Skipping browser pass for {}: already rendered", page.url);
            return false;
        }

        let Some(pooled) = self.pooled().await else {
            return false;
        };

        let options = match JobOptions::for_resource(page) {
            Ok(options) => options,
            Err(e) => {
                warn!("Cannot build browser job for {}: {e:#}", page.url);
                return false;
            }
        };

        if !self.submitted.insert(page.fingerprint()) {
            return false;
        }

        let job = pooled.template.forward(options);
        let callback = pooled.callback.lock().take();
        match pooled.pool.submit(job, callback) {
            Ok(()) => {
                debug!("Queued {} for browser analysis", page.url);
                true
            }
            Err(e) => {
                warn!("Browser pool rejected {}: {e}", page.url);
                false
            }
        }
    }

    /// Pool and template, launching them on first use
    async fn pooled(&self) -> Option<Arc<Pooled>> {
        if let Some(pooled) = self.ready() {
            return Some(pooled);
        }

        let _launching = self.launch_lock.lock().await;
        match &*self.state.lock() {
            PoolState::Ready(pooled) => return Some(Arc::clone(pooled)),
            PoolState::Unavailable => return None,
            PoolState::Unstarted => {}
        }

        let launcher = self.launcher.as_ref()?;
        info!("Starting browser pool");
        let next = match launcher.launch(Arc::clone(&self.wake)).await {
            Ok(pool) => {
                let template = Job::new(
                    &self.ids,
                    Arc::new(ExploreTask),
                    JobOptions::new(),
                );
                debug!("Browser job template is {}", template.id());
                PoolState::Ready(Arc::new(Pooled {
                    pool,
                    template,
                    callback: Mutex::new(Some(rendered_page_callback(Arc::clone(&self.queues)))),
                }))
            }
            Err(e) => {
                warn!("Browser analysis disabled, pool failed to start: {e:#}");
                PoolState::Unavailable
            }
        };

        let mut state = self.state.lock();
        *state = next;
        match &*state {
            PoolState::Ready(pooled) => Some(Arc::clone(pooled)),
            _ => None,
        }
    }

    fn ready(&self) -> Option<Arc<Pooled>> {
        match &*self.state.lock() {
            PoolState::Ready(pooled) => Some(Arc::clone(pooled)),
            _ => None,
        }
    }

    /// The running pool, if one was started
    #[must_use]
    pub fn pool(&self) -> Option<Arc<dyn BrowserPool>> {
        self.ready().map(|pooled| Arc::clone(&pooled.pool))
    }

    /// True when no pool was started or the pool has nothing in flight
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.ready().is_none_or(|pooled| pooled.pool.is_idle())
    }

    /// Jobs submitted whose callback has not run yet
    #[must_use]
    pub fn pending_jobs(&self) -> usize {
        self.ready().map_or(0, |pooled| pooled.pool.pending_jobs())
    }

    /// Pages rendered by the browsers so far
    #[must_use]
    pub fn sitemap(&self) -> BTreeMap<String, u16> {
        self.ready()
            .map(|pooled| pooled.pool.sitemap())
            .unwrap_or_default()
    }

    /// Shut the pool down if one was started
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        match self.ready() {
            Some(pooled) => pooled.pool.shutdown().await,
            None => Ok(()),
        }
    }

    /// Forget the pool and the submitted pages so the next qualifying page
    /// starts a fresh one
    ///
    /// Call only after [`shutdown`](Self::shutdown).
    pub fn reset(&self) {
        self.submitted.clear();
        *self.state.lock() = PoolState::Unstarted;
    }
}

/// Callback shared by every forwarded job
///
/// The rendered page goes into the page queue first; paths are only followed
/// when the page itself was new.
fn rendered_page_callback(queues: Arc<AuditQueues>) -> JobCallback {
    Arc::new(move |outcome: JobOutcome| match outcome {
        Ok(response) => {
            absorb_rendered_page(&queues, response.page);
        }
        Err(e) => warn!("Browser job failed: {e}"),
    })
}

/// Push a browser-rendered page and the paths it discovered
///
/// Returns the number of URLs accepted into the URL queue.
pub(crate) fn absorb_rendered_page(queues: &AuditQueues, page: Page) -> usize {
    let base = page.url.clone();
    let paths = page.dom.paths.clone();

    if !queues.push_page(page) {
        debug!("Rendered page {base} already seen");
        return 0;
    }

    let accepted = paths
        .iter()
        .filter_map(|path| resolve_url(&base, path))
        .filter(|url| queues.push_url(url))
        .count();

    debug!(
        "Browser analysis of {base} found {} paths, {accepted} new",
        paths.len()
    );
    accepted
}
