//! Browser cluster: a fixed set of browser workers executing submitted jobs
//!
//! Jobs go into one shared channel; each worker task pulls the next job, binds
//! its browser to it for exactly one run, and hands the outcome to the
//! callback registered under the job's id. Callbacks therefore run on the
//! cluster's tasks, concurrently with whoever submitted the job.
//!
//! The pending counter is decremented only after the callback returns, so by
//! the time the cluster reports idle every callback's side effects (queue
//! pushes) are already visible.

pub mod chrome;
pub mod launch;
pub mod worker;

pub use chrome::{ChromeWorker, ChromeWorkerFactory};
pub use worker::{BrowserHandle, BrowserWorker, WorkerFactory};

use anyhow::Result;
use dashmap::DashMap;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::job::{Job, JobError, JobId, JobResponse};

/// Result delivered to a job callback
pub type JobOutcome = Result<JobResponse, JobError>;

/// Continuation invoked with every outcome of jobs sharing one id
pub type JobCallback = Arc<dyn Fn(JobOutcome) + Send + Sync>;

/// Error types for job submission
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    #[error("Browser cluster is shut down, rejected {0}")]
    ShutDown(JobId),
}

/// Contract the engine relies on for browser work
pub trait BrowserPool: Send + Sync + fmt::Debug {
    /// Queue `job` for execution
    ///
    /// When `callback` is given it is registered for the job's id, replacing
    /// any earlier registration. Jobs submitted without a callback use
    /// whatever is registered for their id.
    fn submit(&self, job: Job, callback: Option<JobCallback>) -> Result<(), ClusterError>;

    /// True when no submitted job is queued or running
    fn is_idle(&self) -> bool;

    /// Number of submitted jobs whose callback has not run yet
    fn pending_jobs(&self) -> usize;

    /// URL → status code for every page the browsers rendered
    fn sitemap(&self) -> BTreeMap<String, u16>;

    /// Stop accepting jobs, let in-flight jobs finish and close the browsers
    fn shutdown(&self) -> BoxFuture<'_, Result<()>>;
}

/// Configuration for the browser cluster
#[derive(Debug, Clone)]
pub struct BrowserClusterConfig {
    /// Number of workers (browsers) to launch
    pub pool_size: usize,
    /// Upper bound on a single job's run time
    pub job_timeout: Duration,
}

impl Default for BrowserClusterConfig {
    fn default() -> Self {
        Self {
            pool_size: crate::utils::DEFAULT_BROWSER_POOL_SIZE,
            job_timeout: Duration::from_secs(crate::utils::DEFAULT_JOB_TIMEOUT_SECS),
        }
    }
}

/// State shared between the cluster handle and its worker tasks
struct Shared {
    receiver: Mutex<mpsc::UnboundedReceiver<Job>>,
    callbacks: DashMap<JobId, JobCallback>,
    pending: AtomicUsize,
    sitemap: DashMap<String, u16>,
    idle_signal: Arc<Notify>,
    shutting_down: AtomicBool,
    job_timeout: Duration,
}

/// Tokio-task based [`BrowserPool`]
pub struct BrowserCluster {
    sender: parking_lot::Mutex<Option<mpsc::UnboundedSender<Job>>>,
    shared: Arc<Shared>,
    workers: Mutex<Vec<(BrowserHandle, JoinHandle<()>)>>,
}

impl fmt::Debug for BrowserCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserCluster")
            .field("pending", &self.shared.pending.load(Ordering::SeqCst))
            .field("callbacks", &self.shared.callbacks.len())
            .finish()
    }
}

impl BrowserCluster {
    /// Launch `config.pool_size` workers and start their job loops
    ///
    /// `idle_signal` is notified every time the cluster goes idle. Fails only
    /// if not a single worker could be launched.
    pub async fn start(
        config: BrowserClusterConfig,
        factory: &dyn WorkerFactory,
        idle_signal: Arc<Notify>,
    ) -> Result<Arc<Self>> {
        info!("Starting browser cluster with config: {:?}", config);

        let (sender, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            receiver: Mutex::new(receiver),
            callbacks: DashMap::new(),
            pending: AtomicUsize::new(0),
            sitemap: DashMap::new(),
            idle_signal,
            shutting_down: AtomicBool::new(false),
            job_timeout: config.job_timeout,
        });

        let launches: Vec<_> = (0..config.pool_size).map(|i| factory.launch(i)).collect();
        let results = futures::future::join_all(launches).await;

        let mut workers = Vec::with_capacity(results.len());
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(worker) => {
                    let handle = tokio::spawn(worker_loop(
                        index,
                        Arc::clone(&worker),
                        Arc::clone(&shared),
                    ));
                    workers.push((worker, handle));
                }
                Err(e) => warn!("Failed to launch browser worker {index}: {e:#}"),
            }
        }

        if workers.is_empty() {
            anyhow::bail!("No browser worker could be launched");
        }

        info!("Browser cluster started with {} workers", workers.len());
        Ok(Arc::new(Self {
            sender: parking_lot::Mutex::new(Some(sender)),
            shared,
            workers: Mutex::new(workers),
        }))
    }

    /// Number of callbacks currently registered
    #[must_use]
    pub fn registered_callbacks(&self) -> usize {
        self.shared.callbacks.len()
    }
}

impl BrowserPool for BrowserCluster {
    fn submit(&self, job: Job, callback: Option<JobCallback>) -> Result<(), ClusterError> {
        let job_id = job.id();
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            return Err(ClusterError::ShutDown(job_id));
        };

        if let Some(callback) = callback {
            self.shared.callbacks.insert(job_id, callback);
        }

        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        if sender.send(job).is_err() {
            release_pending(&self.shared);
            return Err(ClusterError::ShutDown(job_id));
        }

        debug!("Submitted {job_id}");
        Ok(())
    }

    fn is_idle(&self) -> bool {
        self.shared.pending.load(Ordering::SeqCst) == 0
    }

    fn pending_jobs(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    fn sitemap(&self) -> BTreeMap<String, u16> {
        self.shared
            .sitemap
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    fn shutdown(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            info!("Shutting down browser cluster");
            self.shared.shutting_down.store(true, Ordering::SeqCst);

            // Closing the channel ends every worker loop once it is drained
            self.sender.lock().take();

            let workers = std::mem::take(&mut *self.workers.lock().await);
            for (worker, handle) in workers {
                if let Err(e) = handle.await
                    && !e.is_cancelled()
                {
                    warn!("Browser worker task failed: {e}");
                }
                if let Err(e) = worker.close().await {
                    warn!("Failed to close browser worker: {e:#}");
                }
            }

            self.shared.callbacks.clear();
            info!("Browser cluster shutdown complete");
            Ok(())
        })
    }
}

/// Starts a browser pool on first use
///
/// `idle_signal` must be notified every time the pool goes idle.
pub trait PoolLauncher: Send + Sync {
    fn launch(&self, idle_signal: Arc<Notify>) -> BoxFuture<'_, Result<Arc<dyn BrowserPool>>>;
}

/// [`PoolLauncher`] that starts a [`BrowserCluster`] over a worker factory
pub struct ClusterLauncher {
    config: BrowserClusterConfig,
    factory: Arc<dyn WorkerFactory>,
}

impl ClusterLauncher {
    #[must_use]
    pub fn new(config: BrowserClusterConfig, factory: Arc<dyn WorkerFactory>) -> Self {
        Self { config, factory }
    }
}

impl PoolLauncher for ClusterLauncher {
    fn launch(&self, idle_signal: Arc<Notify>) -> BoxFuture<'_, Result<Arc<dyn BrowserPool>>> {
        Box::pin(async move {
            let cluster =
                BrowserCluster::start(self.config.clone(), self.factory.as_ref(), idle_signal)
                    .await?;
            Ok(cluster as Arc<dyn BrowserPool>)
        })
    }
}

fn release_pending(shared: &Shared) {
    if shared.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
        debug!("Browser cluster is idle");
        shared.idle_signal.notify_one();
    }
}

/// Background task: pull jobs and run them on this worker's browser
async fn worker_loop(index: usize, worker: BrowserHandle, shared: Arc<Shared>) {
    loop {
        let next = {
            let mut receiver = shared.receiver.lock().await;
            receiver.recv().await
        };
        let Some(mut job) = next else {
            break;
        };

        let job_id = job.id();
        let outcome = if shared.shutting_down.load(Ordering::SeqCst) {
            debug!("Worker {index} dropping {job_id}: cluster shutting down");
            Err(JobError::Cancelled(job_id))
        } else {
            debug!("Worker {index} running {job_id} ({})", job.task_name());
            let run = AssertUnwindSafe(job.configure_and_run(Arc::clone(&worker))).catch_unwind();
            match tokio::time::timeout(shared.job_timeout, run).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(_)) => Err(JobError::Failed {
                    job_id,
                    source: anyhow::anyhow!("job task panicked"),
                }),
                Err(_) => Err(JobError::TimedOut {
                    job_id,
                    after: shared.job_timeout,
                }),
            }
        };

        match &outcome {
            Ok(response) => {
                shared
                    .sitemap
                    .insert(response.page.url.clone(), response.page.code);
            }
            Err(e) => warn!("Worker {index}: {e}"),
        }

        let callback = shared
            .callbacks
            .get(&job_id)
            .map(|entry| Arc::clone(entry.value()));
        match callback {
            Some(callback) => {
                if catch_unwind(AssertUnwindSafe(|| callback(outcome))).is_err() {
                    warn!("Callback for {job_id} panicked");
                }
            }
            None => warn!("No callback registered for {job_id}, dropping its outcome"),
        }

        release_pending(&shared);
    }

    debug!("Worker {index} loop exiting");
}
