//! Browser jobs
//!
//! A `Job` is a deferred unit of browser work. The browser cluster invokes
//! callbacks by job id rather than by job identity, so `forward` and
//! `forward_as` keep the id: one callback registered for a template job
//! serves every job forwarded from it.
//!
//! The browser a job runs on is bound only for the duration of
//! [`Job::configure_and_run`], which is the only way a task's `run` executes.

pub mod id;
pub mod options;
pub mod tasks;

pub use id::{JobId, JobIdAllocator};
pub use options::{JobOptions, RESOURCE_KEY};
pub use tasks::{EventTriggerTask, ExploreTask};

use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::browser_cluster::BrowserHandle;
use crate::page::Page;

/// Concrete browser behavior a job executes
pub trait JobTask: Send + Sync + fmt::Debug + 'static {
    /// Short name used in logs and responses
    fn name(&self) -> &'static str;

    /// Do the work on `browser`; errors propagate to whoever called
    /// `configure_and_run`
    fn run<'a>(
        &'a self,
        options: &'a JobOptions,
        browser: &'a BrowserHandle,
    ) -> BoxFuture<'a, anyhow::Result<Page>>;
}

/// What a finished job hands back to its callback
#[derive(Debug, Clone)]
pub struct JobResponse {
    pub job_id: JobId,
    pub task: &'static str,
    /// The page as rendered by the browser, including its DOM transitions and
    /// newly discovered paths
    pub page: Page,
}

/// Error types for job execution
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The task's payload failed
    #[error("{job_id} failed: {source:#}")]
    Failed {
        job_id: JobId,
        #[source]
        source: anyhow::Error,
    },

    /// The job did not finish within the cluster's job timeout
    #[error("{job_id} timed out after {after:?}")]
    TimedOut { job_id: JobId, after: Duration },

    /// The cluster shut down before the job started
    #[error("{0} cancelled: browser cluster shut down")]
    Cancelled(JobId),

    /// `configure_and_run` was called on a job that is already executing
    #[error("{0} is already bound to a browser")]
    AlreadyBound(JobId),
}

/// A unit of browser work with a stable correlation id
pub struct Job {
    id: JobId,
    task: Arc<dyn JobTask>,
    options: JobOptions,
    browser: Option<BrowserHandle>,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("task", &self.task.name())
            .field("options", &self.options.len())
            .field("bound", &self.browser.is_some())
            .finish()
    }
}

impl Job {
    /// Create a job with a fresh id from `ids`
    pub fn new(ids: &JobIdAllocator, task: Arc<dyn JobTask>, options: JobOptions) -> Self {
        Self::with_id(ids.allocate(), task, options)
    }

    /// Create a job that keeps an existing id
    #[must_use]
    pub fn with_id(id: JobId, task: Arc<dyn JobTask>, options: JobOptions) -> Self {
        Self {
            id,
            task,
            options,
            browser: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> JobId {
        self.id
    }

    #[must_use]
    pub fn task_name(&self) -> &'static str {
        self.task.name()
    }

    #[must_use]
    pub fn options(&self) -> &JobOptions {
        &self.options
    }

    /// Whether a browser is currently bound to this job
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.browser.is_some()
    }

    /// Same task, same id, new options
    #[must_use]
    pub fn forward(&self, options: JobOptions) -> Self {
        Self::with_id(self.id, Arc::clone(&self.task), options)
    }

    /// Different task, same id
    #[must_use]
    pub fn forward_as(&self, task: Arc<dyn JobTask>, options: JobOptions) -> Self {
        Self::with_id(self.id, task, options)
    }

    /// Copy without any bound browser, safe to store or submit later
    #[must_use]
    pub fn clean_copy(&self) -> Self {
        Self::with_id(self.id, Arc::clone(&self.task), self.options.clone())
    }

    /// Bind `browser`, run the task, and unbind again
    ///
    /// The binding is released on every exit path: success, task error, and
    /// the returned future being dropped mid-run (e.g. by a timeout).
    pub async fn configure_and_run(
        &mut self,
        browser: BrowserHandle,
    ) -> Result<JobResponse, JobError> {
        if self.browser.is_some() {
            return Err(JobError::AlreadyBound(self.id));
        }

        let job_id = self.id;
        let task = Arc::clone(&self.task);
        let binding = BrowserBinding::bind(&mut self.browser, browser);

        let result = task.run(&self.options, binding.handle()).await;
        drop(binding);

        match result {
            Ok(page) => Ok(JobResponse {
                job_id,
                task: task.name(),
                page,
            }),
            Err(source) => Err(JobError::Failed { job_id, source }),
        }
    }
}

/// Scoped browser binding; clears the job's slot when dropped
struct BrowserBinding<'a> {
    slot: &'a mut Option<BrowserHandle>,
    handle: BrowserHandle,
}

impl<'a> BrowserBinding<'a> {
    fn bind(slot: &'a mut Option<BrowserHandle>, handle: BrowserHandle) -> Self {
        *slot = Some(Arc::clone(&handle));
        Self { slot, handle }
    }

    fn handle(&self) -> &BrowserHandle {
        &self.handle
    }
}

impl Drop for BrowserBinding<'_> {
    fn drop(&mut self) {
        self.slot.take();
    }
}
