//! Browser worker abstraction
//!
//! A worker is one browser instance able to render pages. Jobs receive the
//! worker they are bound to as a [`BrowserHandle`].

use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

use crate::page::{Page, Transition};

/// One browser instance owned by the cluster
pub trait BrowserWorker: Send + Sync + fmt::Debug {
    /// Load `page` (replaying its DOM transitions) and return the rendered
    /// page with the paths discovered in it
    fn explore<'a>(&'a self, page: &'a Page) -> BoxFuture<'a, anyhow::Result<Page>>;

    /// Load `page`, fire `transition` and return the resulting DOM state
    fn trigger_event<'a>(
        &'a self,
        page: &'a Page,
        transition: &'a Transition,
    ) -> BoxFuture<'a, anyhow::Result<Page>>;

    /// Release the underlying browser
    fn close(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async { Ok(()) })
    }
}

/// Shared handle to the worker a job is bound to
pub type BrowserHandle = Arc<dyn BrowserWorker>;

/// Launches workers for a cluster
pub trait WorkerFactory: Send + Sync {
    fn launch(&self, index: usize) -> BoxFuture<'_, anyhow::Result<BrowserHandle>>;
}
