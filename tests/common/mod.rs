//! Test doubles shared by the integration tests

#![allow(dead_code)]

use dashmap::DashMap;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use kodegen_tools_webaudit::{
    AuditConfig, BrowserClusterConfig, BrowserHandle, BrowserWorker, Check, CheckContext,
    ClusterLauncher, Crawler, HttpClient, HttpStats, Issue, Page, ResponseHandler, Severity,
    Transition, WorkerFactory,
};

pub const SCRIPTED_BODY: &str = "<html><script>init()</script></html>";
pub const STATIC_BODY: &str = "<html><p>static</p></html>";

/// Initialise logging once; honours `RUST_LOG`
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn config(start_url: &str) -> AuditConfig {
    AuditConfig::builder()
        .start_url(start_url)
        .idle_poll_interval_ms(10)
        .build()
        .expect("valid test config")
}

/// HTTP client answering from a fixed script
///
/// Unscripted URLs answer 200 with a static body. URLs marked as failing
/// never produce a response.
#[derive(Default)]
pub struct ScriptedHttp {
    responses: DashMap<String, (u16, String)>,
    failing: DashMap<String, ()>,
    fetches: DashMap<String, usize>,
    queued: Mutex<Vec<(String, ResponseHandler)>>,
    requests: AtomicUsize,
    responses_sent: AtomicUsize,
    failures: AtomicUsize,
}

impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, url: &str, code: u16, body: &str) -> Self {
        self.responses
            .insert(url.to_string(), (code, body.to_string()));
        self
    }

    pub fn fail(self, url: &str) -> Self {
        self.failing.insert(url.to_string(), ());
        self
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.get(url).map_or(0, |count| *count)
    }

    fn answer(&self, url: &str) -> Page {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.fetches.entry(url.to_string()).or_insert(0) += 1;

        if self.failing.contains_key(url) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            return Page::no_response(url);
        }

        self.responses_sent.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(url) {
            Some(entry) => {
                let (code, body) = entry.value();
                Page::new(url, *code, body.clone())
            }
            None => Page::new(url, 200, STATIC_BODY),
        }
    }
}

impl HttpClient for ScriptedHttp {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Page> {
        Box::pin(async move { self.answer(url) })
    }

    fn queue(&self, url: String, on_response: ResponseHandler) {
        self.queued.lock().push((url, on_response));
    }

    fn run_queued(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let batch = std::mem::take(&mut *self.queued.lock());
            for (url, on_response) in batch {
                on_response(self.answer(&url));
            }
        })
    }

    fn stats(&self) -> HttpStats {
        HttpStats {
            request_count: self.requests.load(Ordering::SeqCst),
            response_count: self.responses_sent.load(Ordering::SeqCst),
            failure_count: self.failures.load(Ordering::SeqCst),
            average_response_time: Duration::ZERO,
        }
    }
}

/// Crawler that "discovers" a fixed list of pages
pub struct ScriptedCrawler {
    pages: Vec<Page>,
}

impl ScriptedCrawler {
    pub fn new(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    pub fn urls(urls: &[&str]) -> Self {
        Self::new(urls.iter().map(|url| Page::new(*url, 200, STATIC_BODY)).collect())
    }
}

impl Crawler for ScriptedCrawler {
    fn run<'a>(
        &'a self,
        _start_url: &'a str,
        on_discover: &'a (dyn Fn(Page) + Send + Sync),
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            for page in &self.pages {
                on_discover(page.clone());
            }
            Ok(())
        })
    }
}

/// Crawler that always fails
pub struct BrokenCrawler;

impl Crawler for BrokenCrawler {
    fn run<'a>(
        &'a self,
        _start_url: &'a str,
        _on_discover: &'a (dyn Fn(Page) + Send + Sync),
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async { anyhow::bail!("target unreachable") })
    }
}

/// Browser worker answering from a URL → rendered page script
#[derive(Debug, Default)]
pub struct FakeWorker {
    rendered: HashMap<String, Page>,
    failing: Vec<String>,
    delay: Option<Duration>,
    pub explored: AtomicUsize,
}

impl FakeWorker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(mut self, url: &str, page: Page) -> Self {
        self.rendered.insert(url.to_string(), page);
        self
    }

    pub fn fail_on(mut self, url: &str) -> Self {
        self.failing.push(url.to_string());
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl BrowserWorker for FakeWorker {
    fn explore<'a>(&'a self, page: &'a Page) -> BoxFuture<'a, anyhow::Result<Page>> {
        Box::pin(async move {
            self.explored.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.contains(&page.url) {
                anyhow::bail!("renderer crashed on {}", page.url);
            }
            Ok(self.rendered.get(&page.url).cloned().unwrap_or_else(|| {
                Page::new(page.url.clone(), page.code, STATIC_BODY)
                    .with_transitions(page.dom.transitions.clone())
            }))
        })
    }

    fn trigger_event<'a>(
        &'a self,
        page: &'a Page,
        transition: &'a Transition,
    ) -> BoxFuture<'a, anyhow::Result<Page>> {
        Box::pin(async move {
            let mut transitions = page.dom.transitions.clone();
            transitions.push(transition.clone());
            Ok(Page::new(page.url.clone(), page.code, STATIC_BODY).with_transitions(transitions))
        })
    }
}

/// Hands out clones of one shared fake worker
pub struct FakeWorkerFactory {
    pub worker: Arc<FakeWorker>,
    pub launches: AtomicUsize,
}

impl FakeWorkerFactory {
    pub fn new(worker: FakeWorker) -> Self {
        Self {
            worker: Arc::new(worker),
            launches: AtomicUsize::new(0),
        }
    }
}

impl WorkerFactory for FakeWorkerFactory {
    fn launch(&self, _index: usize) -> BoxFuture<'_, anyhow::Result<BrowserHandle>> {
        Box::pin(async move {
            self.launches.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::clone(&self.worker) as BrowserHandle)
        })
    }
}

pub fn fake_launcher(worker: FakeWorker, pool_size: usize) -> Arc<ClusterLauncher> {
    Arc::new(ClusterLauncher::new(
        BrowserClusterConfig {
            pool_size,
            job_timeout: Duration::from_secs(5),
        },
        Arc::new(FakeWorkerFactory::new(worker)),
    ))
}

/// Check that records every page it sees and optionally logs an issue
#[derive(Default)]
pub struct RecordingCheck {
    name: String,
    order: i32,
    pub seen: Mutex<Vec<String>>,
    issue_on: Option<String>,
    fail: bool,
}

impl RecordingCheck {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn issue_on(mut self, url: &str) -> Self {
        self.issue_on = Some(url.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

impl Check for RecordingCheck {
    fn name(&self) -> &str {
        &self.name
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn run<'a>(
        &'a self,
        page: &'a Page,
        ctx: &'a CheckContext,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.seen.lock().push(page.url.clone());
            if self.issue_on.as_deref() == Some(page.url.as_str()) {
                ctx.log_issue(Issue::new(&self.name, "Test finding", &page.url, Severity::Low));
            }
            if self.fail {
                anyhow::bail!("check exploded");
            }
            Ok(())
        })
    }
}
