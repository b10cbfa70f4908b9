//! HTTP fetching used by the crawler, the re-fetch policy and the checks
//!
//! A fetch never fails: a request that produced no response at all comes
//! back as a page with status code [`NO_RESPONSE`](crate::page::NO_RESPONSE),
//! which is what the retry policy keys on.

use futures::future::{BoxFuture, join_all};
use log::{debug, warn};
use parking_lot::Mutex;
use reqwest::Client;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::config::AuditConfig;
use crate::page::Page;

/// Continuation for a queued request
pub type ResponseHandler = Box<dyn FnOnce(Page) + Send>;

/// Request/response counters of an [`HttpClient`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HttpStats {
    pub request_count: usize,
    pub response_count: usize,
    /// Requests that got no response at all
    pub failure_count: usize,
    pub average_response_time: Duration,
}

pub trait HttpClient: Send + Sync {
    /// GET `url`
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Page>;

    /// Defer a GET of `url` until the next [`run_queued`](Self::run_queued)
    fn queue(&self, url: String, on_response: ResponseHandler);

    /// Perform every queued request and hand each result to its handler
    fn run_queued(&self) -> BoxFuture<'_, ()>;

    fn stats(&self) -> HttpStats;
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicUsize,
    responses: AtomicUsize,
    failures: AtomicUsize,
    total_response_micros: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> HttpStats {
        let responses = self.responses.load(Ordering::Relaxed);
        let total = self.total_response_micros.load(Ordering::Relaxed);
        let average = if responses == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(total / responses as u64)
        };
        HttpStats {
            request_count: self.requests.load(Ordering::Relaxed),
            response_count: responses,
            failure_count: self.failures.load(Ordering::Relaxed),
            average_response_time: average,
        }
    }
}

/// [`HttpClient`] over `reqwest`
pub struct ReqwestClient {
    client: Client,
    counters: Counters,
    queued: Mutex<Vec<(String, ResponseHandler)>>,
}

impl std::fmt::Debug for ReqwestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestClient")
            .field("stats", &self.counters.snapshot())
            .field("queued", &self.queued.lock().len())
            .finish()
    }
}

impl ReqwestClient {
    /// Client with the timeout and user agent from `config`
    pub fn new(config: &AuditConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout())
            .user_agent(config.user_agent())
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self::with_client(client))
    }

    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            counters: Counters::default(),
            queued: Mutex::new(Vec::new()),
        }
    }

    async fn get(&self, url: &str) -> Page {
        self.counters.requests.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("No response from {url}: {e}");
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                return Page::no_response(url);
            }
        };

        let code = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read body of {url}: {e}");
                String::new()
            }
        };

        let elapsed = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.counters.responses.fetch_add(1, Ordering::Relaxed);
        self.counters
            .total_response_micros
            .fetch_add(elapsed, Ordering::Relaxed);

        if final_url != url {
            debug!("{url} redirected to {final_url}");
        }
        Page::new(url, code, body)
    }
}

impl HttpClient for ReqwestClient {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Page> {
        Box::pin(self.get(url))
    }

    fn queue(&self, url: String, on_response: ResponseHandler) {
        self.queued.lock().push((url, on_response));
    }

    fn run_queued(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let batch = std::mem::take(&mut *self.queued.lock());
            if batch.is_empty() {
                return;
            }

            debug!("Running {} queued requests", batch.len());
            join_all(batch.into_iter().map(|(url, on_response)| async move {
                let page = self.get(&url).await;
                on_response(page);
            }))
            .await;
        })
    }

    fn stats(&self) -> HttpStats {
        self.counters.snapshot()
    }
}
