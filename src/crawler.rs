//! Crawler seam and a breadth-first HTTP spider

use futures::future::BoxFuture;
use log::{debug, info};
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, LazyLock};

use crate::http::HttpClient;
use crate::page::Page;
use crate::scope::ScopePolicy;
use crate::utils::{normalize_url, resolve_url};

/// Discovers the resources of the target
///
/// `on_discover` is called once for every page the crawl fetched.
pub trait Crawler: Send + Sync {
    fn run<'a>(
        &'a self,
        start_url: &'a str,
        on_discover: &'a (dyn Fn(Page) + Send + Sync),
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

/// Elements and the attribute holding the path they point to
static LINK_SELECTORS: LazyLock<Vec<(Selector, &'static str)>> = LazyLock::new(|| {
    [
        ("a[href]", "href"),
        ("area[href]", "href"),
        ("form[action]", "action"),
        ("iframe[src]", "src"),
        ("frame[src]", "src"),
    ]
    .into_iter()
    .filter_map(|(css, attr)| Selector::parse(css).ok().map(|selector| (selector, attr)))
    .collect()
});

/// Absolute, normalized URLs of every link in `body`
#[must_use]
pub fn extract_links(base: &str, body: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    let mut links = Vec::new();
    for (selector, attr) in LINK_SELECTORS.iter() {
        for element in document.select(selector) {
            if let Some(value) = element.value().attr(attr)
                && let Some(url) = resolve_url(base, value)
            {
                links.push(url);
            }
        }
    }
    links
}

/// Breadth-first crawler over an [`HttpClient`]
pub struct SpiderCrawler {
    http: Arc<dyn HttpClient>,
    scope: ScopePolicy,
    max_depth: u8,
    page_limit: Option<usize>,
}

impl SpiderCrawler {
    #[must_use]
    pub fn new(
        http: Arc<dyn HttpClient>,
        scope: ScopePolicy,
        max_depth: u8,
        page_limit: Option<usize>,
    ) -> Self {
        Self {
            http,
            scope,
            max_depth,
            page_limit,
        }
    }
}

impl Crawler for SpiderCrawler {
    fn run<'a>(
        &'a self,
        start_url: &'a str,
        on_discover: &'a (dyn Fn(Page) + Send + Sync),
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let start = normalize_url(start_url)
                .ok_or_else(|| anyhow::anyhow!("Invalid start URL: {start_url}"))?;

            let mut seen = HashSet::from([start.clone()]);
            let mut frontier = VecDeque::from([(start, 0u8)]);
            let mut fetched = 0usize;

            info!("Crawl starting at {start_url} (max depth {})", self.max_depth);

            while let Some((url, depth)) = frontier.pop_front() {
                if self.page_limit.is_some_and(|limit| fetched >= limit) {
                    debug!("Crawl page limit reached");
                    break;
                }

                let page = self.http.fetch(&url).await;
                fetched += 1;

                let links = if page.has_response() && depth < self.max_depth {
                    extract_links(&page.url, &page.body)
                } else {
                    Vec::new()
                };
                on_discover(page);

                for link in links {
                    if self.scope.allows_url(&link) && seen.insert(link.clone()) {
                        frontier.push_back((link, depth + 1));
                    }
                }
            }

            info!("Crawl finished: {fetched} pages fetched, {} URLs seen", seen.len());
            Ok(())
        })
    }
}
