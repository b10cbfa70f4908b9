//! Breadth-first crawl over a scripted site

use parking_lot::Mutex;
use std::sync::Arc;

use kodegen_tools_webaudit::{Crawler, Page, ScopePolicy, SpiderCrawler};

mod common;
use common::ScriptedHttp;

const ROOT: &str = "https://example.com/";

fn site() -> Arc<ScriptedHttp> {
    Arc::new(
        ScriptedHttp::new()
            .respond(
                ROOT,
                200,
                r#"<a href="/a">a</a> <a href="/b">b</a> <a href="https://other.org/x">x</a>"#,
            )
            .respond("https://example.com/a", 200, r#"<a href="c">c</a> <a href="/">home</a>"#)
            .respond("https://example.com/c", 200, r#"<a href="/d">d</a>"#)
            .respond("https://example.com/b", 404, "gone"),
    )
}

async fn crawl(max_depth: u8, page_limit: Option<usize>) -> (Vec<(String, u16)>, Arc<ScriptedHttp>) {
    let http = site();
    let scope = ScopePolicy::from_config(&common::config(ROOT));
    let crawler = SpiderCrawler::new(http.clone(), scope, max_depth, page_limit);

    let found = Mutex::new(Vec::new());
    let on_discover = |page: Page| found.lock().push((page.url, page.code));
    crawler.run(ROOT, &on_discover).await.expect("crawl succeeds");

    (found.into_inner(), http)
}

#[tokio::test]
async fn crawl_stays_in_scope_and_within_depth() {
    common::init_logging();
    let (found, http) = crawl(2, None).await;

    let urls: Vec<&str> = found.iter().map(|(url, _)| url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            ROOT,
            "https://example.com/a",
            "https://example.com/b",
            "https://example.com/c",
        ]
    );
    assert!(found.contains(&("https://example.com/b".to_string(), 404)));
    assert_eq!(http.fetch_count("https://other.org/x"), 0);
    assert_eq!(http.fetch_count("https://example.com/d"), 0);
    assert_eq!(http.fetch_count(ROOT), 1, "each URL is fetched once");
}

#[tokio::test]
async fn page_limit_stops_the_crawl() {
    let (found, _) = crawl(10, Some(2)).await;
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].0, ROOT);
}

#[tokio::test]
async fn depth_zero_fetches_only_the_start_page() {
    let (found, _) = crawl(0, None).await;
    assert_eq!(found, vec![(ROOT.to_string(), 200)]);
}

#[tokio::test]
async fn invalid_start_url_is_an_error() {
    let http = site();
    let scope = ScopePolicy::from_config(&common::config(ROOT));
    let crawler = SpiderCrawler::new(http, scope, 2, None);

    let on_discover = |_page: Page| {};
    assert!(crawler.run("not a url", &on_discover).await.is_err());
}
