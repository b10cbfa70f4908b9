//! reqwest-backed HTTP client against a local mock server

use parking_lot::Mutex;
use std::sync::Arc;

use kodegen_tools_webaudit::{HttpClient, NO_RESPONSE, Page, ReqwestClient};

mod common;

fn client() -> ReqwestClient {
    ReqwestClient::new(&common::config("https://example.com/")).expect("client builds")
}

#[tokio::test]
async fn fetch_returns_code_and_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/hello")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<p>hello</p>")
        .create_async()
        .await;

    let http = client();
    let url = format!("{}/hello", server.url());
    let page = http.fetch(&url).await;

    mock.assert_async().await;
    assert_eq!(page.url, url);
    assert_eq!(page.code, 200);
    assert_eq!(page.body, "<p>hello</p>");
    assert!(page.has_response());
}

#[tokio::test]
async fn error_status_still_counts_as_a_response() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/missing")
        .with_status(404)
        .create_async()
        .await;

    let http = client();
    let page = http.fetch(&format!("{}/missing", server.url())).await;

    assert_eq!(page.code, 404);
    assert!(page.has_response());

    let stats = http.stats();
    assert_eq!(stats.request_count, 1);
    assert_eq!(stats.response_count, 1);
    assert_eq!(stats.failure_count, 0);
}

#[tokio::test]
async fn unreachable_host_yields_no_response() {
    let http = client();
    let page = http.fetch("http://127.0.0.1:1/").await;

    assert_eq!(page.code, NO_RESPONSE);
    assert!(!page.has_response());
    assert!(page.body.is_empty());

    let stats = http.stats();
    assert_eq!(stats.request_count, 1);
    assert_eq!(stats.response_count, 0);
    assert_eq!(stats.failure_count, 1);
}

#[tokio::test]
async fn queued_requests_run_together() {
    let mut server = mockito::Server::new_async().await;
    let first = server
        .mock("GET", "/one")
        .with_body("one")
        .create_async()
        .await;
    let second = server
        .mock("GET", "/two")
        .with_status(500)
        .create_async()
        .await;

    let http = client();
    let seen = Arc::new(Mutex::new(Vec::new()));
    for path in ["one", "two"] {
        let seen = Arc::clone(&seen);
        http.queue(
            format!("{}/{path}", server.url()),
            Box::new(move |page: Page| seen.lock().push((path, page.code))),
        );
    }

    assert!(seen.lock().is_empty(), "nothing runs before run_queued");
    http.run_queued().await;

    first.assert_async().await;
    second.assert_async().await;
    let mut seen = seen.lock().clone();
    seen.sort();
    assert_eq!(seen, vec![("one", 200), ("two", 500)]);

    // The queue was drained
    http.run_queued().await;
    assert_eq!(http.stats().request_count, 2);
}
