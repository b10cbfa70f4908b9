//! URL/Page queue dedup, limits and counters

use std::sync::Arc;
use tokio::sync::Notify;

use kodegen_tools_webaudit::{AuditConfig, AuditQueues, Page, ScopePolicy, Sitemap, Transition};

mod common;
use common::STATIC_BODY;

fn queues_for(config: &AuditConfig) -> AuditQueues {
    AuditQueues::new(
        ScopePolicy::from_config(config),
        config.url_limit(),
        Arc::new(Sitemap::new()),
        Arc::new(Notify::new()),
    )
}

fn queues() -> AuditQueues {
    queues_for(&common::config("https://example.com/"))
}

#[test]
fn duplicate_url_is_counted_once() {
    let queues = queues();

    assert!(queues.push_url("https://example.com/a"));
    assert!(!queues.push_url("https://example.com/a"));
    assert!(!queues.push_url("https://example.com/a#section"));
    assert!(!queues.push_url("https://EXAMPLE.com:443/a"));

    assert_eq!(queues.url_queue_len(), 1);
    assert_eq!(queues.url_queue_total(), 1);
}

#[test]
fn out_of_scope_and_malformed_urls_are_rejected() {
    let config = AuditConfig::builder()
        .start_url("https://example.com/")
        .excluded_patterns(vec!["*/logout".to_string()])
        .build()
        .expect("valid config");
    let queues = queues_for(&config);

    assert!(!queues.push_url("https://other.org/"));
    assert!(!queues.push_url("not a url"));
    assert!(!queues.push_url("https://example.com/logout"));
    assert!(queues.is_empty());
    assert_eq!(queues.url_queue_total(), 0);
}

#[test]
fn url_limit_caps_lifetime_pushes() {
    let config = AuditConfig::builder()
        .start_url("https://example.com/")
        .url_limit(2)
        .build()
        .expect("valid config");
    let queues = queues_for(&config);

    assert!(queues.push_url("https://example.com/1"));
    assert!(queues.push_url("https://example.com/2"));
    assert!(queues.url_limit_reached());
    assert!(!queues.push_url("https://example.com/3"));

    // Popping does not free up budget
    let _ = queues.try_pop_url();
    assert!(!queues.push_url("https://example.com/4"));
    assert_eq!(queues.url_queue_total(), 2);
}

#[test]
fn requeue_bypasses_filter_and_counter() {
    let queues = queues();
    assert!(queues.push_url("https://example.com/flaky"));
    let url = queues.try_pop_url().expect("queued");

    queues.requeue_url(url.clone());

    assert_eq!(queues.try_pop_url(), Some(url));
    assert_eq!(queues.url_queue_total(), 1);
}

#[test]
fn pages_dedup_on_url_and_transitions() {
    let queues = queues();
    let page = Page::new("https://example.com/app", 200, STATIC_BODY);
    let clicked = page
        .clone()
        .with_transitions(vec![Transition::new("#menu", "click")]);

    assert!(queues.push_page(page.clone()));
    assert!(!queues.push_page(page));
    assert!(queues.push_page(clicked));

    assert_eq!(queues.page_queue_len(), 2);
    assert_eq!(queues.page_queue_total(), 2);
    assert_eq!(queues.sitemap().get("https://example.com/app"), Some(200));
}

#[test]
fn reset_clears_queues_filters_and_counters() {
    let queues = queues();
    assert!(queues.push_url("https://example.com/a"));
    assert!(queues.push_page(Page::new("https://example.com/p", 200, STATIC_BODY)));

    queues.reset();

    assert!(queues.is_empty());
    assert_eq!(queues.url_queue_total(), 0);
    assert_eq!(queues.page_queue_total(), 0);
    assert!(queues.push_url("https://example.com/a"));
    assert!(queues.push_page(Page::new("https://example.com/p", 200, STATIC_BODY)));
}

#[tokio::test]
async fn concurrent_pushes_of_one_url_accept_exactly_one() {
    let queues = Arc::new(queues());
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let queues = Arc::clone(&queues);
            tokio::spawn(async move { queues.push_url("https://example.com/race") })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        if handle.await.expect("task should not panic") {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(queues.url_queue_total(), 1);
}

#[tokio::test]
async fn push_wakes_the_engine_signal() {
    let wake = Arc::new(Notify::new());
    let config = common::config("https://example.com/");
    let queues = AuditQueues::new(
        ScopePolicy::from_config(&config),
        None,
        Arc::new(Sitemap::new()),
        Arc::clone(&wake),
    );

    assert!(queues.push_url("https://example.com/wake"));

    tokio::time::timeout(std::time::Duration::from_secs(1), wake.notified())
        .await
        .expect("push should leave a wake permit");
}
