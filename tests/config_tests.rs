//! Tests for the type-safe configuration builder and its JSON form

use std::time::Duration;

use kodegen_tools_webaudit::config::AuditConfig;
use kodegen_tools_webaudit::utils::{
    CHROME_USER_AGENT, DEFAULT_BROWSER_POOL_SIZE, DEFAULT_DOM_DEPTH_LIMIT,
    DEFAULT_JOB_TIMEOUT_SECS, DEFAULT_MAX_CRAWL_DEPTH,
};

#[test]
fn test_builder_requires_start_url() {
    // This should not compile if uncommented - no seed URL
    // let config = AuditConfig::builder().build();

    let config = AuditConfig::builder()
        .start_url("example.com")
        .build()
        .expect("valid config");

    assert_eq!(config.start_url(), "https://example.com/");
}

#[test]
fn test_builder_defaults() {
    let config = AuditConfig::builder()
        .start_url("https://example.com")
        .build()
        .expect("valid config");

    assert!(config.restrict_paths().is_none());
    assert!(config.url_limit().is_none());
    assert_eq!(config.dom_depth_limit(), DEFAULT_DOM_DEPTH_LIMIT);
    assert_eq!(config.max_crawl_depth(), DEFAULT_MAX_CRAWL_DEPTH);
    assert_eq!(config.browser_pool_size(), DEFAULT_BROWSER_POOL_SIZE);
    assert_eq!(
        config.job_timeout(),
        Duration::from_secs(DEFAULT_JOB_TIMEOUT_SECS)
    );
    assert!(config.headless());
    assert!(!config.allow_subdomains());
    assert_eq!(config.user_agent(), CHROME_USER_AGENT);
    assert!(config.excluded_patterns_compiled().is_empty());
}

#[test]
fn test_builder_setters() {
    let config = AuditConfig::builder()
        .start_url("http://testsite.local:8080/app")
        .url_limit(50)
        .dom_depth_limit(2)
        .max_crawl_depth(3)
        .browser_pool_size(0)
        .job_timeout_secs(5)
        .http_timeout_secs(7)
        .allow_subdomains(true)
        .allowed_domains(vec!["cdn.testsite.local".to_string()])
        .user_agent("audit-bot/1.0")
        .idle_poll_interval_ms(0)
        .build()
        .expect("valid config");

    assert_eq!(config.start_url(), "http://testsite.local:8080/app");
    assert_eq!(config.url_limit(), Some(50));
    assert_eq!(config.dom_depth_limit(), 2);
    assert_eq!(config.max_crawl_depth(), 3);
    assert_eq!(config.browser_pool_size(), 0);
    assert_eq!(config.job_timeout(), Duration::from_secs(5));
    assert_eq!(config.http_timeout(), Duration::from_secs(7));
    assert!(config.allow_subdomains());
    assert_eq!(
        config.allowed_domains(),
        Some(&["cdn.testsite.local".to_string()][..])
    );
    assert_eq!(config.user_agent(), "audit-bot/1.0");
    assert_eq!(
        config.idle_poll_interval(),
        Duration::from_millis(1),
        "a zero poll interval would spin"
    );
}

#[test]
fn test_invalid_start_url_is_rejected() {
    assert!(AuditConfig::builder().start_url("https://").build().is_err());
    assert!(AuditConfig::builder().start_url("  ").build().is_err());
}

#[test]
fn test_glob_patterns_are_compiled() {
    let config = AuditConfig::builder()
        .start_url("https://example.com")
        .excluded_patterns(vec!["*/logout*".to_string(), "*.pdf".to_string()])
        .include_patterns(vec!["https://example.com/app/*".to_string()])
        .build()
        .expect("valid config");

    let excluded = config.excluded_patterns_compiled();
    assert_eq!(excluded.len(), 2);
    assert!(excluded[0].is_match("https://example.com/logout?next=/"));
    assert!(excluded[1].is_match("https://example.com/files/report.pdf"));
    assert!(!excluded[1].is_match("https://example.com/files/report.pdf.html"));

    let included = config.include_patterns_compiled();
    assert!(included[0].is_match("https://example.com/app/x"));
    assert!(!included[0].is_match("https://example.com/blog"));
}

#[test]
fn test_glob_metacharacters_are_literal() {
    let config = AuditConfig::builder()
        .start_url("https://example.com")
        .excluded_patterns(vec!["*?debug=(1)".to_string()])
        .build()
        .expect("valid config");

    let excluded = &config.excluded_patterns_compiled()[0];
    assert!(excluded.is_match("https://example.com/page?debug=(1)"));
    assert!(!excluded.is_match("https://example.com/pagedebug=1"));
}

#[test]
fn test_json_snapshot_round_trips_behaviour() {
    let original = AuditConfig::builder()
        .start_url("https://example.com")
        .restrict_paths(vec!["/login".to_string()])
        .excluded_patterns(vec!["*/admin/*".to_string()])
        .url_limit(10)
        .build()
        .expect("valid config");

    let snapshot = original.to_json().expect("serializes");
    assert_eq!(snapshot["start_url"], "https://example.com/");
    assert!(
        snapshot.get("excluded_patterns_compiled").is_none(),
        "compiled regexes are not part of the snapshot"
    );

    let restored = AuditConfig::from_json_str(&snapshot.to_string()).expect("loads");
    assert_eq!(restored.url_limit(), Some(10));
    assert_eq!(restored.restrict_paths(), original.restrict_paths());
    assert!(restored.excluded_patterns_compiled()[0].is_match("https://example.com/admin/users"));
}

#[test]
fn test_partial_json_takes_defaults() {
    let config = AuditConfig::from_json_str(r#"{ "start_url": "https://Example.com/a#top" }"#)
        .expect("loads");

    assert_eq!(config.start_url(), "https://example.com/a");
    assert_eq!(config.browser_pool_size(), DEFAULT_BROWSER_POOL_SIZE);
    assert_eq!(config.dom_depth_limit(), DEFAULT_DOM_DEPTH_LIMIT);
    assert!(config.headless());
}

#[test]
fn test_json_without_start_url_is_rejected() {
    assert!(AuditConfig::from_json_str(r#"{ "url_limit": 3 }"#).is_err());
    assert!(AuditConfig::from_json_str("not json").is_err());
}
