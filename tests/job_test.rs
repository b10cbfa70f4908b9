//! Job id preservation and browser binding

use std::sync::Arc;
use std::time::Duration;

use kodegen_tools_webaudit::{
    BrowserHandle, EventTriggerTask, ExploreTask, Job, JobError, JobId, JobIdAllocator,
    JobOptions, Page, Transition,
};

mod common;
use common::{FakeWorker, STATIC_BODY};

fn resource(url: &str) -> JobOptions {
    JobOptions::for_resource(&Page::new(url, 200, STATIC_BODY)).expect("page serializes")
}

#[test]
fn ids_come_from_the_allocator() {
    let ids = JobIdAllocator::starting_at(40);
    let first = Job::new(&ids, Arc::new(ExploreTask), JobOptions::new());
    let second = Job::new(&ids, Arc::new(ExploreTask), JobOptions::new());

    assert_eq!(first.id(), JobId(40));
    assert_eq!(second.id(), JobId(41));
}

#[test]
fn forwarding_preserves_the_id() {
    let ids = JobIdAllocator::new();
    let template = Job::new(&ids, Arc::new(ExploreTask), JobOptions::new());

    let forwarded = template.forward(resource("https://example.com/a"));
    let retasked = template.forward_as(Arc::new(EventTriggerTask), JobOptions::new());
    let copy = forwarded.clean_copy();

    assert_eq!(forwarded.id(), template.id());
    assert_eq!(retasked.id(), template.id());
    assert_eq!(copy.id(), template.id());
    assert_eq!(retasked.task_name(), "event_trigger");
    assert_eq!(copy.options(), forwarded.options());
    assert!(!copy.is_bound());

    let explicit = Job::with_id(JobId(7), Arc::new(ExploreTask), JobOptions::new());
    assert_eq!(explicit.id(), JobId(7));
}

#[tokio::test]
async fn browser_is_unbound_after_success() {
    let rendered = Page::new("https://example.com/c", 200, STATIC_BODY);
    let worker: BrowserHandle =
        Arc::new(FakeWorker::new().render("https://example.com/a", rendered.clone()));
    let ids = JobIdAllocator::new();
    let mut job = Job::new(&ids, Arc::new(ExploreTask), resource("https://example.com/a"));

    let response = job
        .configure_and_run(worker)
        .await
        .expect("explore succeeds");

    assert_eq!(response.job_id, job.id());
    assert_eq!(response.task, "explore");
    assert_eq!(response.page, rendered);
    assert!(!job.is_bound());
}

#[tokio::test]
async fn browser_is_unbound_after_failure() {
    let worker: BrowserHandle = Arc::new(FakeWorker::new().fail_on("https://example.com/a"));
    let ids = JobIdAllocator::new();
    let mut job = Job::new(&ids, Arc::new(ExploreTask), resource("https://example.com/a"));

    let err = job
        .configure_and_run(worker)
        .await
        .expect_err("renderer fails");

    assert!(matches!(err, JobError::Failed { job_id, .. } if job_id == job.id()));
    assert!(!job.is_bound());
}

#[tokio::test]
async fn browser_is_unbound_when_the_run_is_dropped() {
    let worker: BrowserHandle = Arc::new(FakeWorker::new().delay(Duration::from_secs(5)));
    let ids = JobIdAllocator::new();
    let mut job = Job::new(&ids, Arc::new(ExploreTask), resource("https://example.com/slow"));

    let outcome =
        tokio::time::timeout(Duration::from_millis(50), job.configure_and_run(worker)).await;

    assert!(outcome.is_err(), "run should have been cut off");
    assert!(!job.is_bound());
}

#[tokio::test]
async fn missing_resource_is_a_task_error() {
    let worker: BrowserHandle = Arc::new(FakeWorker::new());
    let ids = JobIdAllocator::new();
    let mut job = Job::new(&ids, Arc::new(ExploreTask), JobOptions::new());

    assert!(job.configure_and_run(worker).await.is_err());
    assert!(!job.is_bound());
}

#[tokio::test]
async fn event_trigger_appends_the_transition() {
    let worker: BrowserHandle = Arc::new(FakeWorker::new());
    let page = Page::new("https://example.com/menu", 200, STATIC_BODY);
    let transition = Transition::new("#open", "click");
    let options = EventTriggerTask::options(&page, &transition).expect("options encode");

    let ids = JobIdAllocator::new();
    let mut job = Job::new(&ids, Arc::new(EventTriggerTask), options);
    let response = job.configure_and_run(worker).await.expect("trigger succeeds");

    assert_eq!(response.page.dom.transitions, vec![transition]);
    assert_eq!(response.page.dom_depth(), 1);
}
