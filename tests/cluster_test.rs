//! Browser cluster job execution and callback delivery

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use kodegen_tools_webaudit::{
    BrowserCluster, BrowserClusterConfig, BrowserPool, ClusterError, ExploreTask, Job,
    JobCallback, JobError, JobIdAllocator, JobOptions, JobOutcome, Page,
};

mod common;
use common::{FakeWorker, FakeWorkerFactory, STATIC_BODY};

fn config(pool_size: usize) -> BrowserClusterConfig {
    BrowserClusterConfig {
        pool_size,
        job_timeout: Duration::from_secs(2),
    }
}

fn job_for(template: &Job, url: &str) -> Job {
    template.forward(
        JobOptions::for_resource(&Page::new(url, 200, STATIC_BODY)).expect("page serializes"),
    )
}

fn recorder() -> (JobCallback, Arc<Mutex<Vec<JobOutcome>>>) {
    let outcomes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&outcomes);
    let callback: JobCallback = Arc::new(move |outcome: JobOutcome| sink.lock().push(outcome));
    (callback, outcomes)
}

async fn wait_idle(cluster: &BrowserCluster, idle: &Notify) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cluster.is_idle() {
            let _ = tokio::time::timeout(Duration::from_millis(20), idle.notified()).await;
        }
    })
    .await
    .expect("cluster should go idle");
}

#[tokio::test]
async fn one_callback_serves_every_forwarded_job() {
    common::init_logging();
    let factory = FakeWorkerFactory::new(FakeWorker::new());
    let idle = Arc::new(Notify::new());
    let cluster = BrowserCluster::start(config(2), &factory, Arc::clone(&idle))
        .await
        .expect("cluster starts");

    let ids = JobIdAllocator::new();
    let template = Job::new(&ids, Arc::new(ExploreTask), JobOptions::new());
    let (callback, outcomes) = recorder();

    cluster
        .submit(job_for(&template, "https://example.com/1"), Some(callback))
        .expect("accepted");
    for n in 2..=4 {
        cluster
            .submit(job_for(&template, &format!("https://example.com/{n}")), None)
            .expect("accepted");
    }

    wait_idle(&cluster, &idle).await;

    let outcomes = outcomes.lock();
    assert_eq!(outcomes.len(), 4);
    assert!(outcomes.iter().all(|outcome| matches!(
        outcome,
        Ok(response) if response.job_id == template.id()
    )));
    assert_eq!(cluster.registered_callbacks(), 1);
    assert_eq!(cluster.sitemap().len(), 4);
    assert_eq!(factory.launches.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failures_reach_the_callback_as_errors() {
    let factory = FakeWorkerFactory::new(FakeWorker::new().fail_on("https://example.com/bad"));
    let idle = Arc::new(Notify::new());
    let cluster = BrowserCluster::start(config(1), &factory, Arc::clone(&idle))
        .await
        .expect("cluster starts");

    let ids = JobIdAllocator::new();
    let template = Job::new(&ids, Arc::new(ExploreTask), JobOptions::new());
    let (callback, outcomes) = recorder();

    cluster
        .submit(job_for(&template, "https://example.com/bad"), Some(callback))
        .expect("accepted");
    wait_idle(&cluster, &idle).await;

    let outcomes = outcomes.lock();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(&outcomes[0], Err(JobError::Failed { job_id, .. }) if *job_id == template.id()));
    assert!(cluster.sitemap().is_empty());
}

#[tokio::test]
async fn slow_jobs_time_out() {
    let factory = FakeWorkerFactory::new(FakeWorker::new().delay(Duration::from_secs(10)));
    let idle = Arc::new(Notify::new());
    let cluster = BrowserCluster::start(
        BrowserClusterConfig {
            pool_size: 1,
            job_timeout: Duration::from_millis(50),
        },
        &factory,
        Arc::clone(&idle),
    )
    .await
    .expect("cluster starts");

    let ids = JobIdAllocator::new();
    let template = Job::new(&ids, Arc::new(ExploreTask), JobOptions::new());
    let (callback, outcomes) = recorder();

    cluster
        .submit(job_for(&template, "https://example.com/slow"), Some(callback))
        .expect("accepted");
    wait_idle(&cluster, &idle).await;

    assert!(matches!(
        outcomes.lock().as_slice(),
        [Err(JobError::TimedOut { .. })]
    ));
}

#[tokio::test]
async fn submissions_after_shutdown_are_rejected() {
    let factory = FakeWorkerFactory::new(FakeWorker::new());
    let cluster = BrowserCluster::start(config(1), &factory, Arc::new(Notify::new()))
        .await
        .expect("cluster starts");

    cluster.shutdown().await.expect("shutdown succeeds");

    let ids = JobIdAllocator::new();
    let job = Job::new(&ids, Arc::new(ExploreTask), JobOptions::new());
    let job_id = job.id();
    assert!(matches!(
        cluster.submit(job, None),
        Err(ClusterError::ShutDown(id)) if id == job_id
    ));
    assert!(cluster.is_idle());
}
