pub mod audit_engine;
pub mod browser_cluster;
pub mod components;
pub mod config;
pub mod crawler;
pub mod dispatcher;
pub mod http;
pub mod job;
pub mod page;
pub mod pause;
pub mod retry;
pub mod scope;
pub mod sitemap;
pub mod utils;
pub mod work_queue;

pub use audit_engine::{
    AuditError, AuditReport, AuditResult, Engine, EngineBuilder, NoOpProgress, ProgressReporter,
    ScanStats, ScanStatus,
};
pub use browser_cluster::{
    BrowserCluster, BrowserClusterConfig, BrowserHandle, BrowserPool, BrowserWorker,
    ChromeWorker, ChromeWorkerFactory, ClusterError, ClusterLauncher, JobCallback, JobOutcome,
    PoolLauncher, WorkerFactory,
};
pub use components::{
    Check, CheckContext, Checks, ComponentError, ComponentKind, Issue, JsonReport, NoSession,
    Plugin, PluginContext, Plugins, RefetchTimingVerifier, Report, Reports, Session, Severity,
    TimingCandidate, TimingVerifier,
};
pub use config::AuditConfig;
pub use crawler::{Crawler, SpiderCrawler};
pub use dispatcher::BrowserDispatcher;
pub use http::{HttpClient, HttpStats, ReqwestClient, ResponseHandler};
pub use job::{
    EventTriggerTask, ExploreTask, Job, JobError, JobId, JobIdAllocator, JobOptions, JobResponse,
    JobTask,
};
pub use page::{DomSnapshot, NO_RESPONSE, Page, Transition};
pub use pause::{PauseController, PauseToken};
pub use retry::{RetryDecision, RetryTracker};
pub use scope::ScopePolicy;
pub use sitemap::Sitemap;
pub use work_queue::{AuditQueues, DedupFilter, WorkQueue};

/// Build an engine for `config` with `checks` and the default collaborators,
/// run one scan and return its report
pub async fn audit(config: AuditConfig, checks: Checks) -> anyhow::Result<AuditReport> {
    let engine = Engine::builder(config).checks(checks).build()?;
    Ok(engine.run().await?)
}
