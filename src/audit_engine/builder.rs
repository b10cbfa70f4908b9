//! Assembling an [`Engine`] from its collaborators
//!
//! Every collaborator has a default built from the config, so the smallest
//! useful engine is `Engine::builder(config).check(..).build()`.

use std::sync::Arc;
use tokio::sync::Notify;

use super::core::Engine;
use super::progress::{NoOpProgress, ProgressReporter};
use crate::browser_cluster::{
    BrowserClusterConfig, ChromeWorkerFactory, ClusterLauncher, PoolLauncher,
};
use crate::components::{
    Check, Checks, NoSession, Plugin, Plugins, RefetchTimingVerifier, Report, Reports, Session,
    TimingVerifier,
};
use crate::config::AuditConfig;
use crate::crawler::{Crawler, SpiderCrawler};
use crate::dispatcher::BrowserDispatcher;
use crate::http::{HttpClient, ReqwestClient};
use crate::job::JobIdAllocator;
use crate::scope::ScopePolicy;
use crate::sitemap::Sitemap;
use crate::work_queue::AuditQueues;

/// Where the browser pool comes from
enum PoolSource {
    Default,
    Custom(Arc<dyn PoolLauncher>),
    Disabled,
}

pub struct EngineBuilder {
    config: AuditConfig,
    http: Option<Arc<dyn HttpClient>>,
    crawler: Option<Arc<dyn Crawler>>,
    checks: Checks,
    reports: Reports,
    plugins: Plugins,
    session: Option<Arc<dyn Session>>,
    timing: Option<Arc<dyn TimingVerifier>>,
    pool: PoolSource,
    job_ids: Option<Arc<JobIdAllocator>>,
    progress: Option<Arc<dyn ProgressReporter>>,
}

impl EngineBuilder {
    #[must_use]
    pub fn new(config: AuditConfig) -> Self {
        Self {
            config,
            http: None,
            crawler: None,
            checks: Checks::new(),
            reports: Reports::new(),
            plugins: Plugins::new(),
            session: None,
            timing: None,
            pool: PoolSource::Default,
            job_ids: None,
            progress: None,
        }
    }

    #[must_use]
    pub fn http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    #[must_use]
    pub fn crawler(mut self, crawler: Arc<dyn Crawler>) -> Self {
        self.crawler = Some(crawler);
        self
    }

    #[must_use]
    pub fn check(mut self, check: Arc<dyn Check>) -> Self {
        self.checks.register(check);
        self
    }

    #[must_use]
    pub fn checks(mut self, checks: Checks) -> Self {
        self.checks = checks;
        self
    }

    #[must_use]
    pub fn report(mut self, report: Arc<dyn Report>) -> Self {
        self.reports.register(report);
        self
    }

    #[must_use]
    pub fn plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.register(plugin);
        self
    }

    #[must_use]
    pub fn session(mut self, session: Arc<dyn Session>) -> Self {
        self.session = Some(session);
        self
    }

    #[must_use]
    pub fn timing_verifier(mut self, timing: Arc<dyn TimingVerifier>) -> Self {
        self.timing = Some(timing);
        self
    }

    /// Use `launcher` instead of launching local Chromium workers
    #[must_use]
    pub fn pool_launcher(mut self, launcher: Arc<dyn PoolLauncher>) -> Self {
        self.pool = PoolSource::Custom(launcher);
        self
    }

    /// Skip browser analysis entirely
    #[must_use]
    pub fn without_browser(mut self) -> Self {
        self.pool = PoolSource::Disabled;
        self
    }

    /// Share a job id sequence with other engines
    #[must_use]
    pub fn job_ids(mut self, ids: Arc<JobIdAllocator>) -> Self {
        self.job_ids = Some(ids);
        self
    }

    #[must_use]
    pub fn progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Build the engine; fails only if the default HTTP client cannot be built
    pub fn build(self) -> anyhow::Result<Engine> {
        let config = self.config;
        let scope = ScopePolicy::from_config(&config);
        let wake = Arc::new(Notify::new());
        let sitemap = Arc::new(Sitemap::new());
        let queues = Arc::new(AuditQueues::new(
            scope.clone(),
            config.url_limit(),
            Arc::clone(&sitemap),
            Arc::clone(&wake),
        ));

        let http: Arc<dyn HttpClient> = match self.http {
            Some(http) => http,
            None => Arc::new(ReqwestClient::new(&config)?),
        };
        let crawler = self.crawler.unwrap_or_else(|| {
            Arc::new(SpiderCrawler::new(
                Arc::clone(&http),
                scope,
                config.max_crawl_depth(),
                config.url_limit(),
            ))
        });
        let timing = self
            .timing
            .unwrap_or_else(|| Arc::new(RefetchTimingVerifier::new(Arc::clone(&http))));

        let launcher = if config.browser_pool_size() == 0 {
            None
        } else {
            match self.pool {
                PoolSource::Disabled => None,
                PoolSource::Custom(launcher) => Some(launcher),
                PoolSource::Default => Some(Arc::new(ClusterLauncher::new(
                    BrowserClusterConfig {
                        pool_size: config.browser_pool_size(),
                        job_timeout: config.job_timeout(),
                    },
                    Arc::new(ChromeWorkerFactory::new(config.headless(), config.user_agent())),
                )) as Arc<dyn PoolLauncher>),
            }
        };

        let dispatcher = BrowserDispatcher::new(
            config.dom_depth_limit(),
            launcher,
            Arc::clone(&queues),
            self.job_ids.unwrap_or_default(),
            Arc::clone(&wake),
        );

        Ok(Engine::assemble(
            config,
            sitemap,
            queues,
            wake,
            dispatcher,
            http,
            crawler,
            self.checks,
            self.reports,
            self.plugins,
            self.session.unwrap_or_else(|| Arc::new(NoSession)),
            timing,
            self.progress.unwrap_or_else(|| Arc::new(NoOpProgress)),
        ))
    }
}
