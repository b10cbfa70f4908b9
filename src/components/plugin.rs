//! Plugins: long-running companions started with the scan
//!
//! Plugins start during preparation and run alongside the audit. Cleanup
//! blocks until every one of them has finished, and each plugin's result is
//! kept under its name for the report.

use dashmap::DashMap;
use futures::future::BoxFuture;
use log::{debug, error, warn};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::{ComponentError, ComponentKind};
use crate::http::HttpClient;
use crate::work_queue::AuditQueues;

/// Handles a plugin may use while it runs
#[derive(Clone)]
pub struct PluginContext {
    pub queues: Arc<AuditQueues>,
    pub http: Arc<dyn HttpClient>,
}

pub trait Plugin: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn run(self: Arc<Self>, ctx: PluginContext) -> BoxFuture<'static, anyhow::Result<serde_json::Value>>;
}

/// Registry of loaded plugins and their results
#[derive(Default)]
pub struct Plugins {
    loaded: Vec<Arc<dyn Plugin>>,
    running: Mutex<Vec<(String, JoinHandle<anyhow::Result<serde_json::Value>>)>>,
    results: DashMap<String, serde_json::Value>,
}

impl std::fmt::Debug for Plugins {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugins")
            .field(
                "loaded",
                &self.loaded.iter().map(|plugin| plugin.name()).collect::<Vec<_>>(),
            )
            .field("running", &self.running.lock().len())
            .field("results", &self.results.len())
            .finish()
    }
}

impl Plugins {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        self.loaded.retain(|loaded| loaded.name() != plugin.name());
        self.loaded.push(plugin);
    }

    #[must_use]
    pub fn with(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.register(plugin);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Plugin>, ComponentError> {
        self.loaded
            .iter()
            .find(|plugin| plugin.name() == name)
            .cloned()
            .ok_or_else(|| ComponentError::not_found(ComponentKind::Plugin, name))
    }

    /// Start every loaded plugin on its own task
    pub fn run(&self, ctx: &PluginContext) {
        let mut running = self.running.lock();
        for plugin in &self.loaded {
            let name = plugin.name().to_string();
            debug!("Starting plugin '{name}'");
            let handle = tokio::spawn(Arc::clone(plugin).run(ctx.clone()));
            running.push((name, handle));
        }
    }

    /// Wait for every started plugin and collect its result
    pub async fn block(&self) {
        let running = std::mem::take(&mut *self.running.lock());
        for (name, handle) in running {
            match handle.await {
                Ok(Ok(result)) => {
                    self.results.insert(name, result);
                }
                Ok(Err(e)) => warn!("Plugin '{name}' failed: {e:#}"),
                Err(e) => error!("Plugin '{name}' task aborted: {e}"),
            }
        }
    }

    /// Results of the plugins that finished successfully, by name
    #[must_use]
    pub fn results(&self) -> BTreeMap<String, serde_json::Value> {
        self.results
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub(crate) fn clear_results(&self) {
        self.results.clear();
    }
}
