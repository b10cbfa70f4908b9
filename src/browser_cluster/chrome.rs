//! Chromium-backed browser worker

use anyhow::{Context, Result};
use chromiumoxide::browser::Browser;
use futures::future::BoxFuture;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::launch::launch_browser;
use super::worker::{BrowserHandle, BrowserWorker, WorkerFactory};
use crate::page::{Page, Transition};

/// Pause after firing an event so handlers can touch the DOM
const EVENT_SETTLE: Duration = Duration::from_millis(200);

/// Collects every sub-path the rendered DOM links to, as written in the markup
const PATHS_SCRIPT: &str = r"
    (() => {
        const paths = [];
        const take = (selector, attribute) => {
            document.querySelectorAll(selector).forEach(el => {
                const value = el.getAttribute(attribute);
                if (value) paths.push(value);
            });
        };
        take('a[href]', 'href');
        take('area[href]', 'href');
        take('form[action]', 'action');
        take('iframe[src]', 'src');
        take('frame[src]', 'src');
        return paths;
    })()
";

fn dispatch_script(transition: &Transition) -> Result<String> {
    let element = serde_json::to_string(&transition.element)?;
    let event = serde_json::to_string(&transition.event)?;
    Ok(format!(
        r"
        (() => {{
            const el = document.querySelector({element});
            if (!el) return false;
            el.dispatchEvent(new Event({event}, {{ bubbles: true, cancelable: true }}));
            return true;
        }})()
        "
    ))
}

/// One Chromium instance driven over CDP
pub struct ChromeWorker {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    user_data_dir: PathBuf,
}

impl fmt::Debug for ChromeWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChromeWorker")
            .field("user_data_dir", &self.user_data_dir)
            .finish_non_exhaustive()
    }
}

impl ChromeWorker {
    pub async fn launch(headless: bool, user_agent: &str, user_data_dir: PathBuf) -> Result<Self> {
        let (browser, handler) = launch_browser(headless, user_agent, &user_data_dir).await?;
        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            user_data_dir,
        })
    }

    /// Open `page.url`, replay its transitions plus `extra`, and capture the
    /// resulting DOM
    async fn render(&self, page: &Page, extra: Option<&Transition>) -> Result<Page> {
        let tab = {
            let browser = self.browser.lock().await;
            browser
                .new_page(page.url.as_str())
                .await
                .with_context(|| format!("Failed to open {}", page.url))?
        };

        let result = async {
            tab.wait_for_navigation()
                .await
                .with_context(|| format!("Navigation failed for {}", page.url))?;

            let mut transitions = Vec::with_capacity(page.dom.transitions.len() + 1);
            for transition in page.dom.transitions.iter().chain(extra) {
                let fired = tab
                    .evaluate(dispatch_script(transition)?)
                    .await
                    .with_context(|| format!("Failed to fire {transition:?}"))?
                    .into_value::<bool>()
                    .unwrap_or(false);
                if !fired {
                    debug!(
                        "Element '{}' not found on {}, skipping '{}'",
                        transition.element, page.url, transition.event
                    );
                }
                transitions.push(transition.clone());
                tokio::time::sleep(EVENT_SETTLE).await;
            }

            let body = tab.content().await.context("Failed to read page content")?;
            let paths = tab
                .evaluate(PATHS_SCRIPT)
                .await
                .context("Failed to collect page paths")?
                .into_value::<Vec<String>>()
                .context("Unexpected path list from page")?;

            Ok::<_, anyhow::Error>(
                Page::new(page.url.clone(), page.code, body)
                    .with_transitions(transitions)
                    .with_paths(paths),
            )
        }
        .await;

        if let Err(e) = tab.close().await {
            debug!("Failed to close tab for {}: {e}", page.url);
        }
        result
    }
}

impl BrowserWorker for ChromeWorker {
    fn explore<'a>(&'a self, page: &'a Page) -> BoxFuture<'a, Result<Page>> {
        Box::pin(self.render(page, None))
    }

    fn trigger_event<'a>(
        &'a self,
        page: &'a Page,
        transition: &'a Transition,
    ) -> BoxFuture<'a, Result<Page>> {
        Box::pin(self.render(page, Some(transition)))
    }

    fn close(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut browser = self.browser.lock().await;
            if let Err(e) = browser.close().await {
                warn!("Failed to close browser: {e}");
            }
            if let Err(e) = browser.wait().await {
                warn!("Failed to wait for browser exit: {e}");
            }
            Ok(())
        })
    }
}

impl Drop for ChromeWorker {
    fn drop(&mut self) {
        self.handler.abort();
        if self.user_data_dir.exists()
            && let Err(e) = std::fs::remove_dir_all(&self.user_data_dir)
        {
            warn!(
                "Failed to remove profile directory {}: {e}",
                self.user_data_dir.display()
            );
        }
    }
}

/// Launches one [`ChromeWorker`] per cluster slot, each with its own profile
#[derive(Debug, Clone)]
pub struct ChromeWorkerFactory {
    headless: bool,
    user_agent: String,
    profile_root: PathBuf,
}

impl ChromeWorkerFactory {
    #[must_use]
    pub fn new(headless: bool, user_agent: impl Into<String>) -> Self {
        Self {
            headless,
            user_agent: user_agent.into(),
            profile_root: std::env::temp_dir()
                .join(format!("kodegen_webaudit_{}", uuid::Uuid::new_v4())),
        }
    }
}

impl WorkerFactory for ChromeWorkerFactory {
    fn launch(&self, index: usize) -> BoxFuture<'_, Result<BrowserHandle>> {
        Box::pin(async move {
            let profile = self.profile_root.join(format!("worker_{index}"));
            let worker =
                ChromeWorker::launch(self.headless, &self.user_agent, profile).await?;
            info!("Browser worker {index} ready");
            Ok(Arc::new(worker) as BrowserHandle)
        })
    }
}
