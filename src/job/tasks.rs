//! Concrete job tasks

use anyhow::Context;
use futures::future::BoxFuture;

use super::{JobOptions, JobTask};
use crate::browser_cluster::BrowserHandle;
use crate::page::{Page, Transition};

/// Load the resource page in the browser and collect the rendered result
#[derive(Debug, Default, Clone, Copy)]
pub struct ExploreTask;

impl JobTask for ExploreTask {
    fn name(&self) -> &'static str {
        "explore"
    }

    fn run<'a>(
        &'a self,
        options: &'a JobOptions,
        browser: &'a BrowserHandle,
    ) -> BoxFuture<'a, anyhow::Result<Page>> {
        Box::pin(async move {
            let page = options.resource()?;
            browser
                .explore(&page)
                .await
                .with_context(|| format!("Failed to explore {}", page.url))
        })
    }
}

/// Fire one DOM event on one element of the resource page
///
/// Options: `resource` (the page), `element` (CSS locator) and `event`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventTriggerTask;

impl EventTriggerTask {
    pub const ELEMENT_KEY: &'static str = "element";
    pub const EVENT_KEY: &'static str = "event";

    /// Build the options for triggering `transition` on `page`
    pub fn options(page: &Page, transition: &Transition) -> anyhow::Result<JobOptions> {
        JobOptions::for_resource(page)?
            .with(Self::ELEMENT_KEY, &transition.element)?
            .with(Self::EVENT_KEY, &transition.event)
    }
}

impl JobTask for EventTriggerTask {
    fn name(&self) -> &'static str {
        "event_trigger"
    }

    fn run<'a>(
        &'a self,
        options: &'a JobOptions,
        browser: &'a BrowserHandle,
    ) -> BoxFuture<'a, anyhow::Result<Page>> {
        Box::pin(async move {
            let page = options.resource()?;
            let transition = Transition::new(
                options.get::<String>(Self::ELEMENT_KEY)?,
                options.get::<String>(Self::EVENT_KEY)?,
            );
            browser
                .trigger_event(&page, &transition)
                .await
                .with_context(|| {
                    format!(
                        "Failed to trigger '{}' on '{}' at {}",
                        transition.event, transition.element, page.url
                    )
                })
        })
    }
}
