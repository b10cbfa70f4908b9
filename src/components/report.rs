//! Report generators run over the finished audit

use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;

use super::{ComponentError, ComponentKind};
use crate::audit_engine::AuditReport;

pub trait Report: Send + Sync {
    fn name(&self) -> &str;

    /// Produce the report's output (file, stdout, remote service)
    fn run(&self, report: &AuditReport) -> anyhow::Result<()>;

    /// Render into a string, for reports that have a textual form
    fn render(&self, _report: &AuditReport) -> Option<anyhow::Result<String>> {
        None
    }
}

/// Registry of loaded reports
#[derive(Default)]
pub struct Reports {
    loaded: Vec<Arc<dyn Report>>,
}

impl std::fmt::Debug for Reports {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.loaded.iter().map(|report| report.name()))
            .finish()
    }
}

impl Reports {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, report: Arc<dyn Report>) {
        self.loaded.retain(|loaded| loaded.name() != report.name());
        self.loaded.push(report);
    }

    #[must_use]
    pub fn with(mut self, report: Arc<dyn Report>) -> Self {
        self.register(report);
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

    pub fn get(&self, name: &str) -> Result<Arc<dyn Report>, ComponentError> {
        self.loaded
            .iter()
            .find(|report| report.name() == name)
            .cloned()
            .ok_or_else(|| ComponentError::not_found(ComponentKind::Report, name))
    }

    /// Run every loaded report; one failing report does not stop the rest
    pub fn run(&self, report: &AuditReport) {
        for generator in &self.loaded {
            match generator.run(report) {
                Ok(()) => info!("Report '{}' generated", generator.name()),
                Err(e) => error!("Report '{}' failed: {e:#}", generator.name()),
            }
        }
    }

    /// Render `report` with the generator called `name`
    pub fn report_as(&self, name: &str, report: &AuditReport) -> Result<String, ComponentError> {
        let generator = self.get(name)?;
        match generator.render(report) {
            Some(Ok(rendered)) => Ok(rendered),
            Some(Err(source)) => Err(ComponentError::Failed {
                kind: ComponentKind::Report,
                name: name.to_string(),
                source,
            }),
            None => Err(ComponentError::NotSerializable(name.to_string())),
        }
    }
}

/// Pretty-printed JSON report, written to a file or logged
#[derive(Debug, Clone, Default)]
pub struct JsonReport {
    output: Option<PathBuf>,
}

impl JsonReport {
    pub const NAME: &'static str = "json";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            output: Some(path.into()),
        }
    }
}

impl Report for JsonReport {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(&self, report: &AuditReport) -> anyhow::Result<()> {
        let rendered = serde_json::to_string_pretty(report)?;
        match &self.output {
            Some(path) => {
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, rendered)?;
                info!("JSON report written to {}", path.display());
            }
            None => info!("JSON report:\n{rendered}"),
        }
        Ok(())
    }

    fn render(&self, report: &AuditReport) -> Option<anyhow::Result<String>> {
        Some(serde_json::to_string_pretty(report).map_err(Into::into))
    }
}
