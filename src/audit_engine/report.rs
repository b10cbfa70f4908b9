//! Result aggregate handed to the report generators

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::components::Issue;
use crate::config::AuditConfig;

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub scan_id: Uuid,
    pub config: AuditConfig,
    /// URL → last observed status code
    pub sitemap: BTreeMap<String, u16>,
    pub issues: Vec<Issue>,
    pub plugins: BTreeMap<String, serde_json::Value>,
    /// URLs dropped after exhausting their fetch retries
    pub failures: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Set when the audit phase ended early
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditReport {
    /// Number of issues at each severity, lowest first
    #[must_use]
    pub fn issue_counts(&self) -> BTreeMap<crate::components::Severity, usize> {
        let mut counts = BTreeMap::new();
        for issue in &self.issues {
            *counts.entry(issue.severity).or_insert(0) += 1;
        }
        counts
    }
}
