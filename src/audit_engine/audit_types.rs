//! Scan-level error type

use std::fmt;

use super::state::ScanStatus;

/// Custom error type for audit operations
#[derive(Debug, Clone)]
pub enum AuditError {
    /// `run` was called while the engine was not ready
    NotReady(ScanStatus),
    /// The crawl phase failed
    Crawl(String),
    /// Other errors
    Other(String),
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotReady(status) => write!(f, "Engine is {status}, reset it before running"),
            Self::Crawl(msg) => write!(f, "Crawl error: {msg}"),
            Self::Other(msg) => write!(f, "Audit error: {msg}"),
        }
    }
}

impl std::error::Error for AuditError {}

impl From<anyhow::Error> for AuditError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{err:#}"))
    }
}

/// Convenience alias for Result with `AuditError`
pub type AuditResult<T> = Result<T, AuditError>;
