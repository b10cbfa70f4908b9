//! Pluggable components the engine drives: checks, reports, plugins, the
//! session keeper and the timing-attack verifier
//!
//! Registries look components up by name. A lookup miss is returned to the
//! caller immediately as a [`ComponentError`].

pub mod check;
pub mod plugin;
pub mod report;
pub mod session;
pub mod timing;

pub use check::{Check, CheckContext, Checks, Issue, Severity, TimingCandidate};
pub use plugin::{Plugin, PluginContext, Plugins};
pub use report::{JsonReport, Report, Reports};
pub use session::{NoSession, Session};
pub use timing::{RefetchTimingVerifier, TimingVerifier};

use std::fmt;

/// Kind of component a registry holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Check,
    Report,
    Plugin,
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Check => f.write_str("check"),
            Self::Report => f.write_str("report"),
            Self::Plugin => f.write_str("plugin"),
        }
    }
}

/// Error types for component lookup and use
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    #[error("No {kind} named '{name}'")]
    NotFound { kind: ComponentKind, name: String },

    #[error("Report '{0}' cannot be rendered to a string")]
    NotSerializable(String),

    #[error("{kind} '{name}' failed: {source:#}")]
    Failed {
        kind: ComponentKind,
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ComponentError {
    pub(crate) fn not_found(kind: ComponentKind, name: &str) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
        }
    }
}
