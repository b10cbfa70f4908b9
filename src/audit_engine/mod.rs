//! Audit Engine Module
//!
//! The orchestration core: the scan state machine, queue draining, the
//! per-page audit pipeline and the stats and report surfaces built on top.

pub mod audit_types;
pub mod builder;
pub mod core;
pub mod progress;
pub mod report;
pub mod state;
pub mod stats;

pub use audit_types::{AuditError, AuditResult};
pub use builder::EngineBuilder;
pub use self::core::Engine;
pub use progress::{NoOpProgress, ProgressReporter};
pub use report::AuditReport;
pub use state::ScanStatus;
pub use stats::{ScanStats, estimate_remaining, progress_percent};
