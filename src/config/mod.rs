//! Configuration module for audit scans
//!
//! This module provides the `AuditConfig` struct and its type-safe builder
//! for configuring scans with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::{AuditConfigBuilder, WithStartUrl};
pub use types::AuditConfig;
