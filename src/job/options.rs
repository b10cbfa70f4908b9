use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::page::Page;

/// Key under which jobs carry the page they operate on
pub const RESOURCE_KEY: &str = "resource";

/// Opaque key-value payload describing a job's work
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobOptions(Map<String, Value>);

impl JobOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for a job that operates on `page`
    pub fn for_resource(page: &Page) -> Result<Self> {
        let mut options = Self::new();
        options.insert(RESOURCE_KEY, page)?;
        Ok(options)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Serialize) -> Result<()> {
        let key = key.into();
        let value = serde_json::to_value(value)
            .with_context(|| format!("Failed to encode job option '{key}'"))?;
        self.0.insert(key, value);
        Ok(())
    }

    /// Builder-style `insert`
    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Result<Self> {
        self.insert(key, value)?;
        Ok(self)
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .0
            .get(key)
            .with_context(|| format!("Job option '{key}' is missing"))?;
        serde_json::from_value(value.clone())
            .with_context(|| format!("Job option '{key}' has the wrong shape"))
    }

    /// The page this job operates on
    pub fn resource(&self) -> Result<Page> {
        self.get(RESOURCE_KEY)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
