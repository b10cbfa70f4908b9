//! URL → last observed HTTP status code

use dashmap::DashMap;
use std::collections::BTreeMap;

/// Concurrent sitemap shared by the queues, the engine and browser callbacks
#[derive(Debug, Default)]
pub struct Sitemap {
    entries: DashMap<String, u16>,
}

impl Sitemap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `code` for `url`, overwriting any earlier observation
    pub fn record(&self, url: impl Into<String>, code: u16) {
        self.entries.insert(url.into(), code);
    }

    /// Merge another map in; later observations win
    pub fn merge<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, u16)>,
    {
        for (url, code) in entries {
            self.entries.insert(url, code);
        }
    }

    #[must_use]
    pub fn get(&self, url: &str) -> Option<u16> {
        self.entries.get(url).map(|entry| *entry.value())
    }

    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Ordered copy for reports
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, u16> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}
