//! Set-membership filter for queue fingerprints

use dashmap::DashSet;
use std::hash::Hash;

/// Append-only fingerprint set
///
/// `insert` is the only way in and reports whether the fingerprint was new,
/// so check-then-insert is one atomic step even with concurrent pushers.
#[derive(Debug)]
pub struct DedupFilter<K: Eq + Hash> {
    seen: DashSet<K>,
}

impl<K: Eq + Hash> Default for DedupFilter<K> {
    fn default() -> Self {
        Self {
            seen: DashSet::new(),
        }
    }
}

impl<K: Eq + Hash> DedupFilter<K> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key`; returns `false` when it was already present
    pub fn insert(&self, key: K) -> bool {
        self.seen.insert(key)
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.seen.contains(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn clear(&self) {
        self.seen.clear();
    }
}
