use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Correlation key between a submitted job and its registered callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job#{}", self.0)
    }
}

/// Monotonic id source for new jobs
///
/// Owned by whoever creates jobs (the engine hands one to its dispatcher), so
/// there is no hidden process-wide counter and tests can start from a known
/// value.
#[derive(Debug, Default)]
pub struct JobIdAllocator {
    next: AtomicU64,
}

impl JobIdAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start allocating at `first`
    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn allocate(&self) -> JobId {
        JobId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
