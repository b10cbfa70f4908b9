//! Scan lifecycle states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a scan
///
/// `ready → preparing → crawling → auditing → cleanup → done`. Pausing is an
/// overlay reported separately, a scan can be paused in any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    #[default]
    Ready,
    Preparing,
    Crawling,
    Auditing,
    Cleanup,
    Done,
}

impl ScanStatus {
    /// Whether a scan is in progress
    #[must_use]
    pub fn is_running(self) -> bool {
        !matches!(self, Self::Ready | Self::Done)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ready => "ready",
            Self::Preparing => "preparing",
            Self::Crawling => "crawling",
            Self::Auditing => "auditing",
            Self::Cleanup => "cleanup",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}
