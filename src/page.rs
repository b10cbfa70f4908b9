//! Page model shared by the queues, the browser cluster and the checks
//!
//! A `Page` is a fetched resource plus the DOM state it was captured in. The
//! DOM state is the list of transitions (events fired since the initial load)
//! that produced it, which is also what distinguishes two pages living at the
//! same URL.

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::Xxh3;

/// Status code used for "no response at all" (network failure)
pub const NO_RESPONSE: u16 = 0;

/// A single DOM transition: one event fired on one element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transition {
    /// CSS locator of the element the event fired on
    pub element: String,
    /// DOM event name, e.g. `click`
    pub event: String,
}

impl Transition {
    #[must_use]
    pub fn new(element: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            event: event.into(),
        }
    }
}

/// DOM state of a page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomSnapshot {
    /// Transitions applied after the initial load, in order
    pub transitions: Vec<Transition>,
    /// Sub-paths discovered in this DOM state (absolute or relative)
    pub paths: Vec<String>,
}

/// A fetched resource with its resolved DOM state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub url: String,
    /// HTTP status code, [`NO_RESPONSE`] when the fetch got nothing back
    pub code: u16,
    pub body: String,
    #[serde(default)]
    pub dom: DomSnapshot,
}

impl Page {
    #[must_use]
    pub fn new(url: impl Into<String>, code: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            code,
            body: body.into(),
            dom: DomSnapshot::default(),
        }
    }

    /// Page standing in for a fetch that produced no response
    #[must_use]
    pub fn no_response(url: impl Into<String>) -> Self {
        Self::new(url, NO_RESPONSE, String::new())
    }

    #[must_use]
    pub fn with_paths(mut self, paths: Vec<String>) -> Self {
        self.dom.paths = paths;
        self
    }

    #[must_use]
    pub fn with_transitions(mut self, transitions: Vec<Transition>) -> Self {
        self.dom.transitions = transitions;
        self
    }

    /// Whether the fetch produced any response (an HTTP error status counts)
    #[must_use]
    pub fn has_response(&self) -> bool {
        self.code != NO_RESPONSE
    }

    /// Number of DOM transitions between the initial load and this state
    #[must_use]
    pub fn dom_depth(&self) -> usize {
        self.dom.transitions.len()
    }

    /// Whether the body contains anything a browser would execute
    #[must_use]
    pub fn has_script(&self) -> bool {
        const MARKERS: [&str; 7] = [
            "<script",
            "javascript:",
            "onclick=",
            "onload=",
            "onsubmit=",
            "onchange=",
            "onmouseover=",
        ];

        let lowered = self.body.to_ascii_lowercase();
        MARKERS.iter().any(|marker| lowered.contains(marker))
    }

    /// Dedup key for the page queue: URL plus DOM transitions
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = Xxh3::new();
        hasher.update(self.url.as_bytes());
        for transition in &self.dom.transitions {
            hasher.update(b"\0");
            hasher.update(transition.element.as_bytes());
            hasher.update(b"\0");
            hasher.update(transition.event.as_bytes());
        }
        hasher.digest()
    }
}
