//! Verification of timing-based findings
//!
//! A slow response can be noise. Candidates are re-fetched a few times and
//! only confirmed when every sample is at least as slow as expected.

use futures::future::BoxFuture;
use log::{debug, info};
use std::sync::Arc;
use std::time::Instant;

use super::check::{Issue, TimingCandidate};
use crate::http::HttpClient;

pub trait TimingVerifier: Send + Sync {
    /// Return the issues of the candidates that held up
    fn verify(&self, candidates: Vec<TimingCandidate>) -> BoxFuture<'_, Vec<Issue>>;
}

/// Confirms candidates by re-fetching their URL
pub struct RefetchTimingVerifier {
    http: Arc<dyn HttpClient>,
    samples: usize,
}

impl RefetchTimingVerifier {
    pub const DEFAULT_SAMPLES: usize = 2;

    #[must_use]
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            samples: Self::DEFAULT_SAMPLES,
        }
    }

    #[must_use]
    pub fn samples(mut self, samples: usize) -> Self {
        self.samples = samples.max(1);
        self
    }
}

impl TimingVerifier for RefetchTimingVerifier {
    fn verify(&self, candidates: Vec<TimingCandidate>) -> BoxFuture<'_, Vec<Issue>> {
        Box::pin(async move {
            let mut confirmed = Vec::new();
            'candidates: for candidate in candidates {
                for sample in 1..=self.samples {
                    let started = Instant::now();
                    let page = self.http.fetch(&candidate.url).await;
                    let elapsed = started.elapsed();
                    if !page.has_response() || elapsed < candidate.expected_delay {
                        debug!(
                            "Timing candidate {} rejected on sample {sample}: {elapsed:?} < {:?}",
                            candidate.url, candidate.expected_delay
                        );
                        continue 'candidates;
                    }
                }
                info!("Timing issue confirmed at {}", candidate.url);
                confirmed.push(candidate.issue);
            }
            confirmed
        })
    }
}
