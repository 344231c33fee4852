//! Liveness probing
//!
//! After a sustained run of empty batches the controller cannot tell a real
//! gap in the ID space from a source that has stopped answering. Re-fetching
//! an ID known to hold data settles it.

use crate::fetch::FetchStrategy;
use crate::record::Extractor;
use std::time::Duration;

/// Probe verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    Dead,
}

/// Re-fetches a known-good ID with a longer timeout
#[derive(Debug, Clone)]
pub struct LivenessProber {
    probe_id: u64,
    timeout: Duration,
}

impl LivenessProber {
    pub fn new(probe_id: u64, timeout: Duration) -> Self {
        Self { probe_id, timeout }
    }

    /// Reports `Alive` iff the probe record's primary field is populated
    ///
    /// A fetch error counts as `Dead`: the source is not answering.
    pub async fn probe<F>(&self, fetcher: &F, extractor: &Extractor) -> Liveness
    where
        F: FetchStrategy + ?Sized,
    {
        tracing::info!(
            "Too many empty batches, checking whether the source is reachable (probe id {})",
            self.probe_id
        );

        let document = match fetcher.fetch(self.probe_id, self.timeout).await {
            Ok(outcome) => outcome.into_document(),
            Err(e) => {
                tracing::warn!("Liveness probe failed: {}", e);
                return Liveness::Dead;
            }
        };

        if extractor.extract(self.probe_id, &document).is_empty() {
            tracing::warn!("Liveness probe for {} returned no data", self.probe_id);
            Liveness::Dead
        } else {
            tracing::info!("Source is reachable");
            Liveness::Alive
        }
    }
}
