//! LatestState - the single piece of state shared between the loops.
//!
//! The ingest loop publishes a fresh immutable snapshot for every sample; the
//! composer reads whichever snapshot is current when a beat starts. Snapshots
//! are swapped whole through a `watch` channel, so a reader never sees a
//! sample paired with a deviation computed from a different sample.

use std::sync::Arc;

use tokio::sync::watch;

use crate::ingest::Sample;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatestState {
    pub last_sample: Option<Sample>,
    pub deviation: f64,
    /// Set once the ingest loop has published at least one sample
    pub initialized: bool,
}

/// Create the publisher/reader pair for one session.
pub fn latest_state_channel() -> (StatePublisher, StateReader) {
    let (tx, rx) = watch::channel(Arc::new(LatestState::default()));
    (StatePublisher { tx }, StateReader { rx })
}

/// Write half, owned by the ingest loop
pub struct StatePublisher {
    tx: watch::Sender<Arc<LatestState>>,
}

impl StatePublisher {
    /// Publish `sample` together with the deviation computed for it.
    pub fn publish(&self, sample: Sample, deviation: f64) {
        let state = LatestState {
            last_sample: Some(sample),
            deviation,
            initialized: true,
        };
        // send_replace succeeds even when the composer has already gone
        self.tx.send_replace(Arc::new(state));
    }
}

/// Read half, owned by the composer
#[derive(Clone)]
pub struct StateReader {
    rx: watch::Receiver<Arc<LatestState>>,
}

impl StateReader {
    /// Most recently published snapshot
    pub fn snapshot(&self) -> Arc<LatestState> {
        self.rx.borrow().clone()
    }

    /// Wait until the first sample has been published.
    ///
    /// Returns `None` if the publisher went away without ever publishing.
    pub async fn wait_initialized(&mut self) -> Option<Arc<LatestState>> {
        self.rx
            .wait_for(|state| state.initialized)
            .await
            .ok()
            .map(|state| state.clone())
    }
}
