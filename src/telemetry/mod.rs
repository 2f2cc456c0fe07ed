//! Session telemetry collector.
//!
//! The collector fans ingest and composer events out over a broadcast channel
//! and keeps a bounded history for end-of-session reporting.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::analysis::DeviationBand;
use crate::config::TelemetryConfig;

pub mod events;

pub use events::{IngestStopReason, MetricEvent};

/// Snapshot of collector state for CLI reporting.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetrySnapshot {
    pub recent: Vec<MetricEvent>,
    pub total_events: u64,
    pub dropped_events: u64,
}

/// Broadcast-based collector retaining a bounded history of metrics.
pub struct TelemetryCollector {
    tx: broadcast::Sender<MetricEvent>,
    history: Mutex<VecDeque<MetricEvent>>,
    history_capacity: usize,
    total_events: AtomicU64,
    dropped_history: AtomicU64,
}

impl TelemetryCollector {
    pub fn new(buffer: usize, history_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
            total_events: AtomicU64::new(0),
            dropped_history: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(config.buffer, config.history_capacity)
    }

    pub fn publish(&self, event: MetricEvent) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if self.history_capacity > 0 {
            let mut history = self.history.lock().unwrap_or_else(|p| p.into_inner());
            if history.len() == self.history_capacity {
                history.pop_front();
                self.dropped_history.fetch_add(1, Ordering::Relaxed);
            }
            history.push_back(event.clone());
        }

        // No subscribers is fine
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricEvent> {
        self.tx.subscribe()
    }

    /// Live event stream; events missed by a lagging consumer are skipped.
    pub fn stream(&self) -> impl Stream<Item = MetricEvent> {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|event| async move { event.ok() })
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let history = self.history.lock().unwrap_or_else(|p| p.into_inner());
        TelemetrySnapshot {
            recent: history.iter().cloned().collect(),
            total_events: self.total_events.load(Ordering::Relaxed),
            dropped_events: self.dropped_history.load(Ordering::Relaxed),
        }
    }

    pub fn record_sample(&self, timestamp: i64, rate: f64, deviation: f64) {
        self.publish(MetricEvent::SampleIngested {
            timestamp,
            rate,
            deviation,
        });
    }

    pub fn record_beat(&self, beat: u64, tempo_bpm: f64, band: DeviationBand, notes: usize) {
        self.publish(MetricEvent::BeatScheduled {
            beat,
            tempo_bpm,
            band,
            notes,
        });
    }

    pub fn record_skipped_beat(&self, rate: f64, retry_ms: u64) {
        self.publish(MetricEvent::BeatSkipped { rate, retry_ms });
    }

    pub fn record_ingest_stopped(&self, reason: IngestStopReason, samples: u64) {
        self.publish(MetricEvent::IngestStopped {
            reason,
            samples,
            timestamp_ms: now_timestamp_ms(),
        });
    }

    pub fn record_composer_stopped(&self, beats: u64) {
        self.publish(MetricEvent::ComposerStopped {
            beats,
            timestamp_ms: now_timestamp_ms(),
        });
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(256, 64)
    }
}

fn now_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
