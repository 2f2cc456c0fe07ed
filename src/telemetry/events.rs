//! Telemetry event types describing what the ingest and composer loops did.

use serde::{Deserialize, Serialize};

use crate::analysis::DeviationBand;

/// Why the ingest loop stopped reading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IngestStopReason {
    EndOfStream,
    Shutdown,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MetricEvent {
    SampleIngested {
        timestamp: i64,
        rate: f64,
        deviation: f64,
    },
    BeatScheduled {
        beat: u64,
        tempo_bpm: f64,
        band: DeviationBand,
        notes: usize,
    },
    BeatSkipped {
        rate: f64,
        retry_ms: u64,
    },
    IngestStopped {
        reason: IngestStopReason,
        samples: u64,
        timestamp_ms: u64,
    },
    ComposerStopped {
        beats: u64,
        timestamp_ms: u64,
    },
}
