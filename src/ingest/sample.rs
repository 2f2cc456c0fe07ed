//! Sample - one heart-rate reading and its line encoding
//!
//! On the wire a sample is a positional JSON array
//! `[timestamp_ns, rate_bpm, [rr_interval, ...]]`; the interval list may be
//! omitted. The first line of a stream instead carries `{"last": [...]}`,
//! a list of historical samples used to seed the baseline.

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Data from a sample reported by the heart-rate monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SampleTuple", into = "SampleTuple")]
pub struct Sample {
    /// UNIX timestamp in nanoseconds
    pub timestamp: i64,
    /// Heart rate in beats per minute
    pub rate: f64,
    /// RR intervals in seconds, in the order reported
    pub intervals: Vec<f64>,
}

impl Sample {
    pub fn new(timestamp: i64, rate: f64) -> Self {
        Self {
            timestamp,
            rate,
            intervals: Vec::new(),
        }
    }

    pub fn with_intervals(mut self, intervals: Vec<f64>) -> Self {
        self.intervals = intervals;
        self
    }
}

#[derive(Serialize, Deserialize)]
struct SampleTuple(i64, f64, #[serde(default)] Vec<f64>);

impl From<SampleTuple> for Sample {
    fn from(SampleTuple(timestamp, rate, intervals): SampleTuple) -> Self {
        Self {
            timestamp,
            rate,
            intervals,
        }
    }
}

impl From<Sample> for SampleTuple {
    fn from(sample: Sample) -> Self {
        SampleTuple(sample.timestamp, sample.rate, sample.intervals)
    }
}

/// Payload of the first line of a stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryLine {
    pub last: Vec<Sample>,
}

/// Decode a live sample line.
pub fn parse_sample_line(line: &str) -> Result<Sample, IngestError> {
    serde_json::from_str(line).map_err(|err| IngestError::malformed(line, &err))
}

/// Decode the history line that opens a stream.
pub fn parse_history_line(line: &str) -> Result<HistoryLine, IngestError> {
    serde_json::from_str(line).map_err(|err| IngestError::malformed(line, &err))
}
