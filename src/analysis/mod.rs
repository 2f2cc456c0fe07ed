// Analysis module - baseline statistics and deviation classification
//
// The ingest loop owns a DeviationClassifier, which owns the SlidingBaseline.
// Each live sample is classified against the window and then inserted.

pub mod baseline;
pub mod deviation;

pub use baseline::{BaselineStats, SlidingBaseline, BASELINE_CAPACITY};
pub use deviation::{deviation_from_stats, DeviationBand, DeviationClassifier, MIN_HISTORY};
