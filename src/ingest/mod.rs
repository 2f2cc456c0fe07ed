// Ingest module - sample stream decoding and the ingest loop
//
// The ingest loop is the only writer of LatestState. It seeds the baseline
// from the history line, then for each live sample classifies the rate,
// inserts it into the baseline and publishes the pair. It suspends only while
// waiting for the next line.

use std::sync::Arc;

use tokio::io::AsyncBufRead;

use crate::analysis::{DeviationClassifier, SlidingBaseline};
use crate::engine::shutdown::Shutdown;
use crate::engine::state::StatePublisher;
use crate::error::IngestError;
use crate::telemetry::{IngestStopReason, TelemetryCollector};

pub mod sample;
pub mod source;

pub use sample::{parse_history_line, parse_sample_line, HistoryLine, Sample};
pub use source::SampleSource;

/// How the ingest loop ended
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Reader closed cleanly
    EndOfStream { samples: u64 },
    /// Shutdown was requested while waiting for input
    Shutdown { samples: u64 },
    /// A line failed to decode or the reader failed
    Failed { samples: u64, error: IngestError },
}

impl IngestOutcome {
    pub fn samples(&self) -> u64 {
        match self {
            IngestOutcome::EndOfStream { samples }
            | IngestOutcome::Shutdown { samples }
            | IngestOutcome::Failed { samples, .. } => *samples,
        }
    }

    fn stop_reason(&self) -> IngestStopReason {
        match self {
            IngestOutcome::EndOfStream { .. } => IngestStopReason::EndOfStream,
            IngestOutcome::Shutdown { .. } => IngestStopReason::Shutdown,
            IngestOutcome::Failed { .. } => IngestStopReason::Failed,
        }
    }
}

/// Drives a [`SampleSource`] into the shared latest state
pub struct IngestLoop<R> {
    source: SampleSource<R>,
    publisher: StatePublisher,
    telemetry: Option<Arc<TelemetryCollector>>,
}

impl<R> IngestLoop<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R, publisher: StatePublisher) -> Self {
        Self {
            source: SampleSource::new(reader),
            publisher,
            telemetry: None,
        }
    }

    pub fn with_telemetry(mut self, telemetry: Arc<TelemetryCollector>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Run until end of stream, a decode failure or shutdown.
    pub async fn run(mut self, mut shutdown: Shutdown) -> IngestOutcome {
        let outcome = self.run_inner(&mut shutdown).await;

        let lines = self.source.lines_read();
        match &outcome {
            IngestOutcome::EndOfStream { samples } => {
                tracing::info!("[Ingest] End of stream after {} samples ({} lines)", samples, lines);
            }
            IngestOutcome::Shutdown { samples } => {
                tracing::info!("[Ingest] Shutdown after {} samples ({} lines)", samples, lines);
            }
            IngestOutcome::Failed { samples, error } => {
                tracing::warn!(
                    "[Ingest] Stopped at line {} after {} samples: {}",
                    lines,
                    samples,
                    error
                );
            }
        }
        if let Some(telemetry) = &self.telemetry {
            telemetry.record_ingest_stopped(outcome.stop_reason(), outcome.samples());
        }

        outcome
    }

    async fn run_inner(&mut self, shutdown: &mut Shutdown) -> IngestOutcome {
        let history = tokio::select! {
            history = self.source.read_history() => history,
            _ = shutdown.wait() => return IngestOutcome::Shutdown { samples: 0 },
        };
        let history = match history {
            Ok(history) => history,
            Err(error) => return IngestOutcome::Failed { samples: 0, error },
        };

        tracing::info!("[Ingest] Seeding baseline with {} historical samples", history.len());
        let baseline = SlidingBaseline::seeded(history.iter().map(|sample| sample.rate));
        let mut classifier = DeviationClassifier::new(baseline);
        let mut samples = 0u64;

        loop {
            let next = tokio::select! {
                next = self.source.next_sample() => next,
                _ = shutdown.wait() => return IngestOutcome::Shutdown { samples },
            };

            match next {
                Ok(Some(sample)) => {
                    let deviation = classifier.observe(sample.rate);
                    samples += 1;
                    tracing::debug!(
                        "[Ingest] Sample ts={} rate={:.1} deviation={:.3}",
                        sample.timestamp,
                        sample.rate,
                        deviation
                    );
                    if let Some(telemetry) = &self.telemetry {
                        telemetry.record_sample(sample.timestamp, sample.rate, deviation);
                    }
                    self.publisher.publish(sample, deviation);
                }
                Ok(None) => return IngestOutcome::EndOfStream { samples },
                Err(error) => return IngestOutcome::Failed { samples, error },
            }
        }
    }
}
