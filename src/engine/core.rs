//! Session wiring: the ingest task and the composer task.
//!
//! `run_session` owns nothing long-lived. It creates the latest-state channel,
//! spawns both loops on the current runtime and waits for them. The ingest
//! task ends on its own (end of stream, bad line, shutdown); the composer ends
//! only on shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::AsyncBufRead;

use crate::composer::{Composer, ComposerReport};
use crate::config::AppConfig;
use crate::engine::shutdown::Shutdown;
use crate::engine::state::latest_state_channel;
use crate::error::log_ingest_error;
use crate::ingest::{IngestLoop, IngestOutcome};
use crate::player::NoteSink;
use crate::telemetry::TelemetryCollector;

/// Result of a completed session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub ingest: IngestOutcome,
    pub composer: ComposerReport,
}

/// Run ingest and composer until shutdown.
///
/// # Arguments
/// * `reader` - Line-oriented sample stream
/// * `sink` - Receives every scheduled note
/// * `config` - Composer settings are taken from here
/// * `shutdown` - Cooperative stop signal for both tasks
/// * `telemetry` - Optional collector for session metrics
///
/// # Returns
/// How ingestion ended and how many beats were scheduled. Ingest failures are
/// reported in the outcome, not as an `Err`; `Err` means a task panicked.
pub async fn run_session<R>(
    reader: R,
    sink: Arc<dyn NoteSink>,
    config: &AppConfig,
    shutdown: Shutdown,
    telemetry: Option<Arc<TelemetryCollector>>,
) -> anyhow::Result<SessionReport>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (publisher, state_reader) = latest_state_channel();

    let mut ingest = IngestLoop::new(reader, publisher);
    let mut composer = Composer::new(state_reader, sink, config.composer.clone());
    if let Some(telemetry) = telemetry {
        ingest = ingest.with_telemetry(Arc::clone(&telemetry));
        composer = composer.with_telemetry(telemetry);
    }

    tracing::info!(
        "[Session] Starting (drum channel {}, retry {} ms)",
        config.composer.drum_channel,
        config.composer.retry_delay_ms
    );

    let ingest_task = tokio::spawn(ingest.run(shutdown.clone()));
    let composer_task = tokio::spawn(async move { composer.run(shutdown).await });

    let ingest = ingest_task.await.context("ingest task panicked")?;
    if let IngestOutcome::Failed { error, .. } = &ingest {
        log_ingest_error(error, "run_session");
    }
    let composer = composer_task.await.context("composer task panicked")?;

    Ok(SessionReport { ingest, composer })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::shutdown::shutdown_channel;
    use crate::testing::RecordingSink;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_composer_outlives_end_of_stream() {
        let input: &[u8] = b"{\"last\": []}\n[1, 120, []]\n";
        let sink = Arc::new(RecordingSink::new());
        let (trigger, shutdown) = shutdown_channel();

        let session_sink: Arc<dyn NoteSink> = sink.clone();
        let session = tokio::spawn(async move {
            let config = AppConfig::default();
            run_session(input, session_sink, &config, shutdown, None).await
        });
        tokio::time::sleep(Duration::from_millis(1900)).await;
        trigger.trigger();

        let report = session.await.unwrap().unwrap();
        assert_eq!(report.ingest, IngestOutcome::EndOfStream { samples: 1 });
        // 120 bpm: beats at 0.0, 0.5, 1.0, 1.5
        assert_eq!(report.composer.beats, 4);
        assert_eq!(sink.len(), 4);
    }
}
