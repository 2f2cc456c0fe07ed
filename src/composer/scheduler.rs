//! Composer - the beat scheduling loop
//!
//! Once the first sample has been published, every beat:
//! 1. snapshots the latest state (tempo and pattern are latched here),
//! 2. dispatches each pattern event to the sink with its intra-beat delays,
//! 3. sleeps one beat period, measured from the previous beat deadline.
//!
//! A rate that cannot be used as a tempo skips the beat and retries after
//! `retry_delay_ms`. Shutdown is checked after each sleep, so a beat in flight
//! always completes its full period before the loop stops.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::analysis::DeviationBand;
use crate::config::ComposerConfig;
use crate::engine::shutdown::Shutdown;
use crate::engine::state::{LatestState, StateReader};
use crate::error::{log_composer_error, ComposerError, ErrorCode};
use crate::player::{NoteRequest, NoteSink};
use crate::telemetry::TelemetryCollector;

use super::pattern::select_pattern;

/// Slowest rate played as a tempo; a beat never lasts longer than 6 s
pub const MIN_TEMPO_BPM: f64 = 10.0;
/// Fastest rate played as a tempo
pub const MAX_TEMPO_BPM: f64 = 600.0;

/// Lifecycle of the composer loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerState {
    WaitingForFirstSample,
    Running,
    Stopped,
}

/// Everything dispatched for one beat, fixed at beat start
#[derive(Debug, Clone, PartialEq)]
pub struct BeatPlan {
    pub tempo_bpm: f64,
    pub period: Duration,
    pub band: DeviationBand,
    pub notes: Vec<NoteRequest>,
}

/// Plan one beat from a state snapshot.
///
/// Note-on for an event lands at `period * onset` and note-off at
/// `period * (onset + duration)`, both relative to beat start. Rates outside
/// [`MIN_TEMPO_BPM`]..=[`MAX_TEMPO_BPM`] are rejected, never clamped.
pub fn plan_beat(state: &LatestState, channel: u8) -> Result<BeatPlan, ComposerError> {
    let sample = state.last_sample.as_ref().ok_or(ComposerError::NoSample)?;
    let tempo_bpm = sample.rate;
    if !tempo_bpm.is_finite() || tempo_bpm <= 0.0 {
        return Err(ComposerError::NonPositiveTempo { rate: tempo_bpm });
    }
    if !(MIN_TEMPO_BPM..=MAX_TEMPO_BPM).contains(&tempo_bpm) {
        return Err(ComposerError::TempoOutOfRange { rate: tempo_bpm });
    }

    let beat_secs = 60.0 / tempo_bpm;
    let period = Duration::try_from_secs_f64(beat_secs)
        .map_err(|_| ComposerError::TempoOutOfRange { rate: tempo_bpm })?;
    let band = DeviationBand::from_deviation(state.deviation);
    let notes = select_pattern(band)
        .iter()
        .map(|event| NoteRequest {
            note: event.instrument.note(),
            velocity: event.velocity,
            channel,
            on_delay: Duration::from_secs_f64(beat_secs * event.onset),
            off_delay: Duration::from_secs_f64(beat_secs * event.release()),
        })
        .collect();

    Ok(BeatPlan {
        tempo_bpm,
        period,
        band,
        notes,
    })
}

/// Counters returned when the composer stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposerReport {
    pub beats: u64,
    pub skipped: u64,
}

pub struct Composer {
    reader: StateReader,
    sink: Arc<dyn NoteSink>,
    config: ComposerConfig,
    telemetry: Option<Arc<TelemetryCollector>>,
    state: ComposerState,
    report: ComposerReport,
    consecutive_skips: u64,
}

impl Composer {
    pub fn new(reader: StateReader, sink: Arc<dyn NoteSink>, config: ComposerConfig) -> Self {
        Self {
            reader,
            sink,
            config,
            telemetry: None,
            state: ComposerState::WaitingForFirstSample,
            report: ComposerReport::default(),
            consecutive_skips: 0,
        }
    }

    pub fn with_telemetry(mut self, telemetry: Arc<TelemetryCollector>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn state(&self) -> ComposerState {
        self.state
    }

    /// Schedule beats until shutdown.
    pub async fn run(&mut self, mut shutdown: Shutdown) -> ComposerReport {
        tracing::info!("[Composer] Waiting for first sample");
        let first = tokio::select! {
            first = self.reader.wait_initialized() => first,
            _ = shutdown.wait() => None,
        };
        if first.is_none() {
            return self.stop();
        }

        self.set_state(ComposerState::Running);
        let mut deadline = Instant::now();

        loop {
            let snapshot = self.reader.snapshot();
            let wait = match plan_beat(&snapshot, self.config.drum_channel) {
                Ok(plan) => {
                    self.dispatch(&plan);
                    plan.period
                }
                Err(err) => self.skip(&err),
            };

            deadline += wait;
            let now = Instant::now();
            if deadline < now {
                tracing::debug!(
                    "[Composer] Fell behind by {:?}, resetting beat clock",
                    now - deadline
                );
                deadline = now;
            }
            tokio::time::sleep_until(deadline).await;

            if shutdown.is_triggered() {
                return self.stop();
            }
        }
    }

    fn dispatch(&mut self, plan: &BeatPlan) {
        self.report.beats += 1;
        self.consecutive_skips = 0;
        tracing::debug!(
            "[Composer] Beat {}: {:.1} bpm, {:?}, {} notes",
            self.report.beats,
            plan.tempo_bpm,
            plan.band,
            plan.notes.len()
        );
        for note in &plan.notes {
            self.sink.schedule(*note);
        }
        if let Some(telemetry) = &self.telemetry {
            telemetry.record_beat(self.report.beats, plan.tempo_bpm, plan.band, plan.notes.len());
        }
    }

    fn skip(&mut self, err: &ComposerError) -> Duration {
        self.report.skipped += 1;
        self.consecutive_skips += 1;
        let retry_ms = self.config.retry_delay_ms;
        // Report the first skip of a run; repeats only at debug level
        if self.consecutive_skips == 1 {
            log_composer_error(err, "plan_beat");
        }
        tracing::debug!(
            "[Composer] Skipping beat (code {}, {} in a row). Retrying in {} ms",
            err.code(),
            self.consecutive_skips,
            retry_ms
        );
        if let Some(telemetry) = &self.telemetry {
            let rate = match err {
                ComposerError::NonPositiveTempo { rate }
                | ComposerError::TempoOutOfRange { rate } => *rate,
                ComposerError::NoSample => 0.0,
            };
            telemetry.record_skipped_beat(rate, retry_ms);
        }
        Duration::from_millis(retry_ms)
    }

    fn stop(&mut self) -> ComposerReport {
        self.set_state(ComposerState::Stopped);
        tracing::info!(
            "[Composer] Stopped after {} beats ({} skipped)",
            self.report.beats,
            self.report.skipped
        );
        if let Some(telemetry) = &self.telemetry {
            telemetry.record_composer_stopped(self.report.beats);
        }
        self.report
    }

    fn set_state(&mut self, state: ComposerState) {
        tracing::debug!("[Composer] {:?} -> {:?}", self.state, state);
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::shutdown::shutdown_channel;
    use crate::engine::state::latest_state_channel;
    use crate::ingest::Sample;
    use crate::testing::RecordingSink;

    fn state(rate: f64, deviation: f64) -> LatestState {
        LatestState {
            last_sample: Some(Sample::new(0, rate)),
            deviation,
            initialized: true,
        }
    }

    #[test]
    fn test_plan_at_60_bpm() {
        let plan = plan_beat(&state(60.0, 6.0), 9).unwrap();
        assert_eq!(plan.band, DeviationBand::StrongHigh);
        assert_eq!(plan.period, Duration::from_secs(1));
        assert_eq!(plan.notes.len(), 2);

        let tom = &plan.notes[0];
        assert_eq!((tom.note, tom.velocity, tom.channel), (45, 127, 9));
        assert_eq!(tom.on_delay, Duration::ZERO);
        assert_eq!(tom.off_delay, Duration::from_millis(250));

        let crash = &plan.notes[1];
        assert_eq!(crash.note, 49);
        assert_eq!(crash.on_delay, Duration::from_millis(500));
        assert_eq!(crash.off_delay, Duration::from_millis(750));
    }

    #[test]
    fn test_delays_stay_within_beat() {
        for rate in [30.0, 55.5, 72.0, 120.0, 200.0] {
            for deviation in [-3.0, 0.0, 1.0, 5.0] {
                let plan = plan_beat(&state(rate, deviation), 9).unwrap();
                for note in &plan.notes {
                    assert!(note.on_delay < note.off_delay);
                    assert!(note.off_delay <= plan.period);
                }
            }
        }
    }

    #[test]
    fn test_unusable_tempo_is_rejected() {
        for rate in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                plan_beat(&state(rate, 0.0), 9),
                Err(ComposerError::NonPositiveTempo { .. })
            ));
        }
        assert_eq!(
            plan_beat(&LatestState::default(), 9),
            Err(ComposerError::NoSample)
        );
    }

    #[test]
    fn test_extreme_positive_rates_are_rejected() {
        for rate in [1e-20, 1e-3, 9.99, 600.5, 1e15, f64::MAX] {
            assert_eq!(
                plan_beat(&state(rate, 0.0), 9),
                Err(ComposerError::TempoOutOfRange { rate })
            );
        }
        for rate in [MIN_TEMPO_BPM, MAX_TEMPO_BPM] {
            let plan = plan_beat(&state(rate, 0.0), 9).unwrap();
            assert!(plan.period > Duration::ZERO);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_rate_is_paced_by_retry_delay() {
        let (publisher, reader) = latest_state_channel();
        let (trigger, shutdown) = shutdown_channel();
        let sink = Arc::new(RecordingSink::new());
        let mut composer = Composer::new(reader, sink.clone(), ComposerConfig::default());

        publisher.publish(Sample::new(1, 1e15), 0.0);
        let task = tokio::spawn(async move { composer.run(shutdown).await });

        tokio::time::sleep(Duration::from_millis(2200)).await;
        trigger.trigger();
        let report = task.await.unwrap();

        // Retries at 0, 0.5, 1.0, 1.5, 2.0 s; nothing reaches the sink
        assert_eq!(report.beats, 0);
        assert_eq!(report.skipped, 5);
        assert!(sink.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tiny_rate_does_not_stop_composer() {
        let (publisher, reader) = latest_state_channel();
        let (trigger, shutdown) = shutdown_channel();
        let sink = Arc::new(RecordingSink::new());
        let mut composer = Composer::new(reader, sink.clone(), ComposerConfig::default());

        publisher.publish(Sample::new(1, 1e-20), 0.0);
        let task = tokio::spawn(async move { composer.run(shutdown).await });

        tokio::time::sleep(Duration::from_millis(700)).await;
        publisher.publish(Sample::new(2, 60.0), 0.0);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        trigger.trigger();

        let report = task.await.unwrap();
        assert_eq!(report.skipped, 2);
        assert_eq!(report.beats, 1);
        assert_eq!(sink.note_numbers(), vec![45]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_sample_stops_immediately() {
        let (_publisher, reader) = latest_state_channel();
        let (trigger, shutdown) = shutdown_channel();
        let sink = Arc::new(RecordingSink::new());
        let mut composer = Composer::new(reader, sink.clone(), ComposerConfig::default());

        let start = Instant::now();
        trigger.trigger();
        let report = composer.run(shutdown).await;

        assert_eq!(report, ComposerReport::default());
        assert_eq!(composer.state(), ComposerState::Stopped);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(sink.notes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_beats_follow_tempo_and_finish_grace_period() {
        let (publisher, reader) = latest_state_channel();
        let (trigger, shutdown) = shutdown_channel();
        let sink = Arc::new(RecordingSink::new());
        let mut composer = Composer::new(reader, sink.clone(), ComposerConfig::default());

        publisher.publish(Sample::new(1, 60.0), 0.0);
        let start = Instant::now();
        let task = tokio::spawn(async move {
            let report = composer.run(shutdown).await;
            (report, composer.state())
        });

        tokio::time::sleep(Duration::from_millis(2500)).await;
        trigger.trigger();
        let (report, state) = task.await.unwrap();

        // Beats at 0s, 1s, 2s; the third completes its period before stopping
        assert_eq!(report.beats, 3);
        assert_eq!(state, ComposerState::Stopped);
        assert_eq!(start.elapsed(), Duration::from_secs(3));

        let offsets: Vec<Duration> = sink
            .notes()
            .iter()
            .map(|note| note.at.duration_since(start))
            .collect();
        assert_eq!(
            offsets,
            vec![Duration::ZERO, Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_rate_skips_and_retries() {
        let (publisher, reader) = latest_state_channel();
        let (trigger, shutdown) = shutdown_channel();
        let sink = Arc::new(RecordingSink::new());
        let config = ComposerConfig {
            drum_channel: 9,
            retry_delay_ms: 500,
        };
        let mut composer = Composer::new(reader, sink.clone(), config);

        publisher.publish(Sample::new(1, 0.0), 0.0);
        let task = tokio::spawn(async move { composer.run(shutdown).await });

        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(sink.notes().is_empty());

        publisher.publish(Sample::new(2, 120.0), 0.0);
        tokio::time::sleep(Duration::from_millis(400)).await;
        trigger.trigger();

        let report = task.await.unwrap();
        assert_eq!(report.skipped, 3);
        assert!(report.beats >= 1);
        assert!(sink.notes().iter().all(|note| note.request.note == 45));
    }
}
