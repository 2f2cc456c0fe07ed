//! MidiPlayer - frame-clocked MIDI event queue
//!
//! Requests are converted to frame delays at the configured sample rate and
//! queued in a [`DeltaList`]. A clock task advances the queue one block at a
//! time and writes the events that fall due to a [`MidiOutput`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::PlayerConfig;
use crate::engine::shutdown::Shutdown;

use super::delta_list::DeltaList;
use super::midi::{MidiMessage, MidiOutput};
use super::{NoteRequest, NoteSink};

pub struct MidiPlayer {
    sample_rate: u32,
    block_frames: u32,
    events: Mutex<DeltaList<MidiMessage>>,
    /// Frames advanced since the player started
    frames_elapsed: AtomicU64,
}

impl MidiPlayer {
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            sample_rate: config.sample_rate.max(1),
            block_frames: config.block_frames.max(1),
            events: Mutex::new(DeltaList::new()),
            frames_elapsed: AtomicU64::new(0),
        }
    }

    /// Enqueue `message` to be played after `delay`.
    pub fn play(&self, message: MidiMessage, delay: Duration) {
        let frames = self.delay_frames(delay);
        self.lock_events().add_event(frames, message);
    }

    pub fn pending(&self) -> usize {
        self.lock_events().len()
    }

    pub fn frames_elapsed(&self) -> u64 {
        self.frames_elapsed.load(Ordering::Relaxed)
    }

    /// Wall-clock length of one clock block
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(self.block_frames as f64 / self.sample_rate as f64)
    }

    pub fn delay_frames(&self, delay: Duration) -> u64 {
        (delay.as_secs_f64() * self.sample_rate as f64).round() as u64
    }

    /// Advance the clock by one block and write the events that fell due.
    ///
    /// Returns how many events were written.
    pub fn tick(&self, output: &mut dyn MidiOutput) -> std::io::Result<usize> {
        let frames = self.block_frames as u64;
        let due = self.lock_events().clock_tick(frames);
        let block_start = self.frames_elapsed.fetch_add(frames, Ordering::Relaxed);

        for (offset, message) in &due {
            output.write(block_start + offset, *message)?;
        }
        Ok(due.len())
    }

    /// Write every queued event immediately, in order.
    pub fn flush_all(&self, output: &mut dyn MidiOutput) -> std::io::Result<usize> {
        let remaining = self.lock_events().drain_all();
        let block_start = self.frames_elapsed();

        for (offset, message) in &remaining {
            output.write(block_start + offset, *message)?;
        }
        output.flush()?;
        Ok(remaining.len())
    }

    /// Run the block clock until `shutdown`, then flush what is still queued.
    pub fn spawn_clock(
        self: &Arc<Self>,
        mut output: Box<dyn MidiOutput>,
        mut shutdown: Shutdown,
    ) -> JoinHandle<()> {
        let player = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(player.block_duration());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
            tracing::info!(
                "[Player] Clock started: {} frames per block at {} Hz",
                player.block_frames,
                player.sample_rate
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match player.tick(output.as_mut()) {
                            Ok(0) => {}
                            Ok(_) => {
                                if let Err(err) = output.flush() {
                                    tracing::warn!("[Player] Output flush failed: {}", err);
                                }
                            }
                            Err(err) => tracing::warn!("[Player] Output write failed: {}", err),
                        }
                    }
                    _ = shutdown.wait() => break,
                }
            }

            match player.flush_all(output.as_mut()) {
                Ok(flushed) => tracing::info!("[Player] Clock stopped, flushed {} events", flushed),
                Err(err) => tracing::warn!("[Player] Final flush failed: {}", err),
            }
        })
    }

    fn lock_events(&self) -> std::sync::MutexGuard<'_, DeltaList<MidiMessage>> {
        self.events.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl NoteSink for MidiPlayer {
    fn schedule(&self, request: NoteRequest) {
        self.play(request.note_on(), request.on_delay);
        self.play(request.note_off(), request.off_delay);
    }
}
