//! Simulator - synthetic heart-rate stream
//!
//! Produces the same line protocol a sensor bridge would: one `{"last": ...}`
//! history line followed by one sample line per interval. Rates follow a
//! seeded random walk pulled back towards a resting rate, with occasional
//! one-off spikes so every deviation band gets exercised.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader, DuplexStream};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::SimulatorConfig;
use crate::engine::shutdown::Shutdown;
use crate::ingest::{HistoryLine, Sample};

const MIN_RATE: f64 = 35.0;
const MAX_RATE: f64 = 200.0;
/// Fraction of the distance to the resting rate recovered per sample
const PULL: f64 = 0.1;
const NANOS_PER_MS: i64 = 1_000_000;

pub struct Simulator {
    config: SimulatorConfig,
    rng: StdRng,
    rate: f64,
    timestamp: i64,
}

impl Simulator {
    /// # Arguments
    /// * `config` - Walk parameters and seed
    /// * `start_timestamp` - Timestamp of the first history sample, in ns
    pub fn new(config: &SimulatorConfig, start_timestamp: i64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            rate: config.base_rate,
            timestamp: start_timestamp,
            config: config.clone(),
        }
    }

    pub fn next_sample(&mut self) -> Sample {
        let step = if self.config.max_step > 0.0 {
            self.rng.gen_range(-self.config.max_step..=self.config.max_step)
        } else {
            0.0
        };
        self.rate += step + (self.config.base_rate - self.rate) * PULL;
        self.rate = self.rate.clamp(MIN_RATE, MAX_RATE);

        let mut rate = self.rate;
        if self.rng.gen_bool(self.config.spike_probability.clamp(0.0, 1.0)) {
            let spike = self.rng.gen_range(10.0..25.0);
            rate = if self.rng.gen_bool(0.5) { rate + spike } else { rate - spike };
            rate = rate.clamp(MIN_RATE, MAX_RATE);
        }

        let sample = Sample::new(self.timestamp, rate).with_intervals(vec![60.0 / rate]);
        self.timestamp += self.config.interval_ms as i64 * NANOS_PER_MS;
        sample
    }

    /// Opening line of the stream, oldest sample first
    pub fn history_line(&mut self) -> serde_json::Result<String> {
        let last = (0..self.config.history_len)
            .map(|_| self.next_sample())
            .collect();
        serde_json::to_string(&HistoryLine { last })
    }

    pub fn next_line(&mut self) -> serde_json::Result<String> {
        serde_json::to_string(&self.next_sample())
    }

    /// Write the stream to `writer` until shutdown or until the reader goes away.
    ///
    /// Returns the number of live sample lines written.
    pub fn spawn<W>(mut self, mut writer: W, mut shutdown: Shutdown) -> JoinHandle<anyhow::Result<u64>>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            let history = self.history_line()?;
            writer.write_all(history.as_bytes()).await?;
            writer.write_all(b"\n").await?;

            let period = std::time::Duration::from_millis(self.config.interval_ms.max(1));
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut written = 0u64;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.wait() => break,
                }
                let line = self.next_line()?;
                if let Err(err) = writer.write_all(format!("{}\n", line).as_bytes()).await {
                    tracing::info!("[Simulator] Reader closed: {}", err);
                    break;
                }
                written += 1;
            }

            tracing::info!("[Simulator] Wrote {} samples", written);
            Ok::<u64, anyhow::Error>(written)
        })
    }

    /// Run the simulator into an in-memory pipe and return the read half.
    pub fn into_reader(
        self,
        shutdown: Shutdown,
    ) -> (BufReader<DuplexStream>, JoinHandle<anyhow::Result<u64>>) {
        let (writer, reader) = tokio::io::duplex(4096);
        let task = self.spawn(writer, shutdown);
        (BufReader::new(reader), task)
    }
}
