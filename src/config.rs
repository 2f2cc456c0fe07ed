//! Configuration management
//!
//! Runtime configuration is loaded from a JSON file so the sequencer can be
//! retargeted (input address, MIDI channel, player timing) without
//! recompiling. The statistical constants of the classifier are deliberately
//! absent: window capacity, minimum history and band thresholds are fixed.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default location of the config file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "assets/heartbeat_config.json";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub composer: ComposerConfig,
    pub player: PlayerConfig,
    pub telemetry: TelemetryConfig,
    pub simulator: SimulatorConfig,
}

/// Sample stream parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// TCP address used by `connect` when none is given on the command line
    pub address: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8765".to_string(),
        }
    }
}

/// Beat scheduling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// MIDI channel for percussion (0-based; 9 is the General MIDI drum channel)
    pub drum_channel: u8,
    /// Delay before retrying when the latest rate is not a usable tempo
    pub retry_delay_ms: u64,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            drum_channel: 9,
            retry_delay_ms: 500,
        }
    }
}

/// MIDI player clock parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Frame rate used to convert delays into frame offsets
    pub sample_rate: u32,
    /// Frames advanced per clock tick
    pub block_frames: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_frames: 256,
        }
    }
}

/// Telemetry collector sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub buffer: usize,
    pub history_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            buffer: 256,
            history_capacity: 64,
        }
    }
}

/// Synthetic heart-rate generator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub seed: u64,
    /// Resting rate the random walk is pulled towards
    pub base_rate: f64,
    /// Largest step of the random walk between samples
    pub max_step: f64,
    /// Probability that a sample is a sudden spike
    pub spike_probability: f64,
    /// Number of samples in the opening history line
    pub history_len: usize,
    pub interval_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            base_rate: 70.0,
            max_step: 1.5,
            spike_probability: 0.05,
            history_len: 10,
            interval_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or the defaults if the file is missing or
    /// its JSON is invalid.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    pub fn load() -> Self {
        Self::load_from_file(DEFAULT_CONFIG_PATH)
    }
}
