// Heartbeat Drums - heart-rate driven percussion sequencer
// Streams heart-rate samples, classifies deviations from a sliding baseline
// and schedules tempo-synchronized drum patterns.

// Module declarations
pub mod analysis;
pub mod composer;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod player;
pub mod simulator;
pub mod telemetry;
pub mod testing;

// Re-exports for convenience
pub use config::AppConfig;
pub use engine::{run_session, shutdown_channel, SessionReport, Shutdown, ShutdownTrigger};
pub use player::{NoteRequest, NoteSink};
