//! Engine module: session wiring and the primitives shared by its tasks.
//!
//! `state` carries samples from ingest to the composer, `shutdown` stops both,
//! and `core` spawns and joins them.

pub mod core;
pub mod shutdown;
pub mod state;

pub use core::{run_session, SessionReport};
pub use shutdown::{shutdown_channel, Shutdown, ShutdownTrigger};
pub use state::{latest_state_channel, LatestState, StatePublisher, StateReader};
