// Error types for the heartbeat drum sequencer
//
// This module defines custom error types for the ingest and composer loops,
// each carrying a stable numeric code so failures can be reported uniformly
// in logs and telemetry.

mod composer;
mod ingest;

pub use composer::{log_composer_error, ComposerError, ComposerErrorCodes};
pub use ingest::{log_ingest_error, IngestError, IngestErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
