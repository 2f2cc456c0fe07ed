// Ingest error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Ingest error code constants
///
/// Error code range: 3001-3003
pub struct IngestErrorCodes {}

impl IngestErrorCodes {
    /// A stream line is not valid JSON or has the wrong shape
    pub const MALFORMED_INPUT: i32 = 3001;

    /// Reading from the input stream failed
    pub const IO: i32 = 3002;

    /// Connecting to the input stream failed
    pub const CONNECT_FAILED: i32 = 3003;
}

/// Log an ingest error with structured context
///
/// This function logs ingest errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_ingest_error(err: &IngestError, context: &str) {
    error!(
        "Ingest error in {}: code={}, component=SampleSource, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while reading and decoding the sample stream
///
/// Every variant is fatal to the ingest loop. The composer keeps running on
/// the last published state regardless.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestError {
    /// Line is not valid JSON, or a sample tuple has the wrong arity
    MalformedInput { line: String, reason: String },

    /// Underlying reader failed
    Io { details: String },

    /// Could not open the input connection
    ConnectFailed { address: String, reason: String },
}

impl ErrorCode for IngestError {
    fn code(&self) -> i32 {
        match self {
            IngestError::MalformedInput { .. } => IngestErrorCodes::MALFORMED_INPUT,
            IngestError::Io { .. } => IngestErrorCodes::IO,
            IngestError::ConnectFailed { .. } => IngestErrorCodes::CONNECT_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            IngestError::MalformedInput { line, reason } => {
                format!("Malformed input line {:?}: {}", line, reason)
            }
            IngestError::Io { details } => format!("Input stream error: {}", details),
            IngestError::ConnectFailed { address, reason } => {
                format!("Failed to connect to {}: {}", address, reason)
            }
        }
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IngestError::{} (code {}): {}",
            self.variant_name(),
            self.code(),
            self.message()
        )
    }
}

impl IngestError {
    fn variant_name(&self) -> &'static str {
        match self {
            IngestError::MalformedInput { .. } => "MalformedInput",
            IngestError::Io { .. } => "Io",
            IngestError::ConnectFailed { .. } => "ConnectFailed",
        }
    }

    /// Build a `MalformedInput` error for `line` from a JSON decode failure
    pub fn malformed(line: &str, err: &serde_json::Error) -> Self {
        IngestError::MalformedInput {
            line: line.to_string(),
            reason: err.to_string(),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::Io {
            details: err.to_string(),
        }
    }
}
