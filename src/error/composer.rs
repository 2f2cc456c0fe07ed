// Composer error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Composer error code constants
///
/// Error code range: 4001-4003
pub struct ComposerErrorCodes {}

impl ComposerErrorCodes {
    /// Latest sample rate cannot be used as a beat period
    pub const NON_POSITIVE_TEMPO: i32 = 4001;

    /// Composer was asked to plan a beat before any sample was published
    pub const NO_SAMPLE: i32 = 4002;

    /// Latest sample rate is positive but outside the playable tempo range
    pub const TEMPO_OUT_OF_RANGE: i32 = 4003;
}

/// Log a composer error with structured context
pub fn log_composer_error(err: &ComposerError, context: &str) {
    error!(
        "Composer error in {}: code={}, component=Composer, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while planning a beat
///
/// None of these are fatal: the composer skips the beat and retries.
#[derive(Debug, Clone, PartialEq)]
pub enum ComposerError {
    /// Sample rate is zero, negative or not finite
    NonPositiveTempo { rate: f64 },

    /// Latest state has no sample yet
    NoSample,

    /// Sample rate is positive but too slow or too fast to play
    TempoOutOfRange { rate: f64 },
}

impl ErrorCode for ComposerError {
    fn code(&self) -> i32 {
        match self {
            ComposerError::NonPositiveTempo { .. } => ComposerErrorCodes::NON_POSITIVE_TEMPO,
            ComposerError::NoSample => ComposerErrorCodes::NO_SAMPLE,
            ComposerError::TempoOutOfRange { .. } => ComposerErrorCodes::TEMPO_OUT_OF_RANGE,
        }
    }

    fn message(&self) -> String {
        match self {
            ComposerError::NonPositiveTempo { rate } => {
                format!("Tempo must be greater than 0 (got {})", rate)
            }
            ComposerError::NoSample => "No heart-rate sample published yet".to_string(),
            ComposerError::TempoOutOfRange { rate } => {
                format!("Tempo {} is outside the playable range", rate)
            }
        }
    }
}

impl fmt::Display for ComposerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ComposerError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ComposerError {}
