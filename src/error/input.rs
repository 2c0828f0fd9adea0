// Sample input error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Input error code constants
///
/// Error code range: 4001-4004
pub struct InputErrorCodes {}

impl InputErrorCodes {
    /// WAV file could not be opened or its header parsed
    pub const OPEN_FAILED: i32 = 4001;

    /// Sample data could not be decoded
    pub const READ_FAILED: i32 = 4002;

    /// Sample format not supported by the analyser
    pub const UNSUPPORTED_FORMAT: i32 = 4003;

    /// File contains no sample frames
    pub const NO_SAMPLES: i32 = 4004;
}

/// Log an input error with structured context
pub fn log_input_error(err: &InputError, context: &str) {
    error!(
        "Input error in {}: code={}, component=SampleSource, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while loading raw samples
///
/// Error code ranges: 4001-4004
#[derive(Debug, Clone, PartialEq)]
pub enum InputError {
    /// Failed to open the file or parse its header
    OpenFailed { path: String, reason: String },

    /// Failed while decoding sample data
    ReadFailed { path: String, reason: String },

    /// Unsupported channel layout or sample format
    UnsupportedFormat { path: String, details: String },

    /// The file holds no frames
    NoSamples { path: String },
}

impl ErrorCode for InputError {
    fn code(&self) -> i32 {
        match self {
            InputError::OpenFailed { .. } => InputErrorCodes::OPEN_FAILED,
            InputError::ReadFailed { .. } => InputErrorCodes::READ_FAILED,
            InputError::UnsupportedFormat { .. } => InputErrorCodes::UNSUPPORTED_FORMAT,
            InputError::NoSamples { .. } => InputErrorCodes::NO_SAMPLES,
        }
    }

    fn message(&self) -> String {
        match self {
            InputError::OpenFailed { path, reason } => {
                format!("Failed to open {}: {}", path, reason)
            }
            InputError::ReadFailed { path, reason } => {
                format!("Error reading {}: {}", path, reason)
            }
            InputError::UnsupportedFormat { path, details } => {
                format!("Unsupported audio format in {}: {}", path, details)
            }
            InputError::NoSamples { path } => format!("{} contains no samples", path),
        }
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InputError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for InputError {}
