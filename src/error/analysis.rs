// Analysis error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Analysis error code constants
///
/// Single source of truth for the numeric codes reported by [`AnalysisError`].
///
/// Error code range: 3001-3009
pub struct AnalysisErrorCodes {}

impl AnalysisErrorCodes {
    /// Single sample duration is zero, negative or not finite
    pub const INVALID_SAMPLE_DURATION: i32 = 3001;

    /// Threshold or duration is zero, negative or not finite
    pub const NON_POSITIVE_PARAMETER: i32 = 3002;

    /// Percentile level outside [0, 1]
    pub const PERCENTILE_OUT_OF_RANGE: i32 = 3003;

    /// Ratio below its allowed minimum
    pub const RATIO_TOO_SMALL: i32 = 3004;

    /// Aperture converts to less than one sample
    pub const APERTURE_TOO_SHORT: i32 = 3005;

    /// Impulse averaging aperture wider than the usual averaging aperture
    pub const APERTURE_ORDER: i32 = 3006;

    /// No samples supplied to the envelope builder
    pub const EMPTY_SAMPLES: i32 = 3007;

    /// Candidate index outside the averaged envelope
    pub const INDEX_OUT_OF_RANGE: i32 = 3008;

    /// Zero aperture passed to the classifier
    pub const ZERO_APERTURE: i32 = 3009;
}

/// Log an analysis error with structured context
///
/// Emits a single `error!` line with the error code, the component and
/// the human-readable message.
pub fn log_analysis_error(err: &AnalysisError, context: &str) {
    error!(
        "Analysis error in {}: code={}, component=ImpulseAnalysis, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Invalid-argument errors raised by the envelope engine and classifier
///
/// These are programmer errors: fatal to the call, never retried. Expected
/// outcomes of classification (quiet candidate, failed ratio gates, missing
/// or long impulse, short silence) are reported through result flags and
/// never through this type.
///
/// Error code ranges: 3001-3009
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Single sample duration must be > 0
    InvalidSampleDuration { value: f64 },

    /// Named parameter must be > 0
    NonPositiveParameter { parameter: &'static str, value: f64 },

    /// Named percentile must lie in [0, 1]
    PercentileOutOfRange { parameter: &'static str, value: f64 },

    /// Named ratio must be >= minimum
    RatioTooSmall {
        parameter: &'static str,
        value: f64,
        minimum: f64,
    },

    /// Named aperture is shorter than one sample
    ApertureTooShort { parameter: &'static str, seconds: f64 },

    /// Impulse averaging aperture is wider than the usual averaging aperture
    ApertureOrder {
        impulse_samples: usize,
        usual_samples: usize,
    },

    /// Sample buffer is empty
    EmptySamples,

    /// Candidate index outside the averaged envelope
    IndexOutOfRange { index: usize, len: usize },

    /// Named classifier aperture is zero
    ZeroAperture { parameter: &'static str },
}

impl ErrorCode for AnalysisError {
    fn code(&self) -> i32 {
        match self {
            AnalysisError::InvalidSampleDuration { .. } => {
                AnalysisErrorCodes::INVALID_SAMPLE_DURATION
            }
            AnalysisError::NonPositiveParameter { .. } => {
                AnalysisErrorCodes::NON_POSITIVE_PARAMETER
            }
            AnalysisError::PercentileOutOfRange { .. } => {
                AnalysisErrorCodes::PERCENTILE_OUT_OF_RANGE
            }
            AnalysisError::RatioTooSmall { .. } => AnalysisErrorCodes::RATIO_TOO_SMALL,
            AnalysisError::ApertureTooShort { .. } => AnalysisErrorCodes::APERTURE_TOO_SHORT,
            AnalysisError::ApertureOrder { .. } => AnalysisErrorCodes::APERTURE_ORDER,
            AnalysisError::EmptySamples => AnalysisErrorCodes::EMPTY_SAMPLES,
            AnalysisError::IndexOutOfRange { .. } => AnalysisErrorCodes::INDEX_OUT_OF_RANGE,
            AnalysisError::ZeroAperture { .. } => AnalysisErrorCodes::ZERO_APERTURE,
        }
    }

    fn message(&self) -> String {
        match self {
            AnalysisError::InvalidSampleDuration { value } => {
                format!("Zero or negative sample duration (got {})", value)
            }
            AnalysisError::NonPositiveParameter { parameter, value } => {
                format!("{} must be greater than 0 (got {})", parameter, value)
            }
            AnalysisError::PercentileOutOfRange { parameter, value } => {
                format!("{} must lie in [0, 1] (got {})", parameter, value)
            }
            AnalysisError::RatioTooSmall {
                parameter,
                value,
                minimum,
            } => {
                format!("{} must be >= {} (got {})", parameter, minimum, value)
            }
            AnalysisError::ApertureTooShort { parameter, seconds } => {
                format!(
                    "{} of {} sec is shorter than one sample",
                    parameter, seconds
                )
            }
            AnalysisError::ApertureOrder {
                impulse_samples,
                usual_samples,
            } => {
                format!(
                    "Impulse aperture ({} samples) exceeds averaging aperture ({} samples)",
                    impulse_samples, usual_samples
                )
            }
            AnalysisError::EmptySamples => "Zero number of amplitude samples".to_string(),
            AnalysisError::IndexOutOfRange { index, len } => {
                format!("Averaged sample index {} out of range 0..{}", index, len)
            }
            AnalysisError::ZeroAperture { parameter } => {
                format!("Zero {}", parameter)
            }
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AnalysisError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AnalysisError {}
