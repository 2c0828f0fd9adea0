// Graph rendering error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Graph error code constants
///
/// Error code range: 5001-5002
pub struct GraphErrorCodes {}

impl GraphErrorCodes {
    /// Requested image has a zero dimension
    pub const INVALID_SIZE: i32 = 5001;

    /// Image could not be encoded or written
    pub const SAVE_FAILED: i32 = 5002;
}

/// Log a graph error with structured context
pub fn log_graph_error(err: &GraphError, context: &str) {
    error!(
        "Graph error in {}: code={}, component=GraphRenderer, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while drawing or saving the detection graph
///
/// Error code ranges: 5001-5002
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Width or height is zero
    InvalidSize { width: u32, height: u32 },

    /// Encoding or writing the image failed
    SaveFailed { path: String, reason: String },
}

impl ErrorCode for GraphError {
    fn code(&self) -> i32 {
        match self {
            GraphError::InvalidSize { .. } => GraphErrorCodes::INVALID_SIZE,
            GraphError::SaveFailed { .. } => GraphErrorCodes::SAVE_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            GraphError::InvalidSize { width, height } => {
                format!("Graph size {}x{} has a zero dimension", width, height)
            }
            GraphError::SaveFailed { path, reason } => {
                format!("Failed to save graph {}: {}", path, reason)
            }
        }
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GraphError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for GraphError {}
