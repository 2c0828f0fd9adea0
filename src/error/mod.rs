// Error types for the impulse detector
//
// This module defines custom error types for analysis, sample input and
// graph output, providing structured error handling with stable numeric
// error codes.

mod analysis;
mod graph;
mod input;

pub use analysis::{log_analysis_error, AnalysisError, AnalysisErrorCodes};
pub use graph::{log_graph_error, GraphError, GraphErrorCodes};
pub use input::{log_input_error, InputError, InputErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the library and the command line front end.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
