// Impulse Detector Core - short loud event detection in amplitude samples
// Envelope averaging, local maximum gates, short-impulse confirmation and
// graph rendering

// Module declarations
pub mod analysis;
pub mod config;
pub mod error;
pub mod graph;
pub mod input;

// Re-exports for convenience
pub use analysis::envelope::{Envelope, EnvelopeBuilder, EnvelopeView, Parameters};
pub use analysis::local_maximum::{LocalMaximumInfo, Rejection};
pub use analysis::series::SeriesSummary;
pub use analysis::{analyse_samples, classify_range, detect, DetectionReport};
pub use config::{AppConfig, DetectionConfig};
pub use error::{AnalysisError, ErrorCode, GraphError, InputError};
pub use graph::{render_graph, save_graph};
pub use input::{read_wav, SampleBuffer};

use tracing::Level;

/// Install the stderr log subscriber
///
/// `log` records from the config loader are bridged into the same output.
/// Calling this more than once is harmless; later calls are ignored.
///
/// # Arguments
/// * `verbose` - Emit debug events in addition to info and above
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
