// Sample source - WAV decoding into raw amplitude samples
//
// Integer PCM is widened without rescaling: amplitude thresholds such as
// global_loud_amplitude are expressed in raw sample units (1000-2000 is
// typical for 16-bit recordings). Only the first channel is analysed.

use std::path::Path;

use crate::analysis::stats;
use crate::error::InputError;

/// Decoded mono samples with their timing
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    /// First-channel samples in raw units
    pub samples: Vec<f64>,
    /// Seconds per sample
    pub sample_duration: f64,
    pub sample_rate: u32,
    /// Channel count of the source file
    pub channels: u16,
}

fn read_failed(path: &Path, err: hound::Error) -> InputError {
    InputError::ReadFailed {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Read the first channel of a WAV file
///
/// # Arguments
/// * `path` - WAV file to decode
///
/// # Returns
/// Samples plus `sample_duration = 1 / sample_rate`
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<SampleBuffer, InputError> {
    let path = path.as_ref();
    let mut reader = hound::WavReader::open(path).map_err(|err| InputError::OpenFailed {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(InputError::UnsupportedFormat {
            path: path.display().to_string(),
            details: format!("{} channels at {} Hz", spec.channels, spec.sample_rate),
        });
    }

    let channels = usize::from(spec.channels);
    let samples = match spec.sample_format {
        hound::SampleFormat::Int => {
            if spec.bits_per_sample > 32 {
                return Err(InputError::UnsupportedFormat {
                    path: path.display().to_string(),
                    details: format!("bits_per_sample={}", spec.bits_per_sample),
                });
            }
            let interleaved = reader
                .samples::<i32>()
                .step_by(channels)
                .collect::<Result<Vec<i32>, _>>()
                .map_err(|err| read_failed(path, err))?;
            stats::int_to_double(&interleaved)
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .step_by(channels)
            .map(|sample| sample.map(f64::from))
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|err| read_failed(path, err))?,
    };

    if samples.is_empty() {
        return Err(InputError::NoSamples {
            path: path.display().to_string(),
        });
    }

    tracing::info!(
        path = %path.display(),
        samples = samples.len(),
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        bits = spec.bits_per_sample,
        "[Input] Loaded WAV"
    );

    Ok(SampleBuffer {
        samples,
        sample_duration: 1.0 / f64::from(spec.sample_rate),
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}
