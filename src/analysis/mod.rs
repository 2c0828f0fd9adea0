// Analysis module - impulse detection pipeline
//
// Pipeline: raw samples → EnvelopeBuilder (square + average) → Envelope
//           → LocalMaximumInfo per wide-envelope index → series summary
//
// The envelope is frozen before classification starts, so any number of
// classification passes may read it concurrently. Each pass owns its own
// percentile scratch buffer.

use std::ops::Range;

use serde::Serialize;

use crate::config::DetectionConfig;
use crate::error::AnalysisError;

pub mod envelope;
pub mod local_maximum;
pub mod series;
pub mod stats;

use envelope::{Envelope, EnvelopeBuilder, EnvelopeView};
use local_maximum::LocalMaximumInfo;
use series::SeriesSummary;

/// Result of scanning one sample buffer
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    /// Number of raw samples analysed
    pub sample_count: usize,
    /// Seconds per sample
    pub sample_duration: f64,
    /// Largest absolute raw sample
    pub max_absolute_signal: f64,
    /// Typical averaged signal, as an amplitude
    pub typical_averaged_signal: f64,
    /// Every local maximum, good or not, in timeline order
    pub local_maxima: Vec<LocalMaximumInfo>,
    /// Local maxima that passed every gate
    pub good_maxima: Vec<LocalMaximumInfo>,
    /// Runs of closely spaced good maxima
    pub series: SeriesSummary,
}

impl DetectionReport {
    /// Time stamps of the good maxima in seconds
    pub fn good_time_stamps(&self) -> Vec<f64> {
        self.good_maxima
            .iter()
            .map(LocalMaximumInfo::sample_time_stamp)
            .collect()
    }
}

/// Classify the wide-envelope indices in `range` and keep the local maxima
///
/// Indices past the end of the wide envelope are ignored, so a caller may
/// split `0..wide_count()` into chunks without care for the tail.
///
/// # Arguments
/// * `envelope` - Frozen envelope to read
/// * `range` - Wide-envelope indices to classify
pub fn classify_range(
    envelope: &Envelope,
    range: Range<usize>,
) -> Result<Vec<LocalMaximumInfo>, AnalysisError> {
    let params = envelope.parameters();
    let aperture = params.local_max_aperture_length();
    let wide_aperture = params.local_max_wide_aperture_length();
    let end = range.end.min(envelope.wide_count());

    let mut scratch = Vec::with_capacity(wide_aperture + 1);
    let mut info = LocalMaximumInfo::new();
    let mut maxima = Vec::new();
    for wide_index in range.start..end {
        info.analyse_sample(
            envelope,
            wide_index,
            envelope.narrow_index_for(wide_index),
            aperture,
            wide_aperture,
            &mut scratch,
        )?;
        if info.is_local_maximum() {
            tracing::trace!(%info, "[Analysis] Local maximum");
            maxima.push(info);
        }
    }
    Ok(maxima)
}

/// Scan every position of the envelope and summarize the good maxima
pub fn detect(envelope: &Envelope) -> Result<DetectionReport, AnalysisError> {
    let params = envelope.parameters();
    let local_maxima = classify_range(envelope, 0..envelope.wide_count())?;
    let good_maxima: Vec<LocalMaximumInfo> = local_maxima
        .iter()
        .filter(|info| info.is_good_local_maximum())
        .copied()
        .collect();

    let time_stamps: Vec<f64> = good_maxima
        .iter()
        .map(LocalMaximumInfo::sample_time_stamp)
        .collect();
    let series = series::summarize_series(
        &time_stamps,
        params.max_duration_between_sequential_good_maximums(),
    );

    for info in &good_maxima {
        tracing::debug!(
            sample_index = ?info.sample_index(),
            time = info.sample_time_stamp(),
            amplitude = info.max_averaged_amplitude(),
            duration = info.impulse_duration(),
            "[Analysis] Good maximum"
        );
    }
    tracing::info!(
        samples = envelope.count(),
        local_maxima = local_maxima.len(),
        good_maxima = good_maxima.len(),
        max_sequential = series.max_sequential,
        total_sequential = series.total_sequential,
        "[Analysis] Detection finished"
    );

    Ok(DetectionReport {
        sample_count: envelope.count(),
        sample_duration: params.sample_duration(),
        max_absolute_signal: envelope.max_absolute_signal(),
        typical_averaged_signal: envelope.typical_averaged_signal(),
        local_maxima,
        good_maxima,
        series,
    })
}

/// Build the envelope for `samples` with `config` and run [`detect`]
///
/// # Arguments
/// * `samples` - Raw amplitude samples
/// * `sample_duration` - Seconds per sample
/// * `config` - Detection thresholds
pub fn analyse_samples(
    samples: impl Into<Vec<f64>>,
    sample_duration: f64,
    config: &DetectionConfig,
) -> Result<DetectionReport, AnalysisError> {
    let envelope = EnvelopeBuilder::from_config(sample_duration, config)?.build(samples)?;
    detect(&envelope)
}
