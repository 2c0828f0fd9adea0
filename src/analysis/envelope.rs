// Envelope - averaged squared-amplitude envelopes and signal statistics
//
// Two-phase engine:
// 1. EnvelopeBuilder collects and validates every threshold (seconds, ratios,
//    percentiles) for a fixed single-sample duration.
// 2. build() squares the raw samples, averages them over the usual ("wide")
//    and the impulse ("narrow") apertures, and freezes the result into an
//    Envelope. An Envelope has no setters and is safe to share between
//    threads by reference.
//
// The classifier only sees the EnvelopeView trait: envelopes, parameters and
// the windowed minimum/percentile queries over the wide envelope.

use std::ops::RangeInclusive;

use crate::analysis::stats;
use crate::config::DetectionConfig;
use crate::error::AnalysisError;

/// Validated detection thresholds bound to a single-sample duration
///
/// Durations are stored in seconds. The aperture `*_length` getters convert
/// them to sample counts with `round(duration / sample_duration)`; the impulse
/// cap and the silence flank truncate instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    sample_duration: f64,
    global_loud_amplitude: f64,
    typical_signal_percentile: f64,
    averaging_aperture: f64,
    averaging_impulse_aperture: f64,
    local_max_aperture: f64,
    min_ratio_to_typical_signal: f64,
    local_max_wide_aperture: f64,
    local_max_low_signal_percentile: f64,
    min_ratio_to_low_signal: f64,
    max_impulse_duration: f64,
    min_silence_near_impulse_duration: f64,
    ratio_of_impulse_and_silence: f64,
    max_duration_between_sequential_good_maximums: f64,
}

impl Parameters {
    fn with_defaults(sample_duration: f64) -> Self {
        let defaults = DetectionConfig::default();
        Self {
            sample_duration,
            global_loud_amplitude: defaults.global_loud_amplitude.unwrap_or(0.0),
            typical_signal_percentile: defaults.typical_signal_percentile,
            averaging_aperture: defaults.averaging_aperture,
            averaging_impulse_aperture: defaults.averaging_impulse_aperture,
            local_max_aperture: defaults.local_max_aperture,
            min_ratio_to_typical_signal: defaults.min_ratio_to_typical_signal,
            local_max_wide_aperture: defaults.local_max_wide_aperture,
            local_max_low_signal_percentile: defaults.local_max_low_signal_percentile,
            min_ratio_to_low_signal: defaults.min_ratio_to_low_signal,
            max_impulse_duration: defaults.max_impulse_duration,
            min_silence_near_impulse_duration: defaults.min_silence_near_impulse_duration,
            ratio_of_impulse_and_silence: defaults.ratio_of_impulse_and_silence,
            max_duration_between_sequential_good_maximums: defaults
                .max_duration_between_sequential_good_maximums,
        }
    }

    /// Duration of one sample in seconds
    pub fn sample_duration(&self) -> f64 {
        self.sample_duration
    }

    /// Convert a duration in seconds to the nearest whole number of samples
    pub fn samples_in(&self, seconds: f64) -> usize {
        (seconds / self.sample_duration).round() as usize
    }

    /// Number of whole samples that fit into `seconds`
    pub fn whole_samples_in(&self, seconds: f64) -> usize {
        (seconds / self.sample_duration) as usize
    }

    /// Averaged amplitude floor; 0 when no floor is configured
    pub fn global_loud_amplitude(&self) -> f64 {
        self.global_loud_amplitude
    }

    pub fn typical_signal_percentile(&self) -> f64 {
        self.typical_signal_percentile
    }

    pub fn averaging_aperture(&self) -> f64 {
        self.averaging_aperture
    }

    /// Usual averaging aperture in samples
    pub fn averaging_aperture_length(&self) -> usize {
        self.samples_in(self.averaging_aperture)
    }

    pub fn averaging_impulse_aperture(&self) -> f64 {
        self.averaging_impulse_aperture
    }

    /// Impulse averaging aperture in samples
    pub fn averaging_impulse_aperture_length(&self) -> usize {
        self.samples_in(self.averaging_impulse_aperture)
    }

    pub fn local_max_aperture(&self) -> f64 {
        self.local_max_aperture
    }

    /// Local maximum test aperture in samples, always odd
    ///
    /// The test needs a centre sample with the same number of neighbours
    /// on each side, so an even length is bumped up by one.
    pub fn local_max_aperture_length(&self) -> usize {
        let length = self.samples_in(self.local_max_aperture);
        if length % 2 == 0 {
            length + 1
        } else {
            length
        }
    }

    pub fn min_ratio_to_typical_signal(&self) -> f64 {
        self.min_ratio_to_typical_signal
    }

    pub fn local_max_wide_aperture(&self) -> f64 {
        self.local_max_wide_aperture
    }

    /// Low signal context aperture in samples
    pub fn local_max_wide_aperture_length(&self) -> usize {
        self.samples_in(self.local_max_wide_aperture)
    }

    pub fn local_max_low_signal_percentile(&self) -> f64 {
        self.local_max_low_signal_percentile
    }

    pub fn min_ratio_to_low_signal(&self) -> f64 {
        self.min_ratio_to_low_signal
    }

    pub fn max_impulse_duration(&self) -> f64 {
        self.max_impulse_duration
    }

    pub fn max_impulse_duration_length(&self) -> usize {
        self.whole_samples_in(self.max_impulse_duration)
    }

    pub fn min_silence_near_impulse_duration(&self) -> f64 {
        self.min_silence_near_impulse_duration
    }

    pub fn min_silence_near_impulse_length(&self) -> usize {
        self.whole_samples_in(self.min_silence_near_impulse_duration)
    }

    pub fn ratio_of_impulse_and_silence(&self) -> f64 {
        self.ratio_of_impulse_and_silence
    }

    pub fn max_duration_between_sequential_good_maximums(&self) -> f64 {
        self.max_duration_between_sequential_good_maximums
    }
}

fn require_positive(parameter: &'static str, value: f64) -> Result<f64, AnalysisError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(AnalysisError::NonPositiveParameter { parameter, value })
    }
}

fn require_unit_interval(parameter: &'static str, value: f64) -> Result<f64, AnalysisError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(AnalysisError::PercentileOutOfRange { parameter, value })
    }
}

/// Collects and validates thresholds before the envelopes are built
///
/// Every setter consumes and returns the builder so a configuration reads
/// as one chain of `?` calls:
///
/// ```
/// use impulse_detector::analysis::envelope::EnvelopeBuilder;
///
/// # fn main() -> Result<(), impulse_detector::error::AnalysisError> {
/// let envelope = EnvelopeBuilder::new(1.0 / 8000.0)?
///     .with_global_loud_amplitude(1000.0)?
///     .with_max_impulse_duration(0.25)?
///     .build(vec![0.0; 16000])?;
/// assert_eq!(envelope.count(), 16000);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    params: Parameters,
}

impl EnvelopeBuilder {
    /// Create a builder with default thresholds
    ///
    /// # Arguments
    /// * `sample_duration` - Seconds per sample, must be > 0
    pub fn new(sample_duration: f64) -> Result<Self, AnalysisError> {
        if !(sample_duration > 0.0 && sample_duration.is_finite()) {
            return Err(AnalysisError::InvalidSampleDuration {
                value: sample_duration,
            });
        }
        Ok(Self {
            params: Parameters::with_defaults(sample_duration),
        })
    }

    /// Create a builder and apply every value of `config` through the setters
    pub fn from_config(
        sample_duration: f64,
        config: &DetectionConfig,
    ) -> Result<Self, AnalysisError> {
        let mut builder = Self::new(sample_duration)?
            .with_typical_signal_percentile(config.typical_signal_percentile)?
            .with_averaging_aperture(config.averaging_aperture)?
            .with_averaging_impulse_aperture(config.averaging_impulse_aperture)?
            .with_local_max_aperture(config.local_max_aperture)?
            .with_min_ratio_to_typical_signal(config.min_ratio_to_typical_signal)?
            .with_local_max_wide_aperture(config.local_max_wide_aperture)?
            .with_local_max_low_signal_percentile(config.local_max_low_signal_percentile)?
            .with_min_ratio_to_low_signal(config.min_ratio_to_low_signal)?
            .with_max_impulse_duration(config.max_impulse_duration)?
            .with_min_silence_near_impulse_duration(config.min_silence_near_impulse_duration)?
            .with_ratio_of_impulse_and_silence(config.ratio_of_impulse_and_silence)?
            .with_max_duration_between_sequential_good_maximums(
                config.max_duration_between_sequential_good_maximums,
            )?;
        if let Some(amplitude) = config.global_loud_amplitude {
            builder = builder.with_global_loud_amplitude(amplitude)?;
        }
        Ok(builder)
    }

    /// Thresholds collected so far
    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn with_global_loud_amplitude(mut self, amplitude: f64) -> Result<Self, AnalysisError> {
        self.params.global_loud_amplitude = require_positive("global_loud_amplitude", amplitude)?;
        Ok(self)
    }

    pub fn with_typical_signal_percentile(mut self, level: f64) -> Result<Self, AnalysisError> {
        self.params.typical_signal_percentile =
            require_unit_interval("typical_signal_percentile", level)?;
        Ok(self)
    }

    pub fn with_averaging_aperture(mut self, seconds: f64) -> Result<Self, AnalysisError> {
        self.params.averaging_aperture = require_positive("averaging_aperture", seconds)?;
        Ok(self)
    }

    pub fn with_averaging_impulse_aperture(mut self, seconds: f64) -> Result<Self, AnalysisError> {
        self.params.averaging_impulse_aperture =
            require_positive("averaging_impulse_aperture", seconds)?;
        Ok(self)
    }

    pub fn with_local_max_aperture(mut self, seconds: f64) -> Result<Self, AnalysisError> {
        self.params.local_max_aperture = require_positive("local_max_aperture", seconds)?;
        Ok(self)
    }

    pub fn with_min_ratio_to_typical_signal(mut self, ratio: f64) -> Result<Self, AnalysisError> {
        self.params.min_ratio_to_typical_signal =
            require_positive("min_ratio_to_typical_signal", ratio)?;
        Ok(self)
    }

    pub fn with_local_max_wide_aperture(mut self, seconds: f64) -> Result<Self, AnalysisError> {
        self.params.local_max_wide_aperture =
            require_positive("local_max_wide_aperture", seconds)?;
        Ok(self)
    }

    pub fn with_local_max_low_signal_percentile(
        mut self,
        level: f64,
    ) -> Result<Self, AnalysisError> {
        self.params.local_max_low_signal_percentile =
            require_unit_interval("local_max_low_signal_percentile", level)?;
        Ok(self)
    }

    pub fn with_min_ratio_to_low_signal(mut self, ratio: f64) -> Result<Self, AnalysisError> {
        self.params.min_ratio_to_low_signal = require_positive("min_ratio_to_low_signal", ratio)?;
        Ok(self)
    }

    pub fn with_max_impulse_duration(mut self, seconds: f64) -> Result<Self, AnalysisError> {
        self.params.max_impulse_duration = require_positive("max_impulse_duration", seconds)?;
        Ok(self)
    }

    pub fn with_min_silence_near_impulse_duration(
        mut self,
        seconds: f64,
    ) -> Result<Self, AnalysisError> {
        self.params.min_silence_near_impulse_duration =
            require_positive("min_silence_near_impulse_duration", seconds)?;
        Ok(self)
    }

    /// Silence threshold is the impulse level divided by this ratio, so it must be >= 1
    pub fn with_ratio_of_impulse_and_silence(mut self, ratio: f64) -> Result<Self, AnalysisError> {
        let ratio = require_positive("ratio_of_impulse_and_silence", ratio)?;
        if ratio < 1.0 {
            return Err(AnalysisError::RatioTooSmall {
                parameter: "ratio_of_impulse_and_silence",
                value: ratio,
                minimum: 1.0,
            });
        }
        self.params.ratio_of_impulse_and_silence = ratio;
        Ok(self)
    }

    pub fn with_max_duration_between_sequential_good_maximums(
        mut self,
        seconds: f64,
    ) -> Result<Self, AnalysisError> {
        self.params.max_duration_between_sequential_good_maximums =
            require_positive("max_duration_between_sequential_good_maximums", seconds)?;
        Ok(self)
    }

    /// Check the aperture invariants that depend on the sample duration
    fn validate_apertures(&self) -> Result<(), AnalysisError> {
        let p = &self.params;
        let apertures = [
            ("averaging_aperture", p.averaging_aperture, p.averaging_aperture_length()),
            (
                "averaging_impulse_aperture",
                p.averaging_impulse_aperture,
                p.averaging_impulse_aperture_length(),
            ),
            ("local_max_aperture", p.local_max_aperture, p.local_max_aperture_length()),
            (
                "local_max_wide_aperture",
                p.local_max_wide_aperture,
                p.local_max_wide_aperture_length(),
            ),
        ];
        for (parameter, seconds, length) in apertures {
            if length < 1 {
                return Err(AnalysisError::ApertureTooShort { parameter, seconds });
            }
        }

        // Narrow and wide envelopes are aligned by their centres; that only
        // works while the narrow envelope is at least as long as the wide one.
        if p.averaging_impulse_aperture_length() > p.averaging_aperture_length() {
            return Err(AnalysisError::ApertureOrder {
                impulse_samples: p.averaging_impulse_aperture_length(),
                usual_samples: p.averaging_aperture_length(),
            });
        }
        Ok(())
    }

    /// Square, average and freeze the samples
    ///
    /// # Errors
    /// * `EmptySamples` - no samples supplied
    /// * `ApertureTooShort` - an aperture rounds to zero samples
    /// * `ApertureOrder` - impulse aperture wider than the usual aperture
    pub fn build(self, samples: impl Into<Vec<f64>>) -> Result<Envelope, AnalysisError> {
        let samples = samples.into();
        if samples.is_empty() {
            return Err(AnalysisError::EmptySamples);
        }
        self.validate_apertures()?;

        let params = self.params;
        let squared: Vec<f64> = samples.iter().map(|s| s * s).collect();
        let wide = stats::averaged(&squared, params.averaging_aperture_length());
        let narrow = stats::averaged(&squared, params.averaging_impulse_aperture_length());

        let absolute: Vec<f64> = samples.iter().map(|s| s.abs()).collect();
        let max_absolute_signal = stats::max_of(&absolute);

        let mut scratch = Vec::with_capacity(wide.len());
        let typical_averaged_signal =
            stats::percentile(&wide, params.typical_signal_percentile, &mut scratch).sqrt();

        tracing::debug!(
            count = samples.len(),
            wide_count = wide.len(),
            narrow_count = narrow.len(),
            max_absolute_signal,
            typical_averaged_signal,
            "[Envelope] Built averaged envelopes"
        );

        Ok(Envelope {
            params,
            samples,
            squared,
            wide,
            narrow,
            max_absolute_signal,
            typical_averaged_signal,
        })
    }
}

/// Frozen result of preprocessing one sample buffer
///
/// Holds the raw samples, their squares, both averaged envelopes and the
/// global statistics. Read-only after construction.
#[derive(Debug, Clone)]
pub struct Envelope {
    params: Parameters,
    samples: Vec<f64>,
    squared: Vec<f64>,
    wide: Vec<f64>,
    narrow: Vec<f64>,
    max_absolute_signal: f64,
    typical_averaged_signal: f64,
}

impl Envelope {
    /// Number of raw samples
    pub fn count(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn squared_amplitude(&self) -> &[f64] {
        &self.squared
    }

    /// Number of positions in the wide envelope
    pub fn wide_count(&self) -> usize {
        self.wide.len()
    }

    /// Number of positions in the narrow envelope
    pub fn narrow_count(&self) -> usize {
        self.narrow.len()
    }

    /// Largest absolute raw sample
    pub fn max_absolute_signal(&self) -> f64 {
        self.max_absolute_signal
    }

    /// Index in the narrow envelope whose window is centred with `wide_index`
    pub fn narrow_index_for(&self, wide_index: usize) -> usize {
        wide_index + self.narrow.len().saturating_sub(self.wide.len()) / 2
    }
}

/// Read-only view of an averaged envelope, as consumed by the classifier
///
/// Implementors supply the envelopes, thresholds and typical signal; the
/// windowed queries are provided on top of [`EnvelopeView::wide_envelope`].
pub trait EnvelopeView {
    fn parameters(&self) -> &Parameters;

    /// Squared amplitude averaged over the usual aperture
    fn wide_envelope(&self) -> &[f64];

    /// Squared amplitude averaged over the impulse aperture
    fn narrow_envelope(&self) -> &[f64];

    /// Percentile of the wide envelope, as an amplitude
    fn typical_averaged_signal(&self) -> f64;

    /// Time of a raw sample index in seconds
    fn sample_time_stamp(&self, index: usize) -> f64 {
        index as f64 * self.parameters().sample_duration()
    }

    /// Minimum of the wide envelope over `[lo, hi]`
    ///
    /// The bounds are clamped to the envelope. An empty clamped range yields
    /// positive infinity, which callers must be prepared for.
    fn windowed_minimum(&self, lo: isize, hi: isize) -> f64 {
        let wide = self.wide_envelope();
        match clamped_range(lo, hi, wide.len()) {
            Some(range) => wide[range].iter().copied().fold(f64::INFINITY, f64::min),
            None => f64::INFINITY,
        }
    }

    /// Nearest-rank percentile of the wide envelope over `[lo, hi]`
    ///
    /// Same clamping as [`EnvelopeView::windowed_minimum`]; an empty range
    /// yields NaN.
    fn windowed_percentile(&self, lo: isize, hi: isize, level: f64, scratch: &mut Vec<f64>) -> f64 {
        let wide = self.wide_envelope();
        match clamped_range(lo, hi, wide.len()) {
            Some(range) => stats::percentile(&wide[range], level, scratch),
            None => f64::NAN,
        }
    }
}

fn clamped_range(lo: isize, hi: isize, len: usize) -> Option<RangeInclusive<usize>> {
    if len == 0 || hi < 0 {
        return None;
    }
    let lo = lo.max(0) as usize;
    let hi = (hi as usize).min(len - 1);
    if lo > hi {
        return None;
    }
    Some(lo..=hi)
}

impl EnvelopeView for Envelope {
    fn parameters(&self) -> &Parameters {
        &self.params
    }

    fn wide_envelope(&self) -> &[f64] {
        &self.wide
    }

    fn narrow_envelope(&self) -> &[f64] {
        &self.narrow
    }

    fn typical_averaged_signal(&self) -> f64 {
        self.typical_averaged_signal
    }
}
