// LocalMaximum - per-candidate classification of averaged envelope maxima
//
// A candidate position in the wide envelope goes through a chain of gates and
// stops at the first one it fails:
//
// 1. narrow envelope covers the aligned position
// 2. local maximum window fits inside the wide envelope
// 3. averaged amplitude reaches the global loud floor
// 4. strict local maximum (ties go to the leftmost sample)
// 5. ratio to the typical signal of the whole recording
// 6. ratio to the low signal on both sides (minimum, then percentile)
// 7. short impulse: loud for a bounded time with silence on both flanks
//
// Fields of later gates stay at their reset values (NaN / None / false) when an
// earlier gate fails, so the record doubles as a trail of why a candidate was
// rejected.

use std::fmt;

use serde::Serialize;

use crate::analysis::envelope::EnvelopeView;
use crate::error::AnalysisError;

/// First gate a candidate failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Out of context, too quiet, or not a strict local maximum
    NotLocalMaximum,
    /// Weaker than `min_ratio_to_typical_signal` times the typical signal
    BelowTypicalRatio,
    /// Weaker than `min_ratio_to_low_signal` times the surrounding low signal
    BelowLowSignalRatio,
    /// No narrow-envelope sample reaches the peak level nearby
    ImpulseNotFound,
    /// Loud part lasts `max_impulse_duration` or longer
    ImpulseTooLong,
    /// Loud signal within `min_silence_near_impulse_duration` before the impulse
    SilenceTooShortBefore,
    /// Loud signal within `min_silence_near_impulse_duration` after the impulse
    SilenceTooShortAfter,
}

/// Classification record of one wide-envelope position
///
/// Reused across candidates: [`LocalMaximumInfo::analyse_sample`] resets it
/// before every classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocalMaximumInfo {
    local_maximum: bool,
    good_local_maximum: bool,
    below_typical_ratio: bool,
    below_low_signal_ratio: bool,
    impulse_not_found: bool,
    short_impulse: bool,
    silence_too_short_before: bool,
    silence_too_short_after: bool,
    /// Raw sample index of the maximum (wide index shifted by half the averaging aperture)
    sample_index: Option<usize>,
    sample_time_stamp: f64,
    max_averaged_amplitude: f64,
    min_averaged_amplitude: f64,
    low_percentile_averaged_amplitude: f64,
    short_impulse_left: Option<isize>,
    short_impulse_right: Option<isize>,
    short_impulse_amplitude: f64,
    wide_aperture_half_duration: f64,
    impulse_duration: f64,
}

impl Default for LocalMaximumInfo {
    fn default() -> Self {
        Self {
            local_maximum: false,
            good_local_maximum: false,
            below_typical_ratio: false,
            below_low_signal_ratio: false,
            impulse_not_found: false,
            short_impulse: false,
            silence_too_short_before: false,
            silence_too_short_after: false,
            sample_index: None,
            sample_time_stamp: f64::NAN,
            max_averaged_amplitude: f64::NAN,
            min_averaged_amplitude: f64::NAN,
            low_percentile_averaged_amplitude: f64::NAN,
            short_impulse_left: None,
            short_impulse_right: None,
            short_impulse_amplitude: f64::NAN,
            wide_aperture_half_duration: f64::NAN,
            impulse_duration: f64::NAN,
        }
    }
}

impl LocalMaximumInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every flag and result
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_local_maximum(&self) -> bool {
        self.local_maximum
    }

    pub fn is_good_local_maximum(&self) -> bool {
        self.good_local_maximum
    }

    pub fn failed_typical_ratio(&self) -> bool {
        self.below_typical_ratio
    }

    pub fn failed_low_signal_ratio(&self) -> bool {
        self.below_low_signal_ratio
    }

    pub fn impulse_not_found(&self) -> bool {
        self.impulse_not_found
    }

    pub fn is_short_impulse(&self) -> bool {
        self.short_impulse
    }

    pub fn silence_too_short_before(&self) -> bool {
        self.silence_too_short_before
    }

    pub fn silence_too_short_after(&self) -> bool {
        self.silence_too_short_after
    }

    pub fn sample_index(&self) -> Option<usize> {
        self.sample_index
    }

    pub fn sample_time_stamp(&self) -> f64 {
        self.sample_time_stamp
    }

    /// Square root of the wide envelope at the candidate
    pub fn max_averaged_amplitude(&self) -> f64 {
        self.max_averaged_amplitude
    }

    /// Larger of the two one-sided minima around the candidate, as an amplitude
    pub fn min_averaged_amplitude(&self) -> f64 {
        self.min_averaged_amplitude
    }

    /// Larger of the two one-sided low percentiles around the candidate, as an amplitude
    pub fn low_percentile_averaged_amplitude(&self) -> f64 {
        self.low_percentile_averaged_amplitude
    }

    /// First raw sample of the impulse
    pub fn short_impulse_left(&self) -> Option<isize> {
        self.short_impulse_left
    }

    /// Raw sample just past the impulse
    pub fn short_impulse_right(&self) -> Option<isize> {
        self.short_impulse_right
    }

    /// Silence threshold of the impulse, as an amplitude
    pub fn short_impulse_amplitude(&self) -> f64 {
        self.short_impulse_amplitude
    }

    pub fn wide_aperture_half_duration(&self) -> f64 {
        self.wide_aperture_half_duration
    }

    /// Measured duration of the loud part, in seconds
    pub fn impulse_duration(&self) -> f64 {
        self.impulse_duration
    }

    /// First gate this candidate failed, or `None` for a good maximum
    pub fn rejection(&self) -> Option<Rejection> {
        if self.good_local_maximum {
            None
        } else if !self.local_maximum {
            Some(Rejection::NotLocalMaximum)
        } else if self.below_typical_ratio {
            Some(Rejection::BelowTypicalRatio)
        } else if self.below_low_signal_ratio {
            Some(Rejection::BelowLowSignalRatio)
        } else if self.impulse_not_found {
            Some(Rejection::ImpulseNotFound)
        } else if !self.short_impulse {
            Some(Rejection::ImpulseTooLong)
        } else if self.silence_too_short_before {
            Some(Rejection::SilenceTooShortBefore)
        } else {
            Some(Rejection::SilenceTooShortAfter)
        }
    }

    /// Classify one wide-envelope position
    ///
    /// # Arguments
    /// * `envelope` - Envelopes and thresholds to classify against
    /// * `wide_index` - Candidate index in the wide envelope
    /// * `narrow_index` - Index in the narrow envelope centred with `wide_index`
    /// * `aperture` - Local maximum test aperture in samples (odd)
    /// * `wide_aperture` - Low signal context aperture in samples
    /// * `scratch` - Work buffer for the percentile queries
    ///
    /// # Errors
    /// `IndexOutOfRange` for a `wide_index` outside the wide envelope and
    /// `ZeroAperture` for a zero aperture. Every other outcome, including
    /// all gate failures, is reported through the record's flags.
    pub fn analyse_sample<E: EnvelopeView + ?Sized>(
        &mut self,
        envelope: &E,
        wide_index: usize,
        narrow_index: usize,
        aperture: usize,
        wide_aperture: usize,
        scratch: &mut Vec<f64>,
    ) -> Result<(), AnalysisError> {
        let wide = envelope.wide_envelope();
        if wide_index >= wide.len() {
            return Err(AnalysisError::IndexOutOfRange {
                index: wide_index,
                len: wide.len(),
            });
        }
        if aperture == 0 {
            return Err(AnalysisError::ZeroAperture {
                parameter: "aperture",
            });
        }
        if wide_aperture == 0 {
            return Err(AnalysisError::ZeroAperture {
                parameter: "wide aperture",
            });
        }

        self.reset();

        if narrow_index >= envelope.narrow_envelope().len() {
            // narrow envelope does not reach this far, impulse shape cannot be checked
            return Ok(());
        }

        // Actual window is 2 * half + 1 samples
        let half = aperture / 2;
        if wide_index < half || wide_index + half >= wide.len() {
            return Ok(());
        }

        let params = envelope.parameters();
        let current = wide[wide_index];
        self.max_averaged_amplitude = current.sqrt();
        if self.max_averaged_amplitude < params.global_loud_amplitude() {
            return Ok(());
        }

        for k in 1..half {
            // among equal neighbours only the leftmost one counts as a maximum
            if wide[wide_index - k] >= current || wide[wide_index + k] > current {
                return Ok(());
            }
        }

        self.local_maximum = true;
        let sample_index = wide_index + params.averaging_aperture_length() / 2;
        self.sample_index = Some(sample_index);
        self.sample_time_stamp = envelope.sample_time_stamp(sample_index);
        let context_half = wide_aperture / 2;
        self.wide_aperture_half_duration = context_half as f64 * params.sample_duration();

        let peak = self.max_averaged_amplitude;
        if envelope.typical_averaged_signal() * params.min_ratio_to_typical_signal() > peak {
            self.below_typical_ratio = true;
            return Ok(());
        }

        // Both sides must be quiet on their own, hence the larger of the two
        let centre = wide_index as isize;
        let lo = centre - context_half as isize;
        let hi = centre + context_half as isize;
        let ratio = params.min_ratio_to_low_signal();
        self.min_averaged_amplitude = envelope
            .windowed_minimum(lo, centre)
            .max(envelope.windowed_minimum(centre, hi))
            .sqrt();
        if self.min_averaged_amplitude * ratio > peak {
            // percentile >= minimum, so the percentile check cannot pass either
            self.below_low_signal_ratio = true;
            return Ok(());
        }

        let level = params.local_max_low_signal_percentile();
        let before = envelope.windowed_percentile(lo, centre, level, scratch);
        let after = envelope.windowed_percentile(centre, hi, level, scratch);
        self.low_percentile_averaged_amplitude = before.max(after).sqrt();
        if self.low_percentile_averaged_amplitude * ratio > peak {
            self.below_low_signal_ratio = true;
            return Ok(());
        }

        if !self.confirm_short_impulse(envelope, narrow_index, current) {
            return Ok(());
        }

        self.good_local_maximum = true;
        Ok(())
    }

    /// Check that the loud event around `narrow_index` is short and isolated
    ///
    /// Sets `impulse_not_found`, `short_impulse` and the silence flags as it
    /// goes; returns true only when every check passed.
    fn confirm_short_impulse<E: EnvelopeView + ?Sized>(
        &mut self,
        envelope: &E,
        narrow_index: usize,
        target_amplitude_square: f64,
    ) -> bool {
        let Some(found) =
            Self::find_nearest_impulse(envelope, narrow_index, target_amplitude_square)
        else {
            self.impulse_not_found = true;
            return false;
        };

        let params = envelope.parameters();
        let narrow = envelope.narrow_envelope();
        let len = narrow.len() as isize;
        let ratio = params.ratio_of_impulse_and_silence();
        let silence_square = target_amplitude_square / (ratio * ratio);
        let max_length = params.max_impulse_duration_length() as isize;
        let found = found as isize;

        let mut left = found;
        while left >= 0 && found - left < max_length && narrow[left as usize] >= silence_square {
            left -= 1;
        }
        let mut right = found;
        while right < len && right - found < max_length && narrow[right as usize] >= silence_square
        {
            right += 1;
        }
        self.impulse_duration = (right - left) as f64 * params.sample_duration();
        if right - left >= max_length {
            return false;
        }

        self.short_impulse = true;
        let shift = (params.averaging_impulse_aperture_length() / 2) as isize;
        self.short_impulse_left = Some(left + shift);
        self.short_impulse_right = Some(right + shift);
        self.short_impulse_amplitude = silence_square.sqrt();

        let silence = params.min_silence_near_impulse_length() as isize;
        let is_loud = |k: isize| narrow[k as usize] > silence_square;
        self.silence_too_short_before = ((left - silence).max(0)..=left).any(is_loud);
        self.silence_too_short_after = (right..=(right + silence).min(len - 1)).any(is_loud);

        !self.silence_too_short_before && !self.silence_too_short_after
    }

    /// Find the narrow-envelope sample nearest to `narrow_index` reaching `amplitude_square`
    ///
    /// The narrow envelope reacts faster, so its peak may sit a little left or
    /// right of the wide maximum, but never further than half the usual
    /// averaging aperture. At each distance the left side is checked first.
    pub fn find_nearest_impulse<E: EnvelopeView + ?Sized>(
        envelope: &E,
        narrow_index: usize,
        amplitude_square: f64,
    ) -> Option<usize> {
        let narrow = envelope.narrow_envelope();
        let search_half = envelope.parameters().averaging_aperture_length() / 2;
        for k in 0..search_half {
            if let Some(left) = narrow_index.checked_sub(k) {
                if left < narrow.len() && narrow[left] >= amplitude_square {
                    return Some(left);
                }
            }
            let right = narrow_index + k;
            if right < narrow.len() && narrow[right] >= amplitude_square {
                return Some(right);
            }
        }
        None
    }
}

impl fmt::Display for LocalMaximumInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "local maximum info")?;
        if !self.local_maximum {
            return write!(f, " [NOT A MAXIMUM OR TOO LOW]");
        }

        write!(
            f,
            ": {}",
            if self.good_local_maximum { "GOOD" } else { "weak" }
        )?;
        if self.below_typical_ratio {
            write!(f, " relating typical")?;
        }
        if self.below_low_signal_ratio {
            write!(f, " relating low")?;
        }
        if self.impulse_not_found {
            write!(f, " (impulse not found)")?;
        }
        if self.short_impulse {
            write!(f, " (short impulse)")?;
        } else if self.impulse_duration.is_finite() {
            write!(f, " (impulse too long)")?;
        }
        if self.silence_too_short_before {
            write!(f, " (but short silence before)")?;
        }
        if self.silence_too_short_after {
            write!(f, " (but short silence after)")?;
        }
        write!(
            f,
            ", sample #{} (time {:.3}), averaged amplitude: {:.2}, \
             min and low percentile while ±{:.3} sec: {:.2} and {:.2}, \
             strong signal duration: {:.3} sec",
            self.sample_index.map_or(-1, |i| i as i64),
            self.sample_time_stamp,
            self.max_averaged_amplitude,
            self.wide_aperture_half_duration,
            self.min_averaged_amplitude,
            self.low_percentile_averaged_amplitude,
            self.impulse_duration
        )
    }
}

#[cfg(test)]
#[path = "local_maximum_tests.rs"]
mod tests;
