// Stats - order statistics and sliding-window averaging
//
// Leaf helpers shared by the envelope engine and the local maximum classifier.
// All functions work on plain slices and never allocate except where a
// caller-owned scratch buffer has to grow.
//
// Empty inputs return sentinels instead of errors:
// - max_of([])      = -inf
// - percentile([])  = NaN
// These show up naturally at the edges of the sliding-window range and must
// not abort a batch scan.

/// Widen integer PCM samples to `f64` without rescaling
pub fn int_to_double(values: &[i32]) -> Vec<f64> {
    values.iter().map(|&v| f64::from(v)).collect()
}

/// Maximum of `values`
///
/// # Returns
/// The largest element, or negative infinity for an empty slice
pub fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Nearest-rank percentile of `values`
///
/// The values are copied into `scratch` (grown on demand, never shrunk), sorted
/// ascending, and the element at `round(level * len)` is returned, with the
/// rank clamped to `[0, len - 1]`. This is not an interpolated percentile.
///
/// `level` is expected in `[0, 1]` but is not range-checked here.
///
/// # Arguments
/// * `values` - Source values (left untouched)
/// * `level` - Percentile level, 0.5 = median
/// * `scratch` - Reusable work buffer owned by the caller
///
/// # Returns
/// The selected value, or NaN for an empty slice
pub fn percentile(values: &[f64], level: f64, scratch: &mut Vec<f64>) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }

    scratch.clear();
    scratch.extend_from_slice(values);
    scratch.sort_unstable_by(f64::total_cmp);

    let count = scratch.len();
    let rank = (level * count as f64).round();
    let index = if rank > 0.0 {
        (rank as usize).min(count - 1)
    } else {
        0
    };
    scratch[index]
}

/// Number of valid sliding-window positions for `count` samples
///
/// The effective aperture is `max(aperture, 1)`. An aperture that meets or
/// exceeds the sample count leaves no valid position.
pub fn average_count(count: usize, aperture: usize) -> usize {
    let aperture = aperture.max(1);
    if aperture >= count {
        return 0;
    }
    count - aperture + 1
}

/// Sliding mean of every window of `aperture` consecutive values
///
/// Writes `average_count(values.len(), aperture)` means into the front of
/// `result`. The window sum is computed once and then updated incrementally
/// (add the entering sample, subtract the leaving one), so the cost is
/// O(len) regardless of the aperture.
///
/// Does nothing when no valid window exists.
///
/// # Panics
/// If `result` is shorter than the number of valid positions
pub fn average(result: &mut [f64], values: &[f64], aperture: usize) {
    let aperture = aperture.max(1);
    let result_len = average_count(values.len(), aperture);
    if result_len == 0 {
        return;
    }

    let mut sum: f64 = values[..aperture].iter().sum();
    let aperture_inv = 1.0 / aperture as f64;
    result[0] = sum * aperture_inv;
    for k in 1..result_len {
        sum += values[k + aperture - 1] - values[k - 1];
        result[k] = sum * aperture_inv;
    }
}

/// Allocating convenience wrapper around [`average`]
pub fn averaged(values: &[f64], aperture: usize) -> Vec<f64> {
    let mut result = vec![0.0; average_count(values.len(), aperture)];
    average(&mut result, values, aperture);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    #[test]
    fn test_int_to_double_widens() {
        assert_eq!(int_to_double(&[-1, 2, 3]), vec![-1.0, 2.0, 3.0]);
        assert!(int_to_double(&[]).is_empty());
    }

    #[test]
    fn test_max_of() {
        assert_eq!(max_of(&[5.0, 1.0, 9.0, 3.0]), 9.0);
        assert_eq!(max_of(&[-4.0, -2.0]), -2.0);
    }

    #[test]
    fn test_max_of_empty_is_negative_infinity() {
        let empty = max_of(&[]);
        assert!(empty.is_infinite() && empty.is_sign_negative());
        // -inf is the identity of max, so partial results compose
        assert_eq!(empty.max(max_of(&[2.0])), 2.0);
    }

    #[test]
    fn test_percentile_empty_is_nan() {
        let mut scratch = Vec::new();
        assert!(percentile(&[], 0.5, &mut scratch).is_nan());
    }

    #[test]
    fn test_percentile_extremes() {
        let values = [4.0, 8.0, 1.0, 6.0, 3.0];
        let mut scratch = Vec::new();
        assert_eq!(percentile(&values, 0.0, &mut scratch), 1.0);
        assert_eq!(percentile(&values, 1.0, &mut scratch), 8.0);
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let values = [10.0, 20.0, 30.0, 40.0];
        let mut scratch = Vec::new();
        // round(0.5 * 4) = 2
        assert_eq!(percentile(&values, 0.5, &mut scratch), 30.0);
        // round(0.1 * 4) = 0
        assert_eq!(percentile(&values, 0.1, &mut scratch), 10.0);
        // round(0.9 * 4) = 4, clamped to 3
        assert_eq!(percentile(&values, 0.9, &mut scratch), 40.0);
    }

    #[test]
    fn test_percentile_leaves_input_untouched() {
        let values = vec![3.0, 1.0, 2.0];
        let mut scratch = Vec::new();
        percentile(&values, 0.5, &mut scratch);
        assert_eq!(values, vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_percentile_invariant_to_input_order() {
        let mut values: Vec<f64> = (0..101).map(|i| (i * 37 % 101) as f64).collect();
        let mut scratch = Vec::new();
        let expected = percentile(&values, 0.3, &mut scratch);

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5 {
            values.shuffle(&mut rng);
            assert_eq!(percentile(&values, 0.3, &mut scratch), expected);
        }

        values.sort_by(f64::total_cmp);
        assert_eq!(percentile(&values, 0.3, &mut scratch), expected);
    }

    #[test]
    fn test_percentile_reuses_larger_scratch() {
        let mut scratch = vec![99.0; 16];
        assert_eq!(percentile(&[2.0, 1.0], 1.0, &mut scratch), 2.0);
    }

    #[test]
    fn test_average_count() {
        assert_eq!(average_count(10, 10), 0);
        assert_eq!(average_count(10, 12), 0);
        assert_eq!(average_count(10, 3), 8);
        assert_eq!(average_count(10, 0), 10);
        assert_eq!(average_count(0, 1), 0);
    }

    #[test]
    fn test_average_unit_aperture_reproduces_input() {
        let values = [0.5, -1.25, 3.0, 7.75, 0.0];
        assert_eq!(averaged(&values, 1), values.to_vec());
    }

    #[test]
    fn test_average_matches_window_sums() {
        let values: Vec<f64> = (0..50).map(|i| ((i * 13) % 7) as f64 * 0.3 - 0.9).collect();
        let aperture = 6;
        let result = averaged(&values, aperture);
        assert_eq!(result.len(), values.len() - aperture + 1);

        for (k, mean) in result.iter().enumerate() {
            let window_sum: f64 = values[k..k + aperture].iter().sum();
            assert!(
                (mean * aperture as f64 - window_sum).abs() < 1e-9,
                "window {} drifted: {} vs {}",
                k,
                mean * aperture as f64,
                window_sum
            );
        }
    }

    #[test]
    fn test_average_without_valid_window_is_noop() {
        let mut result = [42.0; 3];
        average(&mut result, &[1.0, 2.0, 3.0], 3);
        assert_eq!(result, [42.0; 3]);
    }
}
