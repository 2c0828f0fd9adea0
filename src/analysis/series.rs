// Series - grouping of good maxima that follow each other closely
//
// A cry usually comes as a run of short impulses. Two consecutive good
// maxima belong to the same series when the gap between them does not
// exceed `max_duration_between_sequential_good_maximums`.

use serde::Serialize;

/// Summary of the series found among good maxima
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeriesSummary {
    /// Length of the longest series, 0 when no two maxima are close enough
    pub max_sequential: usize,
    /// Number of maxima that belong to any series of two or more
    pub total_sequential: usize,
}

/// Summarize series among ascending time stamps
///
/// # Arguments
/// * `time_stamps` - Time stamps of good maxima in seconds, ascending
/// * `max_gap` - Largest gap in seconds that still joins two maxima
pub fn summarize_series(time_stamps: &[f64], max_gap: f64) -> SeriesSummary {
    let mut longest = 0;
    let mut total = 0;
    let mut current = 1;
    for pair in time_stamps.windows(2) {
        if pair[1] - pair[0] <= max_gap {
            if current == 1 {
                // the first maximum of the series is counted once it gets a partner
                total += 1;
            }
            current += 1;
            total += 1;
        } else {
            current = 1;
        }
        longest = longest.max(current);
    }

    SeriesSummary {
        max_sequential: if longest == 1 { 0 } else { longest },
        total_sequential: total,
    }
}
