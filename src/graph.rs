// Graph - raster plot of one analysed buffer
//
// Draws, bottom to top:
// 1. raw samples as magenta bars around the horizontal axis
// 2. typical signal (green) and loud floor (grey) lines
// 3. per local maximum: a vertical marker, the peak bar over the local
//    maximum window, the low percentile and minimum bars over the context
//    window, and the confirmed short impulse span in yellow
// 4. narrow (pink) and wide (blue) envelopes as amplitudes
//
// Envelopes are shorter than the sample buffer; they are centred on it by
// shifting each index by (count - envelope_len) / 2.

use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};

use crate::analysis::envelope::{Envelope, EnvelopeView};
use crate::analysis::local_maximum::LocalMaximumInfo;
use crate::error::GraphError;

pub const DEFAULT_WIDTH: u32 = 8000;
pub const DEFAULT_HEIGHT: u32 = 512;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const SAMPLE_BARS: Rgb<u8> = Rgb([255, 0, 255]);
const AXIS: Rgb<u8> = Rgb([0, 0, 0]);
const TYPICAL: Rgb<u8> = Rgb([0, 128, 0]);
const LOUD_FLOOR: Rgb<u8> = Rgb([128, 128, 128]);
const GOOD_MARKER: Rgb<u8> = Rgb([0, 255, 0]);
const MAXIMUM: Rgb<u8> = Rgb([0, 0, 255]);
const IMPULSE: Rgb<u8> = Rgb([255, 255, 0]);
const NARROW_ENVELOPE: Rgb<u8> = Rgb([255, 128, 255]);
const WIDE_ENVELOPE: Rgb<u8> = Rgb([0, 0, 255]);

/// Line width in pixels plus an optional (on, off) dash pattern
#[derive(Debug, Clone, Copy)]
struct Stroke {
    width: i64,
    dash: Option<(i64, i64)>,
}

impl Stroke {
    const SOLID: Stroke = Stroke {
        width: 1,
        dash: None,
    };
    const DOTTED: Stroke = Stroke {
        width: 1,
        dash: Some((5, 5)),
    };
    const GOOD_MARKER: Stroke = Stroke {
        width: 5,
        dash: Some((20, 10)),
    };
    const GOOD_IMPULSE: Stroke = Stroke {
        width: 4,
        dash: Some((5, 5)),
    };
    const WEAK_IMPULSE: Stroke = Stroke {
        width: 6,
        dash: None,
    };

    fn draws(&self, offset: i64) -> bool {
        match self.dash {
            None => true,
            Some((on, off)) => offset.rem_euclid(on + off) < on,
        }
    }
}

/// Image plus the sample-to-pixel mapping
struct Plot {
    image: RgbImage,
    scale_x: f64,
    scale_y: f64,
    axis_y: i64,
}

impl Plot {
    fn x(&self, sample_index: f64) -> i64 {
        (sample_index * self.scale_x).round() as i64
    }

    fn y(&self, amplitude: f64) -> i64 {
        self.axis_y - (amplitude * self.scale_y).round() as i64
    }

    fn width(&self) -> i64 {
        i64::from(self.image.width())
    }

    fn height(&self) -> i64 {
        i64::from(self.image.height())
    }

    fn put(&mut self, x: i64, y: i64, colour: Rgb<u8>) {
        if (0..self.width()).contains(&x) && (0..self.height()).contains(&y) {
            self.image.put_pixel(x as u32, y as u32, colour);
        }
    }

    /// Filled rectangle between two corners, both inclusive
    fn fill_rect(&mut self, x1: i64, y1: i64, x2: i64, y2: i64, colour: Rgb<u8>) {
        let (xs, ys) = (
            x1.min(x2).max(0)..=x1.max(x2).min(self.width() - 1),
            y1.min(y2).max(0)..=y1.max(y2).min(self.height() - 1),
        );
        for y in ys {
            for x in xs.clone() {
                self.image.put_pixel(x as u32, y as u32, colour);
            }
        }
    }

    /// One-pixel Bresenham segment
    fn line(&mut self, (x1, y1): (i64, i64), (x2, y2): (i64, i64), colour: Rgb<u8>) {
        let dx = (x2 - x1).abs();
        let dy = -(y2 - y1).abs();
        let step_x = if x1 < x2 { 1 } else { -1 };
        let step_y = if y1 < y2 { 1 } else { -1 };
        let (mut x, mut y, mut err) = (x1, y1, dx + dy);
        loop {
            self.put(x, y, colour);
            if x == x2 && y == y2 {
                break;
            }
            let doubled = 2 * err;
            if doubled >= dy {
                err += dy;
                x += step_x;
            }
            if doubled <= dx {
                err += dx;
                y += step_y;
            }
        }
    }

    fn horizontal(&mut self, x1: i64, x2: i64, y: i64, stroke: Stroke, colour: Rgb<u8>) {
        let start = x1.min(x2);
        let end = x1.max(x2).min(self.width() - 1);
        let top = y - stroke.width / 2;
        for x in start.max(0)..=end {
            if stroke.draws(x - start) {
                for row in top..top + stroke.width {
                    self.put(x, row, colour);
                }
            }
        }
    }

    fn vertical(&mut self, x: i64, stroke: Stroke, colour: Rgb<u8>) {
        let left = x - stroke.width / 2;
        for y in 0..self.height() {
            if stroke.draws(y) {
                for column in left..left + stroke.width {
                    self.put(column, y, colour);
                }
            }
        }
    }

    /// Square-root envelope as a polyline, centred on the sample buffer
    fn envelope(&mut self, squares: &[f64], count: usize, colour: Rgb<u8>) {
        let offset = count.saturating_sub(squares.len()) / 2;
        for (k, pair) in squares.windows(2).enumerate() {
            let index = (k + offset) as f64;
            let from = (self.x(index), self.y(pair[0].sqrt()));
            let to = (self.x(index + 1.0), self.y(pair[1].sqrt()));
            self.line(from, to, colour);
        }
    }

    fn maximum(&mut self, info: &LocalMaximumInfo, half: usize, wide_half: usize) {
        let Some(sample_index) = info.sample_index() else {
            return;
        };
        let centre = sample_index as f64;
        let x = self.x(centre);
        if info.is_good_local_maximum() {
            self.vertical(x, Stroke::GOOD_MARKER, GOOD_MARKER);
        } else {
            self.vertical(x, Stroke::DOTTED, MAXIMUM);
        }

        let (x1, x2) = (self.x(centre - half as f64), self.x(centre + half as f64));
        let y = self.y(info.max_averaged_amplitude());
        self.horizontal(x1, x2, y, Stroke::SOLID, MAXIMUM);

        let (x1, x2) = (
            self.x(centre - wide_half as f64),
            self.x(centre + wide_half as f64),
        );
        let percentile = info.low_percentile_averaged_amplitude();
        if !percentile.is_nan() {
            let y = self.y(percentile);
            self.horizontal(x1, x2, y, Stroke::DOTTED, MAXIMUM);
        }
        let minimum = info.min_averaged_amplitude();
        if !minimum.is_nan() {
            let y = self.y(minimum);
            self.horizontal(x1, x2, y, Stroke::SOLID, MAXIMUM);
        }

        if let (true, Some(left), Some(right)) = (
            info.is_short_impulse(),
            info.short_impulse_left(),
            info.short_impulse_right(),
        ) {
            let stroke = if info.is_good_local_maximum() {
                Stroke::GOOD_IMPULSE
            } else {
                Stroke::WEAK_IMPULSE
            };
            let (x1, x2) = (self.x(left as f64), self.x(right as f64));
            let y = self.y(info.short_impulse_amplitude());
            self.horizontal(x1, x2, y, stroke, IMPULSE);
        }
    }
}

/// Draw the samples, envelopes and classified maxima of one buffer
///
/// # Arguments
/// * `envelope` - Preprocessed buffer the maxima were found in
/// * `maxima` - Local maxima to overlay, usually `DetectionReport::local_maxima`
/// * `width`, `height` - Image size in pixels
///
/// # Errors
/// `InvalidSize` when either dimension is zero
pub fn render_graph(
    envelope: &Envelope,
    maxima: &[LocalMaximumInfo],
    width: u32,
    height: u32,
) -> Result<RgbImage, GraphError> {
    if width == 0 || height == 0 {
        return Err(GraphError::InvalidSize { width, height });
    }

    let count = envelope.count();
    let max_abs = envelope.max_absolute_signal();
    let half_height = i64::from(height / 2);
    let scale_y = if max_abs > 0.0 && max_abs.is_finite() {
        (half_height - 1) as f64 / max_abs
    } else {
        0.0
    };
    let mut plot = Plot {
        image: RgbImage::from_pixel(width, height, BACKGROUND),
        scale_x: f64::from(width) / count as f64,
        scale_y,
        axis_y: half_height,
    };

    for (k, &sample) in envelope.samples().iter().enumerate() {
        let x1 = plot.x(k as f64);
        let x2 = plot.x((k + 1) as f64);
        let y = plot.y(sample);
        plot.fill_rect(x1, plot.axis_y, x2, y, SAMPLE_BARS);
    }
    plot.horizontal(0, plot.width() - 1, plot.axis_y, Stroke::SOLID, AXIS);

    let typical = envelope.typical_averaged_signal();
    if typical.is_finite() {
        let y = plot.y(typical);
        plot.horizontal(0, plot.width() - 1, y, Stroke::SOLID, TYPICAL);
    }
    let params = envelope.parameters();
    if params.global_loud_amplitude() > 0.0 {
        let y = plot.y(params.global_loud_amplitude());
        plot.horizontal(0, plot.width() - 1, y, Stroke::SOLID, LOUD_FLOOR);
    }

    let half = params.local_max_aperture_length() / 2;
    let wide_half = params.local_max_wide_aperture_length() / 2;
    for info in maxima {
        plot.maximum(info, half, wide_half);
    }

    plot.envelope(envelope.narrow_envelope(), count, NARROW_ENVELOPE);
    plot.envelope(envelope.wide_envelope(), count, WIDE_ENVELOPE);

    tracing::debug!(
        width,
        height,
        maxima = maxima.len(),
        "[Graph] Rendered detection graph"
    );
    Ok(plot.image)
}

/// Write a rendered graph; the format follows the file extension, PNG when there is none
pub fn save_graph(image: &RgbImage, path: &Path) -> Result<(), GraphError> {
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
    image
        .save_with_format(path, format)
        .map_err(|err| GraphError::SaveFailed {
            path: path.display().to_string(),
            reason: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::detect;
    use crate::analysis::envelope::EnvelopeBuilder;

    fn burst_envelope() -> Envelope {
        let mut samples = vec![0.125; 2000];
        for sample in &mut samples[1000..1010] {
            *sample = 1.0;
        }
        EnvelopeBuilder::new(0.001)
            .and_then(|b| b.with_averaging_aperture(0.02))
            .and_then(|b| b.with_averaging_impulse_aperture(0.005))
            .and_then(|b| b.with_local_max_aperture(0.05))
            .and_then(|b| b.with_local_max_wide_aperture(0.4))
            .and_then(|b| b.with_global_loud_amplitude(0.5))
            .and_then(|b| b.with_max_impulse_duration(0.1))
            .and_then(|b| b.with_min_silence_near_impulse_duration(0.1))
            .and_then(|b| b.build(samples))
            .unwrap()
    }

    #[test]
    fn test_rejects_zero_size() {
        let envelope = burst_envelope();
        assert_eq!(
            render_graph(&envelope, &[], 0, 100).unwrap_err(),
            GraphError::InvalidSize {
                width: 0,
                height: 100
            }
        );
        assert!(render_graph(&envelope, &[], 100, 0).is_err());
    }

    #[test]
    fn test_draws_axis_bars_and_good_marker() {
        let envelope = burst_envelope();
        let report = detect(&envelope).unwrap();
        assert_eq!(report.good_maxima.len(), 1);

        // one pixel per sample, amplitude 1.0 maps to 99 pixels above the axis
        let image = render_graph(&envelope, &report.local_maxima, 2000, 200).unwrap();
        assert_eq!(image.dimensions(), (2000, 200));

        // axis covers the quiet sample bars
        assert_eq!(*image.get_pixel(100, 100), AXIS);
        // quiet floor 0.125 reaches about 12 pixels up
        assert_eq!(*image.get_pixel(100, 95), SAMPLE_BARS);
        assert_eq!(*image.get_pixel(100, 40), BACKGROUND);
        // top of the burst, right of the marker and below the narrow envelope
        assert_eq!(*image.get_pixel(1004, 2), SAMPLE_BARS);
        // dashed good marker at sample 1000 starts at the top row
        assert_eq!(*image.get_pixel(1000, 0), GOOD_MARKER);
        assert_eq!(*image.get_pixel(998, 10), GOOD_MARKER);
        assert_eq!(*image.get_pixel(998, 25), BACKGROUND);
    }

    #[test]
    fn test_empty_maxima_still_draw_envelopes() {
        let envelope = burst_envelope();
        let image = render_graph(&envelope, &[], 400, 100).unwrap();
        let wide_pixels = image.pixels().filter(|p| **p == WIDE_ENVELOPE).count();
        assert!(wide_pixels > 0);
        assert!(image.pixels().all(|p| *p != GOOD_MARKER));
    }

    #[test]
    fn test_save_graph_writes_png() {
        let envelope = burst_envelope();
        let image = render_graph(&envelope, &[], 64, 32).unwrap();
        let path = std::env::temp_dir().join(format!("impulse_graph_{}.png", std::process::id()));

        save_graph(&image, &path).unwrap();
        assert_eq!(image::image_dimensions(&path).unwrap(), (64, 32));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_save_graph_reports_unwritable_path() {
        let image = RgbImage::new(4, 4);
        let err = save_graph(&image, Path::new("/nonexistent/dir/graph.png")).unwrap_err();
        assert!(matches!(err, GraphError::SaveFailed { .. }));
    }
}
