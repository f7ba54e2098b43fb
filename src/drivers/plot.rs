use image::{imageops, imageops::FilterType, ImageBuffer, Rgb, RgbImage};
use plotters::prelude::LineSeries;
use plotters::prelude::*;
use crate::drivers::buffer::{CaptureBuffer, LiveWindow};
use crate::drivers::error::ScopeError;
/// Which buffer the plot shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayMode {
    #[default]
    Live,
    CaptureView,
}
/// The two curves currently on the plot surface, as `[x, y]` points.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlotFrame {
    pub live: Vec<[f64; 2]>,
    pub capture: Vec<[f64; 2]>,
}
impl PlotFrame {
    pub fn is_empty(&self) -> bool {
        self.live.is_empty() && self.capture.is_empty()
    }
    /// `((x_min, x_max), (y_min, y_max))` over both curves, padded so neither
    /// range is degenerate. `None` when empty or when a span overflows.
    pub fn bounds(&self) -> Option<((f64, f64), (f64, f64))> {
        let mut points = self.live.iter().chain(self.capture.iter()).peekable();
        points.peek()?;
        let mut x = (f64::MAX, f64::MIN);
        let mut y = (f64::MAX, f64::MIN);
        for p in points {
            x = (x.0.min(p[0]), x.1.max(p[0]));
            y = (y.0.min(p[1]), y.1.max(p[1]));
        }
        Some((pad_range(x, 0.0)?, pad_range(y, 0.05)?))
    }
}
fn pad_range((lo, hi): (f64, f64), fraction: f64) -> Option<(f64, f64)> {
    let span = hi - lo;
    let padded = if span.abs() < f64::EPSILON {
        (lo - 1.0, hi + 1.0)
    } else {
        (lo - span * fraction, hi + span * fraction)
    };
    (padded.0.is_finite() && padded.1.is_finite()).then_some(padded)
}
/// Turns the buffers into curves. An empty selected buffer leaves the
/// previous curves in place.
#[derive(Default)]
pub struct PlotRenderer {
    frame: PlotFrame,
}
impl PlotRenderer {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn frame(&self) -> &PlotFrame {
        &self.frame
    }
    /// Returns whether the frame was redrawn.
    pub fn render(&mut self, mode: DisplayMode, live: &LiveWindow, capture: &CaptureBuffer) -> bool {
        match mode {
            DisplayMode::Live => {
                let Some(reference) = live.latest().map(|s| s.timestamp) else {
                    return false;
                };
                // newest at x = 0, older samples at positive x
                self.frame.live = live
                    .iter()
                    .map(|s| [reference - s.timestamp, s.value])
                    .collect();
                self.frame.capture.clear();
            }
            DisplayMode::CaptureView => {
                if capture.is_empty() {
                    return false;
                }
                self.frame.capture = capture
                    .samples()
                    .iter()
                    .map(|s| [s.timestamp, s.value])
                    .collect();
                self.frame.live.clear();
            }
        }
        true
    }
    pub fn clear(&mut self) {
        self.frame = PlotFrame::default();
    }
}
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub live_color: RGBColor,
    pub capture_color: RGBColor,
    /// Draw tick labels and axis titles. Needs a system font.
    pub annotate: bool,
    /// Render at this multiple of the output size, then downsample.
    pub supersample: u32,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            background: WHITE,
            live_color: BLUE,
            capture_color: RED,
            annotate: true,
            supersample: 2,
        }
    }
}
/// Rasterizes the plot surface: axes, grid and both curves.
pub fn render_plot_image(frame: &PlotFrame, style: &PlotStyle) -> Result<RgbImage, ScopeError> {
    let scale = style.supersample.max(1);
    let (width, height) = (style.width * scale, style.height * scale);
    if width == 0 || height == 0 {
        return Err(ScopeError::Plot("image size must be non-zero".into()));
    }
    let mut buffer = vec![0u8; (width * height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&style.background)?;
        let ((x_min, x_max), (y_min, y_max)) =
            frame.bounds().unwrap_or(((0.0, 1.0), (-1.0, 1.0)));
        let mut builder = ChartBuilder::on(&root);
        builder.margin((10 * scale) as i32);
        if style.annotate {
            builder
                .set_label_area_size(LabelAreaPosition::Left, (60 * scale) as i32)
                .set_label_area_size(LabelAreaPosition::Bottom, (50 * scale) as i32);
        }
        let mut chart = builder.build_cartesian_2d(x_min..x_max, y_min..y_max)?;
        {
            let mut mesh = chart.configure_mesh();
            mesh.light_line_style(&BLACK.mix(0.08))
                .bold_line_style(&BLACK.mix(0.2))
                .axis_style(BLACK.stroke_width(scale));
            if style.annotate {
                mesh.x_desc("Time (s)")
                    .y_desc("Amplitude")
                    .label_style(("sans-serif", f64::from(14 * scale)));
            } else {
                mesh.disable_x_axis().disable_y_axis();
            }
            mesh.draw()?;
        }
        let curves = [
            (&frame.live, style.live_color),
            (&frame.capture, style.capture_color),
        ];
        for (points, color) in curves {
            if points.is_empty() {
                continue;
            }
            chart.draw_series(LineSeries::new(
                points.iter().map(|p| (p[0], p[1])),
                color.stroke_width(2 * scale),
            ))?;
        }
        root.present()?;
    }
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer)
        .ok_or_else(|| ScopeError::Plot("failed to allocate image buffer".into()))?;
    if scale == 1 {
        return Ok(image);
    }
    Ok(imageops::resize(
        &image,
        style.width,
        style.height,
        FilterType::Triangle,
    ))
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::buffer::Sample;
    fn live_of(samples: &[(f64, f64)]) -> LiveWindow {
        let mut window = LiveWindow::with_capacity(16);
        for &(t, v) in samples {
            window.push(Sample::new(t, v));
        }
        window
    }
    #[test]
    fn live_curve_puts_newest_sample_at_zero() {
        let live = live_of(&[(10.0, 5.0), (10.05, 6.0), (10.1, 7.0)]);
        let mut renderer = PlotRenderer::new();
        assert!(renderer.render(DisplayMode::Live, &live, &CaptureBuffer::new()));
        let frame = renderer.frame();
        let xs: Vec<f64> = frame.live.iter().map(|p| p[0]).collect();
        let ys: Vec<f64> = frame.live.iter().map(|p| p[1]).collect();
        for (x, expected) in xs.iter().zip([0.1, 0.05, 0.0]) {
            assert!((x - expected).abs() < 1e-9, "{x} != {expected}");
        }
        assert_eq!(ys, vec![5.0, 6.0, 7.0]);
        assert!(frame.capture.is_empty());
    }
    #[test]
    fn capture_view_plots_elapsed_time_and_clears_live() {
        let live = live_of(&[(1.0, 1.0)]);
        let mut capture = CaptureBuffer::new();
        capture.push(0.0, 1.5);
        capture.push(0.1, 2.25);
        let mut renderer = PlotRenderer::new();
        renderer.render(DisplayMode::Live, &live, &capture);
        assert!(renderer.render(DisplayMode::CaptureView, &live, &capture));
        assert_eq!(renderer.frame().capture, vec![[0.0, 1.5], [0.1, 2.25]]);
        assert!(renderer.frame().live.is_empty());
    }
    #[test]
    fn empty_selected_buffer_leaves_previous_frame() {
        let live = live_of(&[(1.0, 3.0), (2.0, 4.0)]);
        let mut renderer = PlotRenderer::new();
        renderer.render(DisplayMode::Live, &live, &CaptureBuffer::new());
        let before = renderer.frame().clone();
        assert!(!renderer.render(DisplayMode::CaptureView, &live, &CaptureBuffer::new()));
        assert_eq!(renderer.frame(), &before);
        assert!(!renderer.render(DisplayMode::Live, &LiveWindow::default(), &CaptureBuffer::new()));
        assert_eq!(renderer.frame(), &before);
        renderer.clear();
        assert!(renderer.frame().is_empty());
    }
    #[test]
    fn bounds_are_padded_for_flat_curves() {
        let frame = PlotFrame {
            live: vec![[0.0, 2.0], [0.0, 2.0]],
            capture: Vec::new(),
        };
        assert_eq!(frame.bounds(), Some(((-1.0, 1.0), (1.0, 3.0))));
        assert_eq!(PlotFrame::default().bounds(), None);
    }
    #[test]
    fn extreme_values_fall_back_to_default_axes() {
        let frame = PlotFrame {
            live: vec![[0.0, 1e308], [0.1, -1e308]],
            capture: Vec::new(),
        };
        assert_eq!(frame.bounds(), None);
        let style = PlotStyle {
            width: 60,
            height: 40,
            annotate: false,
            ..PlotStyle::default()
        };
        let image = render_plot_image(&frame, &style).unwrap();
        assert_eq!(image.dimensions(), (60, 40));
    }
    #[test]
    fn rasterizes_at_requested_size() {
        let frame = PlotFrame {
            live: vec![[0.2, 1.0], [0.1, -1.0], [0.0, 0.5]],
            capture: Vec::new(),
        };
        let style = PlotStyle {
            width: 120,
            height: 80,
            annotate: false,
            ..PlotStyle::default()
        };
        let image = render_plot_image(&frame, &style).unwrap();
        assert_eq!(image.dimensions(), (120, 80));
        // the curve must have left some non-background pixels behind
        assert!(image.pixels().any(|p| p.0 != [255, 255, 255]));
    }
}
