use std::path::Path;
use crate::drivers::buffer::{CaptureBuffer, LiveWindow, Sample};
use crate::drivers::capture::{CaptureController, CaptureOutcome, CaptureState};
use crate::drivers::error::ScopeError;
use crate::drivers::export;
use crate::drivers::plot::{DisplayMode, PlotFrame, PlotRenderer, PlotStyle};
use crate::drivers::reader::{ConnectionState, SerialReader, SerialSettings};
use crate::drivers::source::LineSource;
pub const MIN_SAMPLE_RATE_HZ: u32 = 10;
pub const MAX_SAMPLE_RATE_HZ: u32 = 1000;
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 100;
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionSettings {
    pub serial: SerialSettings,
    pub live_capacity: usize,
    pub capture_duration_secs: f64,
    pub sample_rate_hz: u32,
}
/// Result of one poll tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PollReport {
    pub sample: Option<Sample>,
    /// The sample overran the capture duration and closed the capture.
    pub capture_finished: bool,
}
/// Everything the scope owns: the connection, both buffers, the capture
/// state machine, the display mode and the renderer's current frame.
pub struct ScopeSession {
    reader: SerialReader,
    live: LiveWindow,
    capture: CaptureController,
    renderer: PlotRenderer,
    mode: DisplayMode,
    sample_rate_hz: u32,
}
impl ScopeSession {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            reader: SerialReader::new(settings.serial),
            live: LiveWindow::with_capacity(settings.live_capacity),
            capture: CaptureController::new(settings.capture_duration_secs),
            renderer: PlotRenderer::new(),
            mode: DisplayMode::Live,
            sample_rate_hz: clamp_sample_rate(settings.sample_rate_hz),
        }
    }
    pub fn connection_state(&self) -> ConnectionState {
        self.reader.state()
    }
    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }
    pub fn display_mode(&self) -> DisplayMode {
        self.mode
    }
    pub fn live_window(&self) -> &LiveWindow {
        &self.live
    }
    pub fn capture_buffer(&self) -> &CaptureBuffer {
        self.capture.buffer()
    }
    pub fn frame(&self) -> &PlotFrame {
        self.renderer.frame()
    }
    pub fn capture_duration_secs(&self) -> f64 {
        self.capture.duration_secs()
    }
    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }
    pub fn connect(&mut self, port_name: &str) -> Result<(), ScopeError> {
        self.disconnect();
        self.reader.connect(port_name)?;
        self.reader.set_sample_rate(self.sample_rate_hz);
        Ok(())
    }
    pub fn attach(&mut self, name: &str, source: Box<dyn LineSource>) {
        self.disconnect();
        self.reader.attach(name, source);
        self.reader.set_sample_rate(self.sample_rate_hz);
    }
    /// Closes the connection and ends a running capture, keeping whatever it
    /// recorded so far. Returns whether a connection was open.
    pub fn disconnect(&mut self) -> bool {
        self.capture.stop();
        self.reader.disconnect()
    }
    /// One poll tick: read at most one line and feed the buffers.
    pub fn poll_once(&mut self, now: f64) -> Result<PollReport, ScopeError> {
        let sample = match self.reader.poll_once(now) {
            Ok(Some(sample)) => sample,
            Ok(None) => return Ok(PollReport::default()),
            Err(e) => {
                // reader already dropped the connection
                self.capture.stop();
                return Err(e);
            }
        };
        self.live.push(sample);
        let outcome = self.capture.offer(sample.timestamp, sample.value);
        Ok(PollReport {
            sample: Some(sample),
            capture_finished: outcome == CaptureOutcome::Finished,
        })
    }
    pub fn start_capture(&mut self, now: f64) -> Result<(), ScopeError> {
        if !self.reader.is_connected() {
            return Err(ScopeError::NotConnected);
        }
        self.capture.start(now)
    }
    /// Returns whether a capture was running.
    pub fn stop_capture(&mut self) -> bool {
        self.capture.stop()
    }
    pub fn set_capture_duration(&mut self, secs: f64) {
        self.capture.set_duration_secs(secs);
    }
    /// Advisory only; forwarded to sources that generate their own data.
    pub fn set_sample_rate(&mut self, hz: u32) {
        self.sample_rate_hz = clamp_sample_rate(hz);
        self.reader.set_sample_rate(self.sample_rate_hz);
    }
    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
    }
    /// One redraw tick. Returns whether the frame changed.
    pub fn render(&mut self) -> bool {
        self.renderer
            .render(self.mode, &self.live, self.capture.buffer())
    }
    pub fn clear(&mut self) {
        self.live.clear();
        self.capture.clear();
        self.renderer.clear();
    }
    pub fn export_csv(&self, path: &Path) -> Result<(), ScopeError> {
        export::export_csv(self.capture.buffer(), path)
    }
    pub fn export_image(&self, path: &Path, style: &PlotStyle) -> Result<(), ScopeError> {
        export::export_image(self.renderer.frame(), style, path)
    }
}
impl Default for ScopeSession {
    fn default() -> Self {
        Self::new(SessionSettings {
            serial: SerialSettings::default(),
            live_capacity: crate::drivers::buffer::DEFAULT_LIVE_CAPACITY,
            capture_duration_secs: crate::drivers::capture::DEFAULT_CAPTURE_SECONDS,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
        })
    }
}
pub fn clamp_sample_rate(hz: u32) -> u32 {
    hz.clamp(MIN_SAMPLE_RATE_HZ, MAX_SAMPLE_RATE_HZ)
}
