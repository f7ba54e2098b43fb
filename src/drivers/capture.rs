use crate::drivers::buffer::CaptureBuffer;
use crate::drivers::error::ScopeError;
pub const MIN_CAPTURE_SECONDS: f64 = 0.1;
pub const MAX_CAPTURE_SECONDS: f64 = 60.0;
pub const DEFAULT_CAPTURE_SECONDS: f64 = 5.0;
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CaptureState {
    Idle,
    Capturing { started_at: f64 },
}
/// What happened to a sample offered to the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureOutcome {
    NotCapturing,
    Recorded,
    /// The sample fell past the configured duration; it was dropped and the
    /// capture ended.
    Finished,
}
/// Timed capture session. Ending is driven by sample arrival: the first
/// sample past the duration closes the session.
pub struct CaptureController {
    state: CaptureState,
    duration_secs: f64,
    buffer: CaptureBuffer,
}
impl CaptureController {
    pub fn new(duration_secs: f64) -> Self {
        Self {
            state: CaptureState::Idle,
            duration_secs: clamp_duration(duration_secs),
            buffer: CaptureBuffer::new(),
        }
    }
    pub fn state(&self) -> CaptureState {
        self.state
    }
    pub fn is_capturing(&self) -> bool {
        matches!(self.state, CaptureState::Capturing { .. })
    }
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }
    pub fn set_duration_secs(&mut self, secs: f64) {
        self.duration_secs = clamp_duration(secs);
    }
    pub fn buffer(&self) -> &CaptureBuffer {
        &self.buffer
    }
    pub fn start(&mut self, now: f64) -> Result<(), ScopeError> {
        if self.is_capturing() {
            return Err(ScopeError::AlreadyCapturing);
        }
        self.buffer.clear();
        self.state = CaptureState::Capturing { started_at: now };
        Ok(())
    }
    /// Returns whether a capture was running.
    pub fn stop(&mut self) -> bool {
        let was_capturing = self.is_capturing();
        self.state = CaptureState::Idle;
        was_capturing
    }
    pub fn offer(&mut self, now: f64, value: f64) -> CaptureOutcome {
        let CaptureState::Capturing { started_at } = self.state else {
            return CaptureOutcome::NotCapturing;
        };
        let elapsed = (now - started_at).max(0.0);
        if elapsed <= self.duration_secs {
            self.buffer.push(elapsed, value);
            CaptureOutcome::Recorded
        } else {
            self.state = CaptureState::Idle;
            CaptureOutcome::Finished
        }
    }
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
impl Default for CaptureController {
    fn default() -> Self {
        Self::new(DEFAULT_CAPTURE_SECONDS)
    }
}
pub fn clamp_duration(secs: f64) -> f64 {
    if secs.is_nan() {
        return DEFAULT_CAPTURE_SECONDS;
    }
    secs.clamp(MIN_CAPTURE_SECONDS, MAX_CAPTURE_SECONDS)
}
