use std::collections::VecDeque;
/// Number of samples kept for the live view.
pub const DEFAULT_LIVE_CAPACITY: usize = 1000;
/// One parsed reading. `timestamp` is seconds on the engine clock for live
/// samples and seconds since capture start for captured ones.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub timestamp: f64,
    pub value: f64,
}
impl Sample {
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }
}
/// Rolling window of the most recent samples, oldest evicted first.
pub struct LiveWindow {
    samples: VecDeque<Sample>,
    capacity: usize,
}
impl LiveWindow {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn push(&mut self, sample: Sample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
impl Default for LiveWindow {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LIVE_CAPACITY)
    }
}
/// Samples recorded during one capture session, keyed by elapsed seconds.
#[derive(Clone, Debug, Default)]
pub struct CaptureBuffer {
    samples: Vec<Sample>,
}
impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn push(&mut self, elapsed: f64, value: f64) {
        self.samples.push(Sample::new(elapsed, value));
    }
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
