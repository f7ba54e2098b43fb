use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use rand::Rng;
use serialport::SerialPort;
use crate::drivers::ScopeError;
/// Most unread bytes held between polls. Past this the oldest lines go.
const MAX_PENDING_BYTES: usize = 4096;
/// Something that yields newline-terminated text lines without blocking.
pub trait LineSource: Send {
    /// Next complete line, terminator included, or `None` if nothing is
    /// buffered yet.
    fn poll_line(&mut self) -> io::Result<Option<String>>;
    /// Hint for sources that generate data themselves. Hardware ignores it.
    fn set_sample_rate(&mut self, _hz: u32) {}
}
/// Parses one protocol line. Anything that is not a single decimal number is
/// dropped.
pub fn parse_sample_line(line: &str) -> Option<f64> {
    let value = line.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}
fn take_line(pending: &mut Vec<u8>) -> Option<String> {
    let end = pending.iter().position(|&b| b == b'\n')?;
    let raw: Vec<u8> = pending.drain(..=end).collect();
    Some(String::from_utf8_lossy(&raw).into_owned())
}
/// Cuts whole lines off the front until `pending` fits the cap. A run with
/// no terminator that alone exceeds the cap is dropped entirely.
fn trim_backlog(pending: &mut Vec<u8>) {
    let excess = pending.len().saturating_sub(MAX_PENDING_BYTES);
    if excess == 0 {
        return;
    }
    let start = excess - 1;
    match pending[start..].iter().position(|&b| b == b'\n') {
        Some(offset) => {
            let dropped: Vec<u8> = pending.drain(..=start + offset).collect();
            let lines = dropped.iter().filter(|&&b| b == b'\n').count();
            log::debug!("serial backlog full, dropped {lines} oldest lines");
        }
        None => {
            log::debug!("dropping {} bytes without line terminator", pending.len());
            pending.clear();
        }
    }
}
/// The byte-level calls the line source makes on a port.
pub trait PortIo: Send {
    fn bytes_to_read(&self) -> io::Result<u32>;
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}
impl PortIo for Box<dyn SerialPort> {
    fn bytes_to_read(&self) -> io::Result<u32> {
        SerialPort::bytes_to_read(self.as_ref()).map_err(io::Error::from)
    }
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self, buf)
    }
}
/// Serial-port backed source.
pub struct SerialLineSource<P = Box<dyn SerialPort>> {
    port: P,
    pending: Vec<u8>,
}
impl SerialLineSource {
    pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> Result<Self, ScopeError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|source| ScopeError::Connect {
                port: port_name.to_string(),
                source,
            })?;
        Ok(Self::with_port(port))
    }
}
impl<P: PortIo> SerialLineSource<P> {
    pub fn with_port(port: P) -> Self {
        Self {
            port,
            pending: Vec::new(),
        }
    }
    /// Moves whatever the port has queued into `pending`. Never blocks on an
    /// empty port.
    fn fill(&mut self) -> io::Result<()> {
        let waiting = self.port.bytes_to_read()? as usize;
        if waiting == 0 {
            return Ok(());
        }
        let mut chunk = vec![0u8; waiting];
        match self.port.read(&mut chunk) {
            Ok(0) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "serial port returned no data",
            )),
            Ok(n) => {
                self.pending.extend_from_slice(&chunk[..n]);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(()),
            Err(e) => Err(e),
        }
    }
}
impl<P: PortIo> LineSource for SerialLineSource<P> {
    fn poll_line(&mut self) -> io::Result<Option<String>> {
        // drain the port every tick so a fast device costs old lines, not latency
        self.fill()?;
        trim_backlog(&mut self.pending);
        Ok(take_line(&mut self.pending))
    }
}
/// Names of the serial ports the OS reports, sorted.
pub fn available_ports() -> Vec<String> {
    let mut ports: Vec<String> = match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            log::warn!("failed to enumerate serial ports: {e}");
            Vec::new()
        }
    };
    ports.sort();
    ports
}
/// One scripted step for [`ManualSource`].
#[derive(Clone, Debug)]
pub enum ScriptedLine {
    Line(String),
    Idle,
    Fail(io::ErrorKind),
}
/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<ScriptedLine>,
    polls: Arc<AtomicUsize>,
}
impl ManualSource {
    pub fn new(steps: impl IntoIterator<Item = ScriptedLine>) -> Self {
        Self {
            queue: steps.into_iter().collect(),
            polls: Arc::new(AtomicUsize::new(0)),
        }
    }
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(lines.into_iter().map(|l| ScriptedLine::Line(l.to_string())))
    }
    /// Shared counter of `poll_line` calls, readable after the source has
    /// been handed over.
    pub fn poll_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.polls)
    }
}
impl LineSource for ManualSource {
    fn poll_line(&mut self) -> io::Result<Option<String>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        match self.queue.pop_front() {
            Some(ScriptedLine::Line(line)) => Ok(Some(line)),
            Some(ScriptedLine::Fail(kind)) => Err(io::Error::new(kind, "scripted failure")),
            Some(ScriptedLine::Idle) | None => Ok(None),
        }
    }
}
/// Stand-in device that prints a noisy sine wave, one value per line.
pub struct SimulatedSource {
    started: Instant,
    next_due: Instant,
    period: Duration,
    frequency_hz: f64,
}
impl SimulatedSource {
    pub fn new(sample_rate_hz: u32) -> Self {
        let now = Instant::now();
        Self {
            started: now,
            next_due: now,
            period: rate_to_period(sample_rate_hz),
            frequency_hz: 1.0,
        }
    }
    fn value_at(&self, t: f64) -> f64 {
        let noise: f64 = rand::thread_rng().gen_range(-0.05..0.05);
        (std::f64::consts::TAU * self.frequency_hz * t).sin() + noise
    }
}
fn rate_to_period(hz: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(hz.max(1)))
}
impl LineSource for SimulatedSource {
    fn poll_line(&mut self) -> io::Result<Option<String>> {
        let now = Instant::now();
        if now < self.next_due {
            return Ok(None);
        }
        // one line per poll; a backlog is skipped rather than replayed
        self.next_due += self.period;
        if self.next_due < now {
            self.next_due = now + self.period;
        }
        let t = now.duration_since(self.started).as_secs_f64();
        Ok(Some(format!("{:.4}\r\n", self.value_at(t))))
    }
    fn set_sample_rate(&mut self, hz: u32) {
        self.period = rate_to_period(hz);
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn parses_numeric_lines_only() {
        assert_eq!(parse_sample_line("1.5"), Some(1.5));
        assert_eq!(parse_sample_line("  -2.25\r\n"), Some(-2.25));
        assert_eq!(parse_sample_line("1e3"), Some(1000.0));
        assert_eq!(parse_sample_line(""), None);
        assert_eq!(parse_sample_line("abc"), None);
        assert_eq!(parse_sample_line("1.0,2.0"), None);
        assert_eq!(parse_sample_line("NaN"), None);
        assert_eq!(parse_sample_line("inf"), None);
    }
    #[test]
    fn take_line_keeps_partial_tail() {
        let mut pending = b"1.0\n2.".to_vec();
        assert_eq!(take_line(&mut pending).as_deref(), Some("1.0\n"));
        assert_eq!(take_line(&mut pending), None);
        pending.extend_from_slice(b"5\r\n");
        assert_eq!(take_line(&mut pending).as_deref(), Some("2.5\r\n"));
        assert!(pending.is_empty());
    }
    #[test]
    fn invalid_utf8_becomes_unparseable_text() {
        let mut pending = vec![0xff, 0xfe, b'\n'];
        let line = take_line(&mut pending).unwrap();
        assert_eq!(parse_sample_line(&line), None);
    }
    #[derive(Default)]
    struct FakePort {
        incoming: Vec<u8>,
        fail: Option<io::ErrorKind>,
        eof: bool,
        reads: usize,
    }
    impl PortIo for FakePort {
        fn bytes_to_read(&self) -> io::Result<u32> {
            Ok(self.incoming.len() as u32)
        }
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads += 1;
            if let Some(kind) = self.fail.take() {
                return Err(kind.into());
            }
            if self.eof {
                return Ok(0);
            }
            let n = buf.len().min(self.incoming.len());
            buf[..n].copy_from_slice(&self.incoming[..n]);
            self.incoming.drain(..n);
            Ok(n)
        }
    }
    #[test]
    fn serial_source_reads_only_when_bytes_are_waiting() {
        let mut source = SerialLineSource::with_port(FakePort::default());
        assert_eq!(source.poll_line().unwrap(), None);
        assert_eq!(source.port.reads, 0);
    }
    #[test]
    fn serial_source_joins_partial_lines() {
        let mut source = SerialLineSource::with_port(FakePort::default());
        source.port.incoming.extend_from_slice(b"1.2");
        assert_eq!(source.poll_line().unwrap(), None);
        source.port.incoming.extend_from_slice(b"5\r\n3");
        assert_eq!(source.poll_line().unwrap().as_deref(), Some("1.25\r\n"));
        assert_eq!(source.poll_line().unwrap(), None);
        assert_eq!(source.pending, b"3");
    }
    #[test]
    fn serial_source_treats_timeout_as_no_data() {
        let mut source = SerialLineSource::with_port(FakePort {
            incoming: b"7\n".to_vec(),
            fail: Some(io::ErrorKind::TimedOut),
            ..FakePort::default()
        });
        assert_eq!(source.poll_line().unwrap(), None);
        assert_eq!(source.poll_line().unwrap().as_deref(), Some("7\n"));
    }
    #[test]
    fn serial_source_reports_empty_read_as_eof() {
        let mut source = SerialLineSource::with_port(FakePort {
            incoming: b"1\n".to_vec(),
            eof: true,
            ..FakePort::default()
        });
        assert_eq!(
            source.poll_line().unwrap_err().kind(),
            io::ErrorKind::UnexpectedEof
        );
    }
    #[test]
    fn serial_source_drops_overlong_unterminated_run() {
        let mut source = SerialLineSource::with_port(FakePort::default());
        source.port.incoming = vec![b'9'; MAX_PENDING_BYTES + 10];
        assert_eq!(source.poll_line().unwrap(), None);
        assert!(source.pending.is_empty());
        source.port.incoming.extend_from_slice(b"2\n");
        assert_eq!(source.poll_line().unwrap().as_deref(), Some("2\n"));
    }
    #[test]
    fn fast_device_backlog_stays_bounded() {
        // 19 short lines per 10 polls against one line taken per poll
        let mut source = SerialLineSource::with_port(FakePort::default());
        let mut taken = 0;
        for poll in 0..6000 {
            if poll % 10 == 0 {
                for _ in 0..19 {
                    source.port.incoming.extend_from_slice(b"512\r\n");
                }
            }
            if let Some(line) = source.poll_line().unwrap() {
                assert_eq!(parse_sample_line(&line), Some(512.0));
                taken += 1;
            }
            assert!(source.pending.len() <= MAX_PENDING_BYTES);
            assert!(source.port.incoming.is_empty());
        }
        assert_eq!(taken, 6000);
    }
    #[test]
    fn backlog_keeps_newest_lines() {
        let mut source = SerialLineSource::with_port(FakePort::default());
        let burst: String = (0..2000).map(|i| format!("{i}\n")).collect();
        source.port.incoming = burst.into_bytes();
        let mut lines = Vec::new();
        while let Some(line) = source.poll_line().unwrap() {
            lines.push(line);
        }
        assert_ne!(lines.first().map(String::as_str), Some("0\n"));
        assert_eq!(lines.last().map(String::as_str), Some("1999\n"));
        assert!(lines.iter().map(String::len).sum::<usize>() <= MAX_PENDING_BYTES);
        // survivors are whole, consecutive lines
        let values: Vec<f64> = lines.iter().filter_map(|l| parse_sample_line(l)).collect();
        assert_eq!(values.len(), lines.len());
        assert!(values.windows(2).all(|w| w[1] == w[0] + 1.0));
    }
    #[test]
    fn manual_source_plays_script_and_counts_polls() {
        let mut source = ManualSource::new(vec![
            ScriptedLine::Line("1".into()),
            ScriptedLine::Idle,
            ScriptedLine::Fail(io::ErrorKind::BrokenPipe),
        ]);
        let polls = source.poll_counter();
        assert_eq!(source.poll_line().unwrap().as_deref(), Some("1"));
        assert_eq!(source.poll_line().unwrap(), None);
        assert_eq!(
            source.poll_line().unwrap_err().kind(),
            io::ErrorKind::BrokenPipe
        );
        assert_eq!(source.poll_line().unwrap(), None);
        assert_eq!(polls.load(Ordering::SeqCst), 4);
    }
    #[test]
    fn simulated_source_emits_parseable_lines() {
        let mut source = SimulatedSource::new(1000);
        let line = source.poll_line().unwrap().unwrap();
        let value = parse_sample_line(&line).unwrap();
        assert!(value.abs() <= 1.1);
    }
}
