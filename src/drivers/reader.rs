use std::time::Duration;
use crate::drivers::buffer::Sample;
use crate::drivers::error::ScopeError;
use crate::drivers::source::{parse_sample_line, LineSource, SerialLineSource};
pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SerialSettings {
    pub baud_rate: u32,
    pub read_timeout: Duration,
}
impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}
/// Owns the single device connection. The connection state is derived from
/// whether a source is attached, so the two cannot disagree.
pub struct SerialReader {
    settings: SerialSettings,
    source: Option<Box<dyn LineSource>>,
    port_name: Option<String>,
}
impl SerialReader {
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            settings,
            source: None,
            port_name: None,
        }
    }
    pub fn state(&self) -> ConnectionState {
        if self.source.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }
    /// Opens `port_name` with the configured baud rate and read timeout.
    pub fn connect(&mut self, port_name: &str) -> Result<(), ScopeError> {
        let source = SerialLineSource::open(
            port_name,
            self.settings.baud_rate,
            self.settings.read_timeout,
        )?;
        log::info!(
            "opened {port_name} at {} baud",
            self.settings.baud_rate
        );
        self.attach(port_name, Box::new(source));
        Ok(())
    }
    /// Connects to an already constructed source, replacing any previous one.
    pub fn attach(&mut self, name: &str, source: Box<dyn LineSource>) {
        self.source = Some(source);
        self.port_name = Some(name.to_string());
    }
    /// Returns whether a connection was open.
    pub fn disconnect(&mut self) -> bool {
        self.port_name = None;
        self.source.take().is_some()
    }
    pub fn set_sample_rate(&mut self, hz: u32) {
        if let Some(source) = self.source.as_mut() {
            source.set_sample_rate(hz);
        }
    }
    /// Reads at most one line. Lines that are not a number yield `Ok(None)`.
    /// An I/O error closes the connection before it is returned.
    pub fn poll_once(&mut self, now: f64) -> Result<Option<Sample>, ScopeError> {
        let Some(source) = self.source.as_mut() else {
            return Ok(None);
        };
        match source.poll_line() {
            Ok(Some(line)) => Ok(parse_sample_line(&line).map(|value| Sample::new(now, value))),
            Ok(None) => Ok(None),
            Err(e) => {
                log::error!(
                    "read error on {}: {e}",
                    self.port_name.as_deref().unwrap_or("serial port")
                );
                self.disconnect();
                Err(ScopeError::SerialIo(e))
            }
        }
    }
}
impl Default for SerialReader {
    fn default() -> Self {
        Self::new(SerialSettings::default())
    }
}
