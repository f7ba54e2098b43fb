// src/config.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::drivers::buffer::DEFAULT_LIVE_CAPACITY;
use crate::drivers::capture::{clamp_duration, DEFAULT_CAPTURE_SECONDS};
use crate::drivers::pipeline::{clamp_sample_rate, DEFAULT_SAMPLE_RATE_HZ};
use crate::drivers::reader::DEFAULT_BAUD_RATE;
use crate::drivers::{SerialSettings, SessionSettings};
/// Environment variable that overrides the settings file location.
pub const CONFIG_ENV: &str = "SERIAL_SCOPE_CONFIG";
const CONFIG_FILE: &str = "serial_scope.json";
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub redraw_interval_ms: u64,
    pub live_capacity: usize,
    pub sample_rate_hz: u32,
    pub capture_duration_secs: f64,
    pub last_port: Option<String>,
}
impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 100,
            poll_interval_ms: 10,
            redraw_interval_ms: 50,
            live_capacity: DEFAULT_LIVE_CAPACITY,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            capture_duration_secs: DEFAULT_CAPTURE_SECONDS,
            last_port: None,
        }
    }
}
impl ScopeConfig {
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
    }
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: ScopeConfig = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config.sanitized())
    }
    /// Missing file means defaults; a broken one is reported and ignored.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("{e:#}; using default settings");
                Self::default()
            }
        }
    }
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
    pub fn sanitized(mut self) -> Self {
        self.baud_rate = self.baud_rate.max(1);
        self.poll_interval_ms = self.poll_interval_ms.max(1);
        self.redraw_interval_ms = self.redraw_interval_ms.max(1);
        self.live_capacity = self.live_capacity.max(1);
        self.sample_rate_hz = clamp_sample_rate(self.sample_rate_hz);
        self.capture_duration_secs = clamp_duration(self.capture_duration_secs);
        self
    }
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    pub fn redraw_interval(&self) -> Duration {
        Duration::from_millis(self.redraw_interval_ms)
    }
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            serial: SerialSettings {
                baud_rate: self.baud_rate,
                read_timeout: Duration::from_millis(self.read_timeout_ms),
            },
            live_capacity: self.live_capacity,
            capture_duration_secs: self.capture_duration_secs,
            sample_rate_hz: self.sample_rate_hz,
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn defaults_match_device_protocol() {
        let config = ScopeConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.read_timeout_ms, 100);
        assert_eq!(config.live_capacity, 1000);
        assert_eq!(config.poll_interval(), Duration::from_millis(10));
        assert_eq!(config.redraw_interval(), Duration::from_millis(50));
    }
    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("scope.json");
        let config = ScopeConfig {
            capture_duration_secs: 2.5,
            last_port: Some("/dev/ttyUSB0".into()),
            ..ScopeConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ScopeConfig::load(&path).unwrap(), config);
    }
    #[test]
    fn partial_file_fills_defaults_and_clamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scope.json");
        fs::write(&path, r#"{ "sample_rate_hz": 5000, "capture_duration_secs": 0.01 }"#).unwrap();
        let config = ScopeConfig::load(&path).unwrap();
        assert_eq!(config.sample_rate_hz, 1000);
        assert_eq!(config.capture_duration_secs, 0.1);
        assert_eq!(config.baud_rate, 9600);
    }
    #[test]
    fn broken_or_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.json");
        fs::write(&broken, "not json").unwrap();
        assert!(ScopeConfig::load(&broken).is_err());
        assert_eq!(ScopeConfig::load_or_default(&broken), ScopeConfig::default());
        let missing = dir.path().join("missing.json");
        assert_eq!(ScopeConfig::load_or_default(&missing), ScopeConfig::default());
    }
}
