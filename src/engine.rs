// src/engine.rs
use crate::config::ScopeConfig;
use crate::drivers::{
    CaptureState, ConnectionState, PlotStyle, ScopeError, ScopeSession, SimulatedSource,
};
use crate::types::*;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const SIMULATED_PORT: &str = "SIM";

/// Owns the session on the background thread. Commands arrive over a
/// channel, events go back over another, frames through the slot.
pub struct Engine {
    session: ScopeSession,
    tx: Sender<ScopeMessage>,
    frames: FrameSlot,
    image_style: PlotStyle,
    clock: Instant,
}

impl Engine {
    pub fn new(config: &ScopeConfig, tx: Sender<ScopeMessage>, frames: FrameSlot) -> Self {
        Self {
            session: ScopeSession::new(config.session_settings()),
            tx,
            frames,
            image_style: PlotStyle::default(),
            clock: Instant::now(),
        }
    }

    fn now(&self) -> f64 {
        self.clock.elapsed().as_secs_f64()
    }

    fn send(&self, msg: ScopeMessage) {
        self.tx.send(msg).ok();
    }

    fn log(&self, text: impl Into<String>) {
        self.send(ScopeMessage::Log(text.into()));
    }

    fn notice(&self, level: NoticeLevel, title: &str, text: impl Into<String>) {
        self.send(ScopeMessage::Notice(Notice::new(level, title, text)));
    }

    fn report_capture(&self) {
        self.send(ScopeMessage::Capture(CaptureSummary {
            capturing: self.session.capture_state() != CaptureState::Idle,
            samples: self.session.capture_buffer().len(),
        }));
    }

    fn report_error(&self, title: &str, err: &ScopeError) {
        let level = match err {
            ScopeError::NoData | ScopeError::AlreadyCapturing | ScopeError::NotConnected => {
                NoticeLevel::Warning
            }
            _ => NoticeLevel::Error,
        };
        self.log(format!("❌ {err}"));
        self.notice(level, title, err.to_string());
    }

    pub fn handle_command(&mut self, cmd: GuiCommand) {
        match cmd {
            GuiCommand::Connect { mode, port } => self.connect(mode, &port),
            GuiCommand::Disconnect => {
                let was_capturing = self.session.capture_state() != CaptureState::Idle;
                if self.session.disconnect() {
                    log::info!("disconnected");
                    self.log("Disconnected");
                }
                self.send(ScopeMessage::Status(ConnectionState::Disconnected));
                if was_capturing {
                    self.report_capture();
                }
            }
            GuiCommand::StartCapture => {
                let now = self.now();
                match self.session.start_capture(now) {
                    Ok(()) => {
                        let secs = self.session.capture_duration_secs();
                        log::info!("capture started for {secs} s");
                        self.log(format!("⏺ Capture started ({secs:.1} s)"));
                        self.notice(
                            NoticeLevel::Info,
                            "Capture running",
                            format!(
                                "Samples are captured for {secs:.1} seconds.\n\n\
                                 The data can be saved as CSV once the capture has ended."
                            ),
                        );
                        self.report_capture();
                    }
                    Err(e) => self.report_error("Capture", &e),
                }
            }
            GuiCommand::StopCapture => {
                if self.session.stop_capture() {
                    self.log(format!(
                        "⏹ Capture stopped, {} samples",
                        self.session.capture_buffer().len()
                    ));
                }
                self.report_capture();
            }
            GuiCommand::SetSampleRate(hz) => self.session.set_sample_rate(hz),
            GuiCommand::SetCaptureDuration(secs) => self.session.set_capture_duration(secs),
            GuiCommand::SetDisplayMode(mode) => self.session.set_display_mode(mode),
            GuiCommand::Clear => {
                self.session.clear();
                self.frames.publish(self.session.frame().clone());
                self.report_capture();
            }
            GuiCommand::ExportCsv(path) => match self.session.export_csv(&path) {
                Ok(()) => {
                    self.log(format!("💾 Saved {}", path.display()));
                    self.notice(NoticeLevel::Info, "Saved", "Data saved successfully.");
                }
                Err(e) => self.report_error("Save data", &e),
            },
            GuiCommand::ExportImage(path) => {
                match self.session.export_image(&path, &self.image_style) {
                    Ok(()) => {
                        self.log(format!("🖼 Saved {}", path.display()));
                        self.notice(NoticeLevel::Info, "Saved", "Image saved successfully.");
                    }
                    Err(e) => self.report_error("Save image", &e),
                }
            }
        }
    }

    fn connect(&mut self, mode: ConnectionMode, port: &str) {
        if self.session.connection_state() == ConnectionState::Connected {
            return;
        }
        let result = match mode {
            ConnectionMode::Simulation => {
                let source = SimulatedSource::new(self.session.sample_rate_hz());
                self.session.attach(SIMULATED_PORT, Box::new(source));
                Ok(SIMULATED_PORT.to_string())
            }
            ConnectionMode::Hardware if port.trim().is_empty() => {
                self.notice(NoticeLevel::Warning, "Connection", "No serial port selected.");
                return;
            }
            ConnectionMode::Hardware => self.session.connect(port).map(|()| port.to_string()),
        };
        match result {
            Ok(name) => {
                self.log(format!("✅ Connected to {name}"));
                self.send(ScopeMessage::Status(ConnectionState::Connected));
            }
            Err(e) => {
                self.report_error("Connection error", &e);
                self.send(ScopeMessage::Status(ConnectionState::Disconnected));
            }
        }
    }

    /// Data tick.
    pub fn poll_tick(&mut self) {
        let now = self.now();
        self.poll_at(now);
    }

    fn poll_at(&mut self, now: f64) {
        let was_capturing = self.session.capture_state() != CaptureState::Idle;
        match self.session.poll_once(now) {
            Ok(report) => {
                if report.capture_finished {
                    self.log(format!(
                        "⏹ Capture complete, {} samples",
                        self.session.capture_buffer().len()
                    ));
                    self.report_capture();
                }
            }
            Err(e) => {
                self.report_error("Serial read error", &e);
                self.send(ScopeMessage::Status(ConnectionState::Disconnected));
                if was_capturing {
                    self.report_capture();
                }
            }
        }
    }

    /// Redraw tick.
    pub fn redraw_tick(&mut self) {
        if self.session.render() {
            self.frames.publish(self.session.frame().clone());
        }
    }

    /// Runs both ticks until the GUI side of the command channel is gone.
    pub fn run(mut self, rx_cmd: Receiver<GuiCommand>, poll_every: Duration, redraw_every: Duration) {
        self.log("⚙️ Scope engine ready.");
        let mut next_poll = Instant::now();
        let mut next_redraw = Instant::now();
        loop {
            // 1. 处理 GUI 命令
            loop {
                match rx_cmd.try_recv() {
                    Ok(cmd) => self.handle_command(cmd),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.session.disconnect();
                        log::info!("engine stopped");
                        return;
                    }
                }
            }
            // 2. 定时读取与重绘
            let now = Instant::now();
            if now >= next_poll {
                self.poll_tick();
                next_poll = now + poll_every;
            }
            if now >= next_redraw {
                self.redraw_tick();
                next_redraw = now + redraw_every;
            }
            let wake = next_poll.min(next_redraw);
            thread::sleep(wake.saturating_duration_since(Instant::now()));
        }
    }
}

pub fn spawn_thread(
    config: &ScopeConfig,
    tx: Sender<ScopeMessage>,
    rx_cmd: Receiver<GuiCommand>,
    frames: FrameSlot,
) -> JoinHandle<()> {
    let engine = Engine::new(config, tx, frames);
    let (poll_every, redraw_every) = (config.poll_interval(), config.redraw_interval());
    thread::spawn(move || engine.run(rx_cmd, poll_every, redraw_every))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::source::{ManualSource, ScriptedLine};
    use std::io;
    use std::sync::mpsc::channel;

    fn engine() -> (Engine, Receiver<ScopeMessage>, FrameSlot) {
        let (tx, rx) = channel();
        let frames = FrameSlot::default();
        let engine = Engine::new(&ScopeConfig::default(), tx, frames.clone());
        (engine, rx, frames)
    }

    fn drain(rx: &Receiver<ScopeMessage>) -> Vec<ScopeMessage> {
        rx.try_iter().collect()
    }

    #[test]
    fn capture_without_connection_warns() {
        let (mut engine, rx, _) = engine();
        engine.handle_command(GuiCommand::StartCapture);
        let notices: Vec<Notice> = drain(&rx)
            .into_iter()
            .filter_map(|m| match m {
                ScopeMessage::Notice(n) => Some(n),
                _ => None,
            })
            .collect();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
    }

    #[test]
    fn empty_port_is_rejected_before_opening() {
        let (mut engine, rx, _) = engine();
        engine.handle_command(GuiCommand::Connect {
            mode: ConnectionMode::Hardware,
            port: "  ".into(),
        });
        let msgs = drain(&rx);
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ScopeMessage::Notice(n) if n.level == NoticeLevel::Warning)));
        assert!(!msgs
            .iter()
            .any(|m| *m == ScopeMessage::Status(ConnectionState::Connected)));
    }

    #[test]
    fn failed_connect_is_logged_once() {
        let (mut engine, rx, _) = engine();
        engine.handle_command(GuiCommand::Connect {
            mode: ConnectionMode::Hardware,
            port: "/dev/serial-scope-missing-port".into(),
        });
        let msgs = drain(&rx);
        let logs = msgs
            .iter()
            .filter(|m| matches!(m, ScopeMessage::Log(_)))
            .count();
        assert_eq!(logs, 1);
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ScopeMessage::Notice(n) if n.level == NoticeLevel::Error)));
        assert!(msgs.contains(&ScopeMessage::Status(ConnectionState::Disconnected)));
    }

    #[test]
    fn read_failure_reports_disconnect_once() {
        let (mut engine, rx, _) = engine();
        engine.session.attach(
            "test",
            Box::new(ManualSource::new(vec![
                ScriptedLine::Line("1.0".into()),
                ScriptedLine::Fail(io::ErrorKind::BrokenPipe),
            ])),
        );
        for i in 0..5 {
            engine.poll_at(i as f64 * 0.01);
        }
        let disconnects = drain(&rx)
            .into_iter()
            .filter(|m| *m == ScopeMessage::Status(ConnectionState::Disconnected))
            .count();
        assert_eq!(disconnects, 1);
        assert_eq!(engine.session.connection_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn redraw_publishes_frames_and_capture_end_is_reported() {
        let (mut engine, rx, frames) = engine();
        engine.session.attach("test", Box::new(ManualSource::from_lines(["1", "2", "3"])));
        engine.session.set_capture_duration(0.5);
        engine.session.start_capture(0.0).unwrap();
        engine.poll_at(0.1);
        engine.poll_at(0.2);
        engine.redraw_tick();
        let frame = frames.take().unwrap();
        assert_eq!(frame.live.len(), 2);
        engine.poll_at(1.0);
        let msgs = drain(&rx);
        assert!(msgs.contains(&ScopeMessage::Capture(CaptureSummary {
            capturing: false,
            samples: 2,
        })));
    }

    #[test]
    fn export_without_data_warns() {
        let (mut engine, rx, _) = engine();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        engine.handle_command(GuiCommand::ExportCsv(path.clone()));
        assert!(!path.exists());
        assert!(drain(&rx).iter().any(|m| matches!(
            m,
            ScopeMessage::Notice(n) if n.level == NoticeLevel::Warning
        )));
    }

    #[test]
    fn simulation_connects_and_produces_samples() {
        let (mut engine, rx, _) = engine();
        engine.handle_command(GuiCommand::Connect {
            mode: ConnectionMode::Simulation,
            port: String::new(),
        });
        assert!(drain(&rx).contains(&ScopeMessage::Status(ConnectionState::Connected)));
        engine.poll_tick();
        assert_eq!(engine.session.live_window().len(), 1);
        engine.handle_command(GuiCommand::Disconnect);
        assert_eq!(engine.session.connection_state(), ConnectionState::Disconnected);
    }
}
