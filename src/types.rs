// src/types.rs
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use crate::drivers::{ConnectionState, DisplayMode, PlotFrame};

// 连接模式
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum ConnectionMode {
    Hardware,
    Simulation,
}

// GUI 发给后台的命令
#[derive(Clone, Debug)]
pub enum GuiCommand {
    Connect { mode: ConnectionMode, port: String },
    Disconnect,
    StartCapture,
    StopCapture,
    SetSampleRate(u32),
    SetCaptureDuration(f64),
    SetDisplayMode(DisplayMode),
    Clear,
    ExportCsv(PathBuf),
    ExportImage(PathBuf),
}

// 后台发给 GUI 的消息
#[derive(Clone, Debug, PartialEq)]
pub enum ScopeMessage {
    Log(String),
    Status(ConnectionState),
    Capture(CaptureSummary),
    Notice(Notice),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptureSummary {
    pub capturing: bool,
    pub samples: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

// 需要用户确认的提示框
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub text: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self { level, title: title.into(), text: text.into() }
    }
}

/// Latest rendered frame, handed from the engine to the GUI. A newer frame
/// replaces one the GUI has not picked up yet.
#[derive(Clone, Default)]
pub struct FrameSlot {
    inner: Arc<Mutex<Option<PlotFrame>>>,
}

impl FrameSlot {
    pub fn publish(&self, frame: PlotFrame) {
        let mut slot = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(frame);
    }

    pub fn take(&self) -> Option<PlotFrame> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}
