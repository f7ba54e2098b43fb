// src/gui.rs
use crate::config::ScopeConfig;
use crate::drivers::{available_ports, ConnectionState, DisplayMode, PlotFrame};
use crate::engine;
use crate::types::*;
use eframe::egui;
use egui::Color32;
use egui_plot::{Legend, Line, Plot, PlotPoints};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};

const MAX_LOG_LINES: usize = 200;

pub struct ScopeApp {
    // 配置
    config: ScopeConfig,
    config_path: PathBuf,

    // 系统状态
    connection: ConnectionState,
    connection_mode: ConnectionMode,
    capture: CaptureSummary,
    real_time: bool,

    // 当前曲线
    frame: PlotFrame,

    // 端口管理
    available_ports: Vec<String>,
    selected_port: String,

    // 界面日志与提示
    log_messages: Vec<String>,
    notice: Option<Notice>,

    // 通讯管道
    rx: Receiver<ScopeMessage>,
    tx_cmd: Sender<GuiCommand>,
    frames: FrameSlot,
}

impl ScopeApp {
    pub fn new(config: ScopeConfig, config_path: PathBuf) -> Self {
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();
        let frames = FrameSlot::default();

        // 启动后台引擎
        engine::spawn_thread(&config, tx, rx_cmd, frames.clone());

        let available_ports = available_ports();
        let selected_port = config
            .last_port
            .clone()
            .filter(|p| available_ports.contains(p))
            .or_else(|| available_ports.first().cloned())
            .unwrap_or_default();

        Self {
            config,
            config_path,
            connection: ConnectionState::Disconnected,
            connection_mode: ConnectionMode::Hardware,
            capture: CaptureSummary::default(),
            real_time: true,
            frame: PlotFrame::default(),
            available_ports,
            selected_port,
            log_messages: vec!["Serial Scope ready.".to_owned()],
            notice: None,
            rx,
            tx_cmd,
            frames,
        }
    }

    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > MAX_LOG_LINES {
            self.log_messages.remove(0);
        }
    }

    fn send(&self, cmd: GuiCommand) {
        if self.tx_cmd.send(cmd).is_err() {
            log::error!("engine thread is gone");
        }
    }

    fn persist_config(&self) {
        if let Err(e) = self.config.save(&self.config_path) {
            log::warn!("{e:#}");
        }
    }

    fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    // 刷新端口列表
    fn refresh_ports(&mut self) {
        self.available_ports = available_ports();
        if !self.available_ports.contains(&self.selected_port) {
            self.selected_port = self.available_ports.first().cloned().unwrap_or_default();
        }
        self.log(&format!("Ports: {:?}", self.available_ports));
    }

    fn drain_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                ScopeMessage::Log(s) => self.log(&s),
                ScopeMessage::Status(state) => self.connection = state,
                ScopeMessage::Capture(summary) => self.capture = summary,
                ScopeMessage::Notice(notice) => self.notice = Some(notice),
            }
        }
        if let Some(frame) = self.frames.take() {
            self.frame = frame;
        }
    }

    fn serial_group(&mut self, ui: &mut egui::Ui) {
        let connected = self.is_connected();
        ui.vertical(|ui| {
            ui.strong("Serial connection");
            ui.add_enabled_ui(!connected, |ui| {
                ui.horizontal(|ui| {
                    ui.selectable_value(&mut self.connection_mode, ConnectionMode::Hardware, "Device");
                    ui.selectable_value(&mut self.connection_mode, ConnectionMode::Simulation, "Simulated");
                });
                ui.horizontal(|ui| {
                    ui.label("Port:");
                    egui::ComboBox::from_id_source("port_select")
                        .selected_text(self.selected_port.as_str())
                        .show_ui(ui, |ui| {
                            for port in &self.available_ports {
                                ui.selectable_value(&mut self.selected_port, port.clone(), port.as_str());
                            }
                        });
                    if ui.button("Refresh").clicked() {
                        self.refresh_ports();
                    }
                });
            });
            let btn_txt = if connected { "Disconnect" } else { "Connect" };
            if ui.button(btn_txt).clicked() {
                if connected {
                    self.send(GuiCommand::Disconnect);
                } else {
                    self.send(GuiCommand::Connect {
                        mode: self.connection_mode,
                        port: self.selected_port.clone(),
                    });
                    if self.connection_mode == ConnectionMode::Hardware && !self.selected_port.is_empty() {
                        self.config.last_port = Some(self.selected_port.clone());
                        self.persist_config();
                    }
                }
            }
        });
    }

    fn acquisition_group(&mut self, ui: &mut egui::Ui) {
        ui.vertical(|ui| {
            ui.strong("Acquisition");
            egui::Grid::new("acquisition_grid").show(ui, |ui| {
                ui.label("Sample rate:");
                let rate = ui.add(
                    egui::DragValue::new(&mut self.config.sample_rate_hz)
                        .clamp_range(10..=1000)
                        .suffix(" Hz"),
                );
                ui.end_row();
                ui.label("Capture duration:");
                let duration = ui.add(
                    egui::DragValue::new(&mut self.config.capture_duration_secs)
                        .clamp_range(0.1..=60.0)
                        .speed(0.1)
                        .fixed_decimals(1)
                        .suffix(" s"),
                );
                ui.end_row();
                if rate.changed() {
                    self.send(GuiCommand::SetSampleRate(self.config.sample_rate_hz));
                }
                if duration.changed() {
                    self.send(GuiCommand::SetCaptureDuration(self.config.capture_duration_secs));
                }
                if rate.drag_released() || duration.drag_released() || rate.lost_focus() || duration.lost_focus() {
                    self.persist_config();
                }
            });
        });
    }

    fn display_group(&mut self, ui: &mut egui::Ui) {
        let connected = self.is_connected();
        let can_save = !self.capture.capturing && self.capture.samples > 0;
        ui.vertical(|ui| {
            ui.strong("Display");
            ui.horizontal(|ui| {
                if ui.checkbox(&mut self.real_time, "Real time").changed() {
                    let mode = if self.real_time { DisplayMode::Live } else { DisplayMode::CaptureView };
                    self.send(GuiCommand::SetDisplayMode(mode));
                }
                let capture_txt = if self.capture.capturing { "Stop" } else { "Capture" };
                if ui.add_enabled(connected, egui::Button::new(capture_txt)).clicked() {
                    if self.capture.capturing {
                        self.send(GuiCommand::StopCapture);
                    } else {
                        self.send(GuiCommand::StartCapture);
                    }
                }
            });
            ui.horizontal(|ui| {
                if ui.add_enabled(can_save, egui::Button::new("Save CSV")).clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("CSV files", &["csv"])
                        .set_file_name("capture.csv")
                        .save_file()
                    {
                        self.send(GuiCommand::ExportCsv(path));
                    }
                }
                if ui.button("Clear").clicked() {
                    self.frame = PlotFrame::default();
                    self.send(GuiCommand::Clear);
                }
                if ui.button("Save image").clicked() {
                    if let Some(path) = rfd::FileDialog::new()
                        .add_filter("PNG images", &["png"])
                        .add_filter("JPG images", &["jpg", "jpeg"])
                        .set_file_name("plot.png")
                        .save_file()
                    {
                        self.send(GuiCommand::ExportImage(path));
                    }
                }
            });
        });
    }

    fn show_notice(&mut self, ctx: &egui::Context) {
        let Some(notice) = &self.notice else {
            return;
        };
        let color = match notice.level {
            NoticeLevel::Info => Color32::from_rgb(20, 60, 180),
            NoticeLevel::Warning => Color32::from_rgb(200, 130, 0),
            NoticeLevel::Error => Color32::RED,
        };
        let mut dismissed = false;
        egui::Window::new(notice.title.as_str())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(egui::RichText::new(notice.text.as_str()).color(color));
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.notice = None;
        }
    }
}

impl eframe::App for ScopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 1. 消息处理
        self.drain_messages();
        ctx.request_repaint_after(self.config.redraw_interval());

        ctx.set_visuals(egui::Visuals::light());

        // 2. 控制面板
        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.group(|ui| self.serial_group(ui));
                ui.group(|ui| self.acquisition_group(ui));
                ui.group(|ui| self.display_group(ui));
            });
            ui.add_space(6.0);
        });

        egui::TopBottomPanel::bottom("log").resizable(true).default_height(90.0).show(ctx, |ui| {
            ui.horizontal(|ui| {
                let status = if self.is_connected() { "● Connected" } else { "○ Disconnected" };
                ui.label(status);
                if self.capture.capturing {
                    ui.label(egui::RichText::new("Capturing…").color(Color32::RED));
                } else if self.capture.samples > 0 {
                    ui.label(format!("Captured {} samples", self.capture.samples));
                }
            });
            egui::ScrollArea::vertical().stick_to_bottom(true).show(ui, |ui| {
                for m in &self.log_messages {
                    ui.monospace(m);
                }
            });
        });

        // 3. 绘图区
        egui::CentralPanel::default().show(ctx, |ui| {
            Plot::new("scope_plot")
                .legend(Legend::default())
                .x_axis_label("Time (s)")
                .y_axis_label("Amplitude")
                .show(ui, |plot_ui| {
                    if !self.frame.live.is_empty() {
                        plot_ui.line(
                            Line::new(PlotPoints::new(self.frame.live.clone()))
                                .color(Color32::BLUE)
                                .width(2.0)
                                .name("Live"),
                        );
                    }
                    if !self.frame.capture.is_empty() {
                        plot_ui.line(
                            Line::new(PlotPoints::new(self.frame.capture.clone()))
                                .color(Color32::RED)
                                .width(2.0)
                                .name("Capture"),
                        );
                    }
                });
        });

        self.show_notice(ctx);
    }
}
