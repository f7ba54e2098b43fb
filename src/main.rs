// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
mod config;
mod drivers;
mod engine;
mod gui;
mod types;
use config::ScopeConfig;
use eframe::egui;
// 入口函数
fn main() -> eframe::Result<()> {
    env_logger::init();
    let config_path = ScopeConfig::default_path();
    let config = ScopeConfig::load_or_default(&config_path);
    log::info!("settings from {}", config_path.display());
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1000.0, 700.0])
        .with_min_inner_size([800.0, 500.0])
        .with_title("Serial Scope");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "Serial Scope",
        options,
        Box::new(move |_cc| Box::new(gui::ScopeApp::new(config, config_path))),
    )
}
