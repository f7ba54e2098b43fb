// src/drivers/mod.rs
// 采集、缓冲、捕获、绘图与导出
pub mod buffer;
pub mod capture;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod plot;
pub mod reader;
pub mod source;
// 公开导出常用类型
pub use capture::CaptureState;
pub use error::ScopeError;
pub use pipeline::{ScopeSession, SessionSettings};
pub use plot::{DisplayMode, PlotFrame, PlotStyle};
pub use reader::{ConnectionState, SerialSettings};
pub use source::{available_ports, SimulatedSource};
