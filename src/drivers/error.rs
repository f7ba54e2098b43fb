use std::path::PathBuf;
use thiserror::Error;
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("cannot open serial port {port}: {source}")]
    Connect {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("serial read failed: {0}")]
    SerialIo(#[from] std::io::Error),
    #[error("a capture is already running")]
    AlreadyCapturing,
    #[error("not connected to a serial device")]
    NotConnected,
    #[error("capture buffer is empty; nothing to export")]
    NoData,
    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported image format {0:?}; use .png or .jpg")]
    UnsupportedImageFormat(String),
    #[error("failed to render plot: {0}")]
    Plot(String),
}
impl ScopeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScopeError::Io {
            path: path.into(),
            source,
        }
    }
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for ScopeError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        ScopeError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for ScopeError {
    fn from(value: image::ImageError) -> Self {
        ScopeError::Plot(value.to_string())
    }
}
