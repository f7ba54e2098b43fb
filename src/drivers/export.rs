use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;
use image::{DynamicImage, ImageFormat};
use crate::drivers::buffer::CaptureBuffer;
use crate::drivers::error::ScopeError;
use crate::drivers::plot::{render_plot_image, PlotFrame, PlotStyle};
pub const CSV_HEADER: &str = "Time (s),Value";
/// Writes the capture as `Time (s),Value` rows with six decimals.
pub fn write_csv<W: Write>(capture: &CaptureBuffer, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for sample in capture.samples() {
        writeln!(out, "{:.6},{:.6}", sample.timestamp, sample.value)?;
    }
    out.flush()
}
/// Saves the capture to `path`. An empty capture fails before any file is
/// created.
pub fn export_csv(capture: &CaptureBuffer, path: &Path) -> Result<(), ScopeError> {
    if capture.is_empty() {
        return Err(ScopeError::NoData);
    }
    let file = File::create(path).map_err(|e| ScopeError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write_csv(capture, &mut writer).map_err(|e| ScopeError::io(path, e))?;
    log::info!("exported {} samples to {}", capture.len(), path.display());
    Ok(())
}
/// Picks the encoder from the file extension (`.png`, `.jpg`, `.jpeg`).
pub fn image_format_for(path: &Path) -> Result<ImageFormat, ScopeError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Ok(ImageFormat::Png),
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        _ => Err(ScopeError::UnsupportedImageFormat(ext)),
    }
}
pub fn encode_image(frame: &PlotFrame, style: &PlotStyle, format: ImageFormat) -> Result<Vec<u8>, ScopeError> {
    let image = render_plot_image(frame, style)?;
    let mut output = Vec::new();
    DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut output), format)?;
    Ok(output)
}
/// Renders the current plot surface and writes it to `path`.
pub fn export_image(frame: &PlotFrame, style: &PlotStyle, path: &Path) -> Result<(), ScopeError> {
    let format = image_format_for(path)?;
    let bytes = encode_image(frame, style, format)?;
    std::fs::write(path, bytes).map_err(|e| ScopeError::io(path, e))?;
    log::info!("saved plot image to {}", path.display());
    Ok(())
}
