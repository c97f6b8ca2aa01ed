//! Offscreen export: renders the scene at the export multiplier and encodes it.
//!
//! Export only reads the [`Scene`]; a failed or cancelled export leaves it
//! exactly as it was.

pub mod sink;
pub mod worker;

use std::io;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use thiserror::Error;
use tiny_skia::Pixmap;

use crate::render::{
    device_size, pixmap_to_rgba, Compositor, RenderError, RenderOptions, SourceImage,
};
use crate::scene::{ExportFormat, ExportSettings, Scene};

pub use sink::{ExportSink, FileExportSink};
pub use worker::{ExportJob, JobStatus};

/// Longest device-pixel edge an export surface may have.
pub const MAX_EXPORT_DIMENSION: u32 = 16_384;
const EXPORT_BASENAME: &str = "screenshot";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export surface {width}x{height} exceeds the {max}px limit")]
    SurfaceTooLarge { width: u32, height: u32, max: u32 },
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("encode failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("export cancelled")]
    Cancelled,
    #[error("export worker exited without a result")]
    WorkerDisconnected,
}

pub type ExportResult<T> = std::result::Result<T, ExportError>;

/// Encoded export ready to hand to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    pub bytes: Vec<u8>,
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
}

impl ExportedImage {
    pub fn file_name(&self) -> String {
        export_file_name(self.format)
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

pub fn export_file_name(format: ExportFormat) -> String {
    format!("{EXPORT_BASENAME}.{}", format.extension())
}

/// Renders `scene` with every layer at the settings' multiplier and encodes it.
pub fn export(
    compositor: &mut Compositor,
    scene: &Scene,
    source: &SourceImage,
    settings: &ExportSettings,
) -> ExportResult<ExportedImage> {
    let pixel_ratio = settings.multiplier.factor();
    let (canvas_width, canvas_height) = scene.canvas_size(source.dims());
    let (width, height) = device_size(canvas_width, canvas_height, pixel_ratio);
    if width > MAX_EXPORT_DIMENSION || height > MAX_EXPORT_DIMENSION {
        tracing::warn!(width, height, "export surface too large");
        return Err(ExportError::SurfaceTooLarge {
            width,
            height,
            max: MAX_EXPORT_DIMENSION,
        });
    }

    tracing::info!(
        width,
        height,
        format = settings.format.extension(),
        pixel_ratio,
        "export started"
    );
    let (pixmap, _) = compositor.render_to_pixmap(
        scene,
        source,
        RenderOptions {
            pixel_ratio,
            include_texts: true,
        },
    )?;
    let bytes = encode(&pixmap, settings.format, settings.jpeg_quality())?;
    tracing::info!(bytes = bytes.len(), "export finished");
    Ok(ExportedImage {
        bytes,
        format: settings.format,
        width: pixmap.width(),
        height: pixmap.height(),
    })
}

/// Encodes a rendered surface; JPEG quality is clamped to the supported range.
pub fn encode(pixmap: &Pixmap, format: ExportFormat, quality: f32) -> ExportResult<Vec<u8>> {
    let mut bytes = Vec::new();
    let (width, height) = (pixmap.width(), pixmap.height());
    match format {
        ExportFormat::Png => {
            let rgba = pixmap_to_rgba(pixmap);
            PngEncoder::new(&mut bytes).write_image(
                rgba.as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            )?;
        }
        ExportFormat::Jpeg => {
            // Premultiplied channels without alpha are the image over black.
            let rgb: Vec<u8> = pixmap
                .pixels()
                .iter()
                .flat_map(|pixel| [pixel.red(), pixel.green(), pixel.blue()])
                .collect();
            JpegEncoder::new_with_quality(&mut bytes, jpeg_quality_percent(quality)).write_image(
                &rgb,
                width,
                height,
                ExtendedColorType::Rgb8,
            )?;
        }
    }
    Ok(bytes)
}

fn jpeg_quality_percent(quality: f32) -> u8 {
    let clamped = crate::scene::sizing::clamp_quality(quality);
    (clamped * 100.0).round().clamp(1.0, 100.0) as u8
}
