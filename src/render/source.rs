use std::path::Path;

use image::{Rgba, RgbaImage};
use tiny_skia::{Pixmap, PremultipliedColorU8};

use super::{RenderError, RenderResult};
use crate::scene::ImageDims;

/// Decoded screenshot held as a premultiplied surface ready for drawing.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixmap: Pixmap,
}

impl SourceImage {
    pub fn from_rgba(image: &RgbaImage) -> RenderResult<Self> {
        let (width, height) = image.dimensions();
        let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::SurfaceAllocation {
            width,
            height,
        })?;
        for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
            *dst = premultiply(*src);
        }
        Ok(Self { pixmap })
    }

    pub fn decode(bytes: &[u8]) -> RenderResult<Self> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        Self::from_rgba(&image)
    }

    pub fn open(path: &Path) -> RenderResult<Self> {
        let image = image::open(path)?.to_rgba8();
        tracing::debug!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "source image decoded"
        );
        Self::from_rgba(&image)
    }

    pub fn dims(&self) -> ImageDims {
        ImageDims::new(self.pixmap.width(), self.pixmap.height())
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

fn premultiply(pixel: Rgba<u8>) -> PremultipliedColorU8 {
    let [r, g, b, a] = pixel.0;
    tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply()
}

/// Converts a rendered surface back to straight-alpha RGBA.
pub fn pixmap_to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_keeps_dimensions_and_opaque_pixels() {
        let image = RgbaImage::from_fn(3, 2, |x, y| Rgba([x as u8 * 40, y as u8 * 90, 7, 255]));
        let source = SourceImage::from_rgba(&image).expect("source");
        assert_eq!(source.dims(), ImageDims::new(3, 2));
        assert_eq!(pixmap_to_rgba(source.pixmap()), image);
    }

    #[test]
    fn translucent_pixels_are_premultiplied() {
        let image = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 0, 128]));
        let source = SourceImage::from_rgba(&image).expect("source");
        let pixel = source.pixmap().pixel(0, 0).expect("pixel");
        assert_eq!(pixel.alpha(), 128);
        assert!(pixel.red() <= 128);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            SourceImage::decode(b"not an image"),
            Err(RenderError::Decode(_))
        ));
    }

    #[test]
    fn empty_image_cannot_become_a_surface() {
        let image = RgbaImage::new(0, 0);
        assert!(matches!(
            SourceImage::from_rgba(&image),
            Err(RenderError::SurfaceAllocation { .. })
        ));
    }
}
