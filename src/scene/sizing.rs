use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

pub const PADDING_MAX: u32 = 200;
pub const SCALE_FACTOR_MIN: f32 = 0.10;
pub const SCALE_FACTOR_MAX: f32 = 3.00;
pub const CUSTOM_CANVAS_MIN: u32 = 320;
pub const CUSTOM_CANVAS_MAX: u32 = 6000;
/// Widest explicit target width; matches the largest exportable edge.
pub const TARGET_WIDTH_MAX: u32 = 16_384;
pub const JPEG_QUALITY_MIN: f32 = 0.6;
pub const JPEG_QUALITY_MAX: f32 = 1.0;

/// Natural pixel size of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDims {
    pub width: u32,
    pub height: u32,
}

impl ImageDims {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn full_crop(self) -> CropRect {
        CropRect {
            x: 0,
            y: 0,
            w: if self.width == 0 { 1 } else { self.width },
            h: if self.height == 0 { 1 } else { self.height },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Padding {
    pub x: u32,
    pub y: u32,
}

impl Padding {
    pub fn new(x: i64, y: i64) -> Self {
        Self {
            x: clamp_padding(x),
            y: clamp_padding(y),
        }
    }
}

impl Default for Padding {
    fn default() -> Self {
        Self { x: 64, y: 64 }
    }
}

fn clamp_padding(value: i64) -> u32 {
    u32::try_from(value.clamp(0, i64::from(PADDING_MAX))).unwrap_or(0)
}

/// Crop region in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl CropRect {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Rounds and clamps `rect` into `dims`; keeps at least one pixel per side.
    pub fn clamped(rect: Rect, dims: ImageDims) -> Option<Self> {
        if dims.width == 0 || dims.height == 0 {
            return None;
        }
        let rect = rect.normalized();
        if !(rect.x.is_finite() && rect.y.is_finite() && rect.w.is_finite() && rect.h.is_finite())
        {
            return None;
        }
        let max_x = dims.width - 1;
        let max_y = dims.height - 1;
        let x = clamp_to_u32(rect.x.round(), max_x);
        let y = clamp_to_u32(rect.y.round(), max_y);
        let w = clamp_to_u32(rect.w.round(), dims.width - x).max(1);
        let h = clamp_to_u32(rect.h.round(), dims.height - y).max(1);
        Some(Self { x, y, w, h })
    }

    pub fn to_rect(self) -> Rect {
        Rect::new(self.x as f32, self.y as f32, self.w as f32, self.h as f32)
    }

    pub fn fits(&self, dims: ImageDims) -> bool {
        self.w >= 1
            && self.h >= 1
            && self.x.saturating_add(self.w) <= dims.width
            && self.y.saturating_add(self.h) <= dims.height
    }
}

fn clamp_to_u32(value: f32, max: u32) -> u32 {
    if value <= 0.0 {
        0
    } else if value >= max as f32 {
        max
    } else {
        value as u32
    }
}

/// Either an explicit target width or a scale factor drives the image size.
///
/// `target_width = None` is the "auto" state in which `scale_factor` is live.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageSizing {
    target_width: Option<u32>,
    scale_factor: f32,
}

impl Default for ImageSizing {
    fn default() -> Self {
        Self {
            target_width: None,
            scale_factor: 1.0,
        }
    }
}

impl ImageSizing {
    pub fn target_width(&self) -> Option<u32> {
        self.target_width.map(|width| width.clamp(1, TARGET_WIDTH_MAX))
    }

    pub fn scale_factor(&self) -> f32 {
        clamp_scale_factor(self.scale_factor)
    }

    pub const fn is_auto(&self) -> bool {
        self.target_width.is_none()
    }

    /// `None` (or a non-finite value) switches back to the scale factor.
    pub fn set_target_width(&mut self, width: Option<f32>) {
        self.target_width = width
            .filter(|width| width.is_finite())
            .map(|width| width.floor().clamp(1.0, TARGET_WIDTH_MAX as f32) as u32);
    }

    /// Re-applies the setter clamps to values that bypassed them.
    pub(crate) fn sanitized(self) -> Self {
        Self {
            target_width: self
                .target_width
                .map(|width| width.clamp(1, TARGET_WIDTH_MAX)),
            scale_factor: clamp_scale_factor(self.scale_factor),
        }
    }

    pub fn set_scale_factor(&mut self, factor: f32) {
        self.scale_factor = clamp_scale_factor(factor);
        self.target_width = None;
    }

    pub fn effective_scale(&self, crop_width: u32) -> f32 {
        match self.target_width() {
            Some(target) => target as f32 / crop_width.max(1) as f32,
            None => self.scale_factor(),
        }
    }

    /// Rendered image size; rounded, at least one pixel per side.
    pub fn scaled_size(&self, crop: CropRect) -> (u32, u32) {
        let scale = self.effective_scale(crop.w);
        let scaled = |value: u32| ((value as f32 * scale).round().max(1.0)) as u32;
        let width = match self.target_width() {
            Some(target) => target,
            None => scaled(crop.w),
        };
        (width, scaled(crop.h))
    }
}

fn clamp_scale_factor(factor: f32) -> f32 {
    if factor.is_finite() {
        factor.clamp(SCALE_FACTOR_MIN, SCALE_FACTOR_MAX)
    } else {
        1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "preset", rename_all = "snake_case")]
pub enum CanvasSizing {
    /// Canvas grows to fit the content.
    #[default]
    Auto,
    Square1080,
    Desktop1600x900,
    Hd1920x1080,
    Custom { width: u32, height: u32 },
}

impl CanvasSizing {
    pub fn custom(width: i64, height: i64) -> Self {
        let clamp = |value: i64| {
            u32::try_from(value.clamp(
                i64::from(CUSTOM_CANVAS_MIN),
                i64::from(CUSTOM_CANVAS_MAX),
            ))
            .unwrap_or(CUSTOM_CANVAS_MIN)
        };
        Self::Custom {
            width: clamp(width),
            height: clamp(height),
        }
    }

    pub const fn fixed_size(self) -> Option<(u32, u32)> {
        match self {
            Self::Auto => None,
            Self::Square1080 => Some((1080, 1080)),
            Self::Desktop1600x900 => Some((1600, 900)),
            Self::Hd1920x1080 => Some((1920, 1080)),
            Self::Custom { width, height } => Some((width, height)),
        }
    }

    /// Final canvas size: the fixed size, grown as needed to fit `content`.
    pub fn resolve(self, content: (u32, u32)) -> (u32, u32) {
        match self.fixed_size() {
            None => content,
            Some((width, height)) => (width.max(content.0), height.max(content.1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
}

impl ExportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelMultiplier {
    #[default]
    #[serde(rename = "1")]
    X1,
    #[serde(rename = "1.5")]
    X1_5,
    #[serde(rename = "2")]
    X2,
    #[serde(rename = "3")]
    X3,
}

impl PixelMultiplier {
    pub const ALL: [PixelMultiplier; 4] = [Self::X1, Self::X1_5, Self::X2, Self::X3];

    pub const fn factor(self) -> f32 {
        match self {
            Self::X1 => 1.0,
            Self::X1_5 => 1.5,
            Self::X2 => 2.0,
            Self::X3 => 3.0,
        }
    }

    /// Closest supported multiplier to `factor`.
    pub fn nearest(factor: f32) -> Self {
        Self::ALL
            .into_iter()
            .min_by(|a, b| {
                (a.factor() - factor)
                    .abs()
                    .total_cmp(&(b.factor() - factor).abs())
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub format: ExportFormat,
    jpeg_quality: f32,
    pub multiplier: PixelMultiplier,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            jpeg_quality: 0.92,
            multiplier: PixelMultiplier::X2,
        }
    }
}

impl ExportSettings {
    pub fn new(format: ExportFormat, jpeg_quality: f32, multiplier: PixelMultiplier) -> Self {
        Self {
            format,
            jpeg_quality: clamp_quality(jpeg_quality),
            multiplier,
        }
    }

    pub fn jpeg_quality(&self) -> f32 {
        clamp_quality(self.jpeg_quality)
    }

    pub fn set_jpeg_quality(&mut self, quality: f32) {
        self.jpeg_quality = clamp_quality(quality);
    }
}

pub(crate) fn clamp_quality(quality: f32) -> f32 {
    if quality.is_finite() {
        quality.clamp(JPEG_QUALITY_MIN, JPEG_QUALITY_MAX)
    } else {
        JPEG_QUALITY_MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_is_clamped_to_slider_range() {
        assert_eq!(Padding::new(-5, 500), Padding { x: 0, y: 200 });
    }

    #[test]
    fn crop_clamps_into_image_bounds() {
        let dims = ImageDims::new(200, 100);
        let crop = CropRect::clamped(Rect::new(150.0, -20.0, 100.0, 500.0), dims)
            .expect("dims are non-empty");
        assert_eq!(crop, CropRect::new(150, 0, 50, 100));
        assert!(crop.fits(dims));

        let tiny = CropRect::clamped(Rect::new(250.0, 10.0, 0.0, 0.0), dims).expect("clamped");
        assert_eq!(tiny, CropRect::new(199, 10, 1, 1));
    }

    #[test]
    fn setting_scale_factor_clears_target_width() {
        let mut sizing = ImageSizing::default();
        sizing.set_target_width(Some(640.0));
        assert_eq!(sizing.target_width(), Some(640));
        sizing.set_scale_factor(0.5);
        assert!(sizing.is_auto());
        assert_eq!(sizing.scale_factor(), 0.5);
    }

    #[test]
    fn target_width_clamps_non_positive_input() {
        let mut sizing = ImageSizing::default();
        sizing.set_target_width(Some(-10.0));
        assert_eq!(sizing.target_width(), Some(1));
        sizing.set_target_width(Some(f32::NAN));
        assert!(sizing.is_auto());
    }

    #[test]
    fn target_width_is_capped_at_export_limit() {
        let mut sizing = ImageSizing::default();
        sizing.set_target_width(Some(1e10));
        assert_eq!(sizing.target_width(), Some(TARGET_WIDTH_MAX));
        assert_eq!(
            sizing.scaled_size(CropRect::new(0, 0, 1, 1)),
            (TARGET_WIDTH_MAX, TARGET_WIDTH_MAX)
        );
    }

    #[test]
    fn scaled_size_uses_live_authority() {
        let crop = CropRect::new(0, 0, 300, 200);
        let mut sizing = ImageSizing::default();
        assert_eq!(sizing.scaled_size(crop), (300, 200));
        sizing.set_target_width(Some(150.0));
        assert_eq!(sizing.scaled_size(crop), (150, 100));
        sizing.set_scale_factor(9.0);
        assert_eq!(sizing.scaled_size(crop), (900, 600));
    }

    #[test]
    fn fixed_canvas_grows_to_fit_content() {
        assert_eq!(CanvasSizing::Auto.resolve((428, 328)), (428, 328));
        assert_eq!(
            CanvasSizing::Square1080.resolve((1200, 400)),
            (1200, 1080)
        );
        assert_eq!(
            CanvasSizing::custom(10, 99_999),
            CanvasSizing::Custom {
                width: 320,
                height: 6000
            }
        );
    }

    #[test]
    fn jpeg_quality_is_clamped() {
        let mut settings = ExportSettings::default();
        settings.set_jpeg_quality(0.1);
        assert_eq!(settings.jpeg_quality(), 0.6);
        settings.set_jpeg_quality(3.0);
        assert_eq!(settings.jpeg_quality(), 1.0);
    }

    #[test]
    fn nearest_multiplier_snaps_to_supported_values() {
        assert_eq!(PixelMultiplier::nearest(1.4), PixelMultiplier::X1_5);
        assert_eq!(PixelMultiplier::nearest(10.0), PixelMultiplier::X3);
    }
}
