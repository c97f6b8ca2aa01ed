use image::{imageops, GrayImage, Luma};
use tiny_skia::{Mask, Pixmap, PixmapPaint, PremultipliedColorU8, Transform};

use crate::geometry::{Color, Rect};
use crate::scene::{DropShadow, Shadow};

const MIN_SIGMA: f32 = 0.5;

/// Shadow parameters in content pixels; `blur` follows the canvas convention
/// where the Gaussian sigma is half the blur radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ShadowParams {
    pub color: Color,
    pub blur: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl ShadowParams {
    pub fn from_scene(shadow: &Shadow) -> Option<Self> {
        if !shadow.enabled {
            return None;
        }
        let (offset_x, offset_y) = shadow.offset();
        Some(Self {
            color: shadow.effective_color(),
            blur: shadow.blur(),
            offset_x,
            offset_y,
        })
    }

    pub fn from_node(shadow: &DropShadow) -> Option<Self> {
        if !shadow.enabled {
            return None;
        }
        let finite = |value: f32, fallback: f32| if value.is_finite() { value } else { fallback };
        Some(Self {
            color: shadow.color.with_opacity(shadow.alpha),
            blur: finite(shadow.blur, 0.0).max(0.0),
            offset_x: finite(shadow.offset_x, 0.0),
            offset_y: finite(shadow.offset_y, 0.0),
        })
    }

    fn sigma(&self, pixel_ratio: f32) -> f32 {
        self.blur / 2.0 * pixel_ratio
    }
}

pub(crate) fn blur_downsample_factor(width: u32, height: u32, sigma: f32) -> u32 {
    let area = width.saturating_mul(height);
    if area < 32_768 || sigma < 6.0 {
        return 1;
    }
    if area >= 262_144 && sigma >= 10.0 {
        return 4;
    }
    if area >= 65_536 && sigma >= 8.0 {
        return 3;
    }
    2
}

/// Gaussian blur of a coverage layer; large layers are blurred at reduced resolution.
pub(crate) fn blur_coverage(layer: &GrayImage, sigma: f32) -> GrayImage {
    let width = layer.width();
    let height = layer.height();
    if sigma < MIN_SIGMA {
        return layer.clone();
    }
    let downsample = blur_downsample_factor(width, height, sigma)
        .min(width.max(1))
        .min(height.max(1));
    if downsample <= 1 {
        return imageops::blur(layer, sigma);
    }

    let reduced_width = (width / downsample).max(1);
    let reduced_height = (height / downsample).max(1);
    let reduced = imageops::resize(
        layer,
        reduced_width,
        reduced_height,
        imageops::FilterType::Triangle,
    );
    let reduced_sigma = (sigma / downsample as f32).max(0.8);
    let blurred = imageops::blur(&reduced, reduced_sigma);
    imageops::resize(&blurred, width, height, imageops::FilterType::Triangle)
}

/// Paints the blurred, tinted silhouette of whatever `draw` produces.
///
/// `bounds` are the silhouette's user-space bounds before `transform`; the
/// layer is limited to the part that can land on `surface`.
pub(crate) fn draw_shadow<F>(
    surface: &mut Pixmap,
    params: ShadowParams,
    pixel_ratio: f32,
    transform: Transform,
    bounds: Rect,
    clip: Option<&Mask>,
    draw: F,
) where
    F: Fn(&mut Pixmap, Transform),
{
    if params.color.a == 0 {
        return;
    }
    let sigma = params.sigma(pixel_ratio);
    let margin = (sigma * 3.0).ceil() + 1.0;
    let shift_x = (params.offset_x * pixel_ratio).round();
    let shift_y = (params.offset_y * pixel_ratio).round();

    let device = bounds.transformed_bounds(transform).inflate(margin);
    let reachable = Rect::new(
        -shift_x - margin,
        -shift_y - margin,
        surface.width() as f32 + margin * 2.0,
        surface.height() as f32 + margin * 2.0,
    );
    let Some(region) = intersect(device, reachable) else {
        return;
    };
    let left = region.x.floor();
    let top = region.y.floor();
    let width = (region.right().ceil() - left).max(1.0) as u32;
    let height = (region.bottom().ceil() - top).max(1.0) as u32;
    let Some(mut layer) = Pixmap::new(width, height) else {
        tracing::warn!(width, height, "shadow layer allocation failed");
        return;
    };
    draw(&mut layer, transform.post_translate(-left, -top));

    let coverage = GrayImage::from_fn(width, height, |x, y| {
        let alpha = layer.pixel(x, y).map_or(0, |pixel| pixel.alpha());
        Luma([alpha])
    });
    let blurred = blur_coverage(&coverage, sigma);

    let tint = |coverage: u8| {
        let alpha = mul_div_255(u32::from(coverage), u32::from(params.color.a));
        PremultipliedColorU8::from_rgba(
            mul_div_255(u32::from(params.color.r), u32::from(alpha)),
            mul_div_255(u32::from(params.color.g), u32::from(alpha)),
            mul_div_255(u32::from(params.color.b), u32::from(alpha)),
            alpha,
        )
        .unwrap_or(PremultipliedColorU8::TRANSPARENT)
    };
    for (pixel, value) in layer.pixels_mut().iter_mut().zip(blurred.as_raw()) {
        *pixel = tint(*value);
    }

    surface.draw_pixmap(
        (left + shift_x) as i32,
        (top + shift_y) as i32,
        layer.as_ref(),
        &PixmapPaint::default(),
        Transform::identity(),
        clip,
    );
}

/// Draws the shadow (if any) and then the content itself.
#[allow(clippy::too_many_arguments)]
pub(crate) fn draw_with_shadow<F>(
    surface: &mut Pixmap,
    shadow: Option<ShadowParams>,
    pixel_ratio: f32,
    transform: Transform,
    bounds: Rect,
    clip: Option<&Mask>,
    draw: F,
) where
    F: Fn(&mut Pixmap, Transform, Option<&Mask>),
{
    if let Some(params) = shadow {
        draw_shadow(surface, params, pixel_ratio, transform, bounds, clip, |layer, ts| {
            draw(layer, ts, None)
        });
    }
    draw(surface, transform, clip);
}

fn intersect(a: Rect, b: Rect) -> Option<Rect> {
    let left = a.x.max(b.x);
    let top = a.y.max(b.y);
    let right = a.right().min(b.right());
    let bottom = a.bottom().min(b.bottom());
    (right > left && bottom > top).then(|| Rect::new(left, top, right - left, bottom - top))
}

fn mul_div_255(a: u32, b: u32) -> u8 {
    ((a * b + 127) / 255).min(255) as u8
}
