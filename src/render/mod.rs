//! Deterministic compositor: draws a [`Scene`] onto a raster surface.
//!
//! Layers are drawn in a fixed order: background, window frame (or the
//! frameless shadow), the screenshot, shapes, then text. All coordinates are
//! canvas pixels; the surface is `canvas * pixel_ratio` device pixels and a
//! single base transform carries the scale, so preview and export share the
//! same layout math.

mod chrome;
mod fill;
mod shadow;
mod shapes;
mod source;
mod text;

use thiserror::Error;
use tiny_skia::{FilterQuality, Paint, Pattern, Pixmap, SpreadMode, Transform};

use crate::geometry::{rect_clip_mask, Rect};
use crate::scene::{Background, NodeId, Scene, SceneLayout};

pub use fill::TileCache;
pub use source::{pixmap_to_rgba, SourceImage};
pub use text::{FontBook, LineLayout, TextLayout};

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("pixel ratio must be a positive finite number, got {0}")]
    InvalidPixelRatio(f32),
    #[error("surface is {actual_width}x{actual_height} but the canvas needs {expected_width}x{expected_height}")]
    SurfaceSizeMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },
    #[error("failed to allocate a {width}x{height} surface")]
    SurfaceAllocation { width: u32, height: u32 },
    #[error(transparent)]
    Decode(#[from] image::ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Device pixels per canvas pixel.
    pub pixel_ratio: f32,
    pub include_texts: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            pixel_ratio: 1.0,
            include_texts: true,
        }
    }
}

/// Where the content landed, in canvas pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutInfo {
    pub content_x: f32,
    pub content_y: f32,
    pub rendered_width: u32,
    pub rendered_height: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub scene_layout: SceneLayout,
    /// Measured block of every text node, for hit testing.
    pub text_bounds: Vec<(NodeId, Rect)>,
}

impl LayoutInfo {
    pub fn text_bounds(&self, id: NodeId) -> Option<Rect> {
        self.text_bounds
            .iter()
            .find(|(text_id, _)| *text_id == id)
            .map(|(_, rect)| *rect)
    }
}

/// Device size for a canvas at `pixel_ratio`.
pub fn device_size(width: u32, height: u32, pixel_ratio: f32) -> (u32, u32) {
    let scale = |value: u32| ((value as f32 * pixel_ratio).round() as u32).max(1);
    (scale(width), scale(height))
}

#[derive(Debug, Default)]
pub struct Compositor {
    tiles: TileCache,
    fonts: FontBook,
}

impl Compositor {
    pub fn new(fonts: FontBook) -> Self {
        Self {
            tiles: TileCache::default(),
            fonts,
        }
    }

    pub fn fonts_mut(&mut self) -> &mut FontBook {
        &mut self.fonts
    }

    /// Draws `scene` onto `surface`, which must be the device size of the canvas.
    pub fn render(
        &mut self,
        surface: &mut Pixmap,
        canvas_width: u32,
        canvas_height: u32,
        scene: &Scene,
        source: &SourceImage,
        options: RenderOptions,
    ) -> RenderResult<LayoutInfo> {
        let ratio = options.pixel_ratio;
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(RenderError::InvalidPixelRatio(ratio));
        }
        let (expected_width, expected_height) = device_size(canvas_width, canvas_height, ratio);
        if surface.width() != expected_width || surface.height() != expected_height {
            return Err(RenderError::SurfaceSizeMismatch {
                expected_width,
                expected_height,
                actual_width: surface.width(),
                actual_height: surface.height(),
            });
        }

        let layout = scene.layout_for_canvas(source.dims(), canvas_width, canvas_height);
        let base = Transform::from_scale(ratio, ratio);
        let scene_shadow = shadow::ShadowParams::from_scene(scene.shadow());

        surface.fill(tiny_skia::Color::TRANSPARENT);
        self.draw_background(surface, scene.background(), canvas_width, canvas_height, base, ratio);

        if let Some(frame_rect) = layout.frame {
            chrome::draw_window(
                surface,
                scene.window_frame(),
                frame_rect,
                scene_shadow,
                base,
                ratio,
            );
        } else if let Some(params) = scene_shadow {
            chrome::draw_frameless_shadow(
                surface,
                layout.content_rect(),
                scene.window_frame().corner_radius(),
                params,
                base,
                ratio,
            );
        }

        draw_image(surface, source, &layout, base, ratio, layout.frame.is_some());

        for shape in scene.shapes().iter() {
            let origin = layout.anchor_origin(shape.anchor);
            shapes::draw_shape(surface, shape, origin, base, ratio, None);
        }

        let mut text_bounds = Vec::with_capacity(scene.texts().len());
        for node in scene.texts().iter() {
            let origin = layout.anchor_origin(node.anchor);
            let anchor = origin.offset(node.x, node.y);
            let bounds = if options.include_texts {
                text::draw_text(surface, &mut self.fonts, node, anchor, base, ratio, None)
            } else {
                self.fonts.layout(node, anchor).bounds(node.align)
            };
            text_bounds.push((node.id, bounds));
        }

        tracing::trace!(
            canvas_width,
            canvas_height,
            pixel_ratio = ratio,
            "scene rendered"
        );
        Ok(LayoutInfo {
            content_x: layout.content_x,
            content_y: layout.content_y,
            rendered_width: layout.scaled_width,
            rendered_height: layout.scaled_height,
            canvas_width,
            canvas_height,
            scene_layout: layout,
            text_bounds,
        })
    }

    /// Allocates a device surface for the scene's own canvas size and renders into it.
    pub fn render_to_pixmap(
        &mut self,
        scene: &Scene,
        source: &SourceImage,
        options: RenderOptions,
    ) -> RenderResult<(Pixmap, LayoutInfo)> {
        let (canvas_width, canvas_height) = scene.canvas_size(source.dims());
        let (width, height) = device_size(canvas_width, canvas_height, options.pixel_ratio);
        let mut surface =
            Pixmap::new(width, height).ok_or(RenderError::SurfaceAllocation { width, height })?;
        let info = self.render(
            &mut surface,
            canvas_width,
            canvas_height,
            scene,
            source,
            options,
        )?;
        Ok((surface, info))
    }

    fn draw_background(
        &mut self,
        surface: &mut Pixmap,
        background: &Background,
        canvas_width: u32,
        canvas_height: u32,
        base: Transform,
        ratio: f32,
    ) {
        let canvas = Rect::new(0.0, 0.0, canvas_width as f32, canvas_height as f32);
        let Some(area) = canvas.to_skia() else {
            return;
        };
        let shader = match background {
            Background::Solid { color } => Some(tiny_skia::Shader::SolidColor(color.to_skia())),
            Background::LinearGradient(gradient) => fill::linear_gradient_shader(
                canvas,
                gradient.angle_degrees,
                gradient.stops.as_slice(),
            ),
            Background::Pattern(pattern) => self.tiles.pattern_shader(pattern, ratio),
        };
        if let Some(shader) = shader {
            let paint = Paint {
                shader,
                anti_alias: false,
                ..Paint::default()
            };
            surface.fill_rect(area, &paint, base, None);
        }
    }
}

fn draw_image(
    surface: &mut Pixmap,
    source: &SourceImage,
    layout: &SceneLayout,
    base: Transform,
    ratio: f32,
    clip_to_content: bool,
) {
    let content = layout.content_rect();
    let Some(area) = content.to_skia() else {
        return;
    };
    let (scale_x, scale_y) = layout.image_scale();
    let crop = layout.crop;
    let image_transform = Transform::from_row(
        scale_x,
        0.0,
        0.0,
        scale_y,
        layout.content_x - crop.x as f32 * scale_x,
        layout.content_y - crop.y as f32 * scale_y,
    );
    let is_integral = |value: f32| (value - value.round()).abs() < 1e-4;
    let pixel_exact = (scale_x * ratio - 1.0).abs() < 1e-4
        && (scale_y * ratio - 1.0).abs() < 1e-4
        && is_integral(layout.content_x * ratio)
        && is_integral(layout.content_y * ratio);
    let quality = if pixel_exact {
        FilterQuality::Nearest
    } else {
        FilterQuality::Bilinear
    };
    let paint = Paint {
        shader: Pattern::new(
            source.pixmap().as_ref(),
            SpreadMode::Pad,
            quality,
            1.0,
            image_transform,
        ),
        anti_alias: !pixel_exact,
        ..Paint::default()
    };
    let clip = if clip_to_content {
        rect_clip_mask(surface.width(), surface.height(), content, base)
    } else {
        None
    };
    surface.fill_rect(area, &paint, base, clip.as_ref());
}

/// HiDPI preview that redraws only when the scene revision or size changed.
#[derive(Debug)]
pub struct PreviewSurface {
    pixmap: Option<Pixmap>,
    pixel_ratio: f32,
    include_texts: bool,
    rendered: Option<(u64, u32, u32)>,
    last_layout: Option<LayoutInfo>,
}

impl PreviewSurface {
    pub fn new(device_pixel_ratio: f64) -> Self {
        Self {
            pixmap: None,
            pixel_ratio: preview_pixel_ratio(device_pixel_ratio),
            include_texts: true,
            rendered: None,
            last_layout: None,
        }
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    pub fn set_device_pixel_ratio(&mut self, device_pixel_ratio: f64) {
        let ratio = preview_pixel_ratio(device_pixel_ratio);
        if ratio != self.pixel_ratio {
            self.pixel_ratio = ratio;
            self.mark_dirty();
        }
    }

    /// Skips text during fast redraws, e.g. while a drag is in flight.
    pub fn set_include_texts(&mut self, include_texts: bool) {
        if include_texts != self.include_texts {
            self.include_texts = include_texts;
            self.mark_dirty();
        }
    }

    pub fn mark_dirty(&mut self) {
        self.rendered = None;
    }

    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    pub fn last_layout(&self) -> Option<&LayoutInfo> {
        self.last_layout.as_ref()
    }

    /// Returns `true` when a redraw happened.
    pub fn redraw_if_dirty(
        &mut self,
        compositor: &mut Compositor,
        scene: &Scene,
        source: &SourceImage,
    ) -> RenderResult<bool> {
        let (canvas_width, canvas_height) = scene.canvas_size(source.dims());
        let stamp = (scene.revision(), canvas_width, canvas_height);
        if self.rendered == Some(stamp) && self.pixmap.is_some() {
            return Ok(false);
        }
        let (width, height) = device_size(canvas_width, canvas_height, self.pixel_ratio);
        let reuse = self
            .pixmap
            .as_ref()
            .is_some_and(|pixmap| pixmap.width() == width && pixmap.height() == height);
        if !reuse {
            self.pixmap =
                Some(Pixmap::new(width, height).ok_or(RenderError::SurfaceAllocation { width, height })?);
        }
        let Some(pixmap) = self.pixmap.as_mut() else {
            return Err(RenderError::SurfaceAllocation { width, height });
        };
        let info = compositor.render(
            pixmap,
            canvas_width,
            canvas_height,
            scene,
            source,
            RenderOptions {
                pixel_ratio: self.pixel_ratio,
                include_texts: self.include_texts,
            },
        )?;
        self.last_layout = Some(info);
        self.rendered = Some(stamp);
        Ok(true)
    }
}

/// Whole-number device ratio used by the preview, never below 1.
pub fn preview_pixel_ratio(device_pixel_ratio: f64) -> f32 {
    if device_pixel_ratio.is_finite() {
        device_pixel_ratio.round().max(1.0) as f32
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Color, Point};
    use crate::scene::{CropRect, ShadowPreset, ShapeKind};
    use image::{Rgba, RgbaImage};

    fn gradient_source(width: u32, height: u32) -> SourceImage {
        let image = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        });
        SourceImage::from_rgba(&image).expect("source")
    }

    fn plain_scene() -> Scene {
        let mut scene = Scene::new();
        scene.set_window_visible(false);
        scene.apply_shadow_preset(ShadowPreset::Off);
        scene
    }

    fn rgba(pixmap: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let pixel = pixmap.pixel(x, y).expect("pixel").demultiply();
        [pixel.red(), pixel.green(), pixel.blue(), pixel.alpha()]
    }

    #[test]
    fn end_to_end_canvas_places_image_inside_white_padding() {
        let source = gradient_source(300, 200);
        let scene = plain_scene();
        let mut compositor = Compositor::default();
        let (pixmap, info) = compositor
            .render_to_pixmap(&scene, &source, RenderOptions::default())
            .expect("render");

        assert_eq!((pixmap.width(), pixmap.height()), (428, 328));
        assert_eq!((info.content_x, info.content_y), (64.0, 64.0));
        assert_eq!((info.rendered_width, info.rendered_height), (300, 200));
        assert_eq!(rgba(&pixmap, 64, 64), [0, 0, 0, 255]);
        assert_eq!(rgba(&pixmap, 363, 263), [43, 199, 242, 255]);
        for (x, y) in [(63, 64), (64, 63), (364, 263), (363, 264), (0, 0), (427, 327)] {
            assert_eq!(rgba(&pixmap, x, y), [255, 255, 255, 255], "border at {x},{y}");
        }
    }

    #[test]
    fn re_rendering_an_unchanged_scene_is_byte_identical() {
        let source = gradient_source(120, 80);
        let mut scene = Scene::new();
        let id = scene.add_shape(ShapeKind::Arrow, Point::new(5.0, 5.0));
        scene
            .update_shape(id, |shape| {
                shape.w = 60.0;
                shape.h = 30.0;
                shape.shadow.enabled = true;
            })
            .expect("shape");
        scene.add_text(Point::new(10.0, 10.0));
        let mut compositor = Compositor::default();
        let (first, _) = compositor
            .render_to_pixmap(&scene, &source, RenderOptions::default())
            .expect("first render");
        let mut second = first.clone();
        second.fill(tiny_skia::Color::BLACK);
        compositor
            .render(
                &mut second,
                first.width(),
                first.height(),
                &scene,
                &source,
                RenderOptions::default(),
            )
            .expect("second render");
        assert_eq!(first.data(), second.data());
    }

    #[test]
    fn title_bar_covers_rows_above_content() {
        let red = SourceImage::from_rgba(&RgbaImage::from_pixel(200, 120, Rgba([255, 0, 0, 255])))
            .expect("source");
        let scene = Scene::new();
        let mut compositor = Compositor::default();
        let (pixmap, info) = compositor
            .render_to_pixmap(&scene, &red, RenderOptions::default())
            .expect("render");
        assert_eq!(info.content_y, 108.0);
        let bar = [0x1f, 0x29, 0x37, 255];
        for y in [70, 100, 107] {
            assert_eq!(rgba(&pixmap, 180, y), bar, "row {y}");
        }
        assert_eq!(rgba(&pixmap, 180, 108), [255, 0, 0, 255]);
        for x in 64..264 {
            assert_ne!(rgba(&pixmap, x, 107), [255, 0, 0, 255], "column {x}");
        }
    }

    #[test]
    fn crop_renders_exact_sub_region() {
        let source = gradient_source(200, 200);
        let mut scene = plain_scene();
        scene.set_padding(0, 0);
        scene.set_crop(Some(CropRect::new(10, 10, 100, 50)), source.dims());
        let mut compositor = Compositor::default();
        let (pixmap, _) = compositor
            .render_to_pixmap(&scene, &source, RenderOptions::default())
            .expect("render");
        assert_eq!((pixmap.width(), pixmap.height()), (100, 50));
        for y in 0..50 {
            for x in 0..100 {
                let (sx, sy) = (x + 10, y + 10);
                let expected = [sx as u8, sy as u8, (sx + sy) as u8, 255];
                assert_eq!(rgba(&pixmap, x, y), expected, "pixel {x},{y}");
            }
        }
    }

    #[test]
    fn double_resolution_render_downsamples_to_single_resolution() {
        let image = RgbaImage::from_fn(96, 64, |x, y| Rgba([(x * 2) as u8, (y * 3) as u8, 90, 255]));
        let source = SourceImage::from_rgba(&image).expect("source");
        let mut scene = Scene::new();
        scene.apply_shadow_preset(ShadowPreset::Off);
        scene.set_padding(24, 24);
        scene.set_solid_background(Color::rgb(20, 40, 200));
        let id = scene.add_shape(ShapeKind::Rectangle, Point::new(10.0, 10.0));
        scene
            .update_shape(id, |shape| {
                shape.w = 40.0;
                shape.h = 20.0;
            })
            .expect("shape");

        let mut compositor = Compositor::default();
        let (single, _) = compositor
            .render_to_pixmap(&scene, &source, RenderOptions::default())
            .expect("1x");
        let (double, _) = compositor
            .render_to_pixmap(
                &scene,
                &source,
                RenderOptions {
                    pixel_ratio: 2.0,
                    include_texts: true,
                },
            )
            .expect("2x");
        assert_eq!(double.width(), single.width() * 2);

        let mut total = 0_u64;
        let mut samples = 0_u64;
        for y in 0..single.height() {
            for x in 0..single.width() {
                let expected = rgba(&single, x, y);
                let mut sum = [0_u32; 4];
                for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                    let pixel = rgba(&double, x * 2 + dx, y * 2 + dy);
                    for channel in 0..4 {
                        sum[channel] += u32::from(pixel[channel]);
                    }
                }
                for channel in 0..4 {
                    let averaged = (sum[channel] / 4) as i64;
                    total += (averaged - i64::from(expected[channel])).unsigned_abs();
                    samples += 1;
                }
            }
        }
        let mean = total as f64 / samples as f64;
        assert!(mean < 4.0, "mean channel difference {mean}");
    }

    #[test]
    fn render_rejects_mismatched_surface_and_bad_ratio() {
        let source = gradient_source(10, 10);
        let scene = plain_scene();
        let mut compositor = Compositor::default();
        let mut surface = Pixmap::new(5, 5).expect("surface");
        assert!(matches!(
            compositor.render(&mut surface, 138, 138, &scene, &source, RenderOptions::default()),
            Err(RenderError::SurfaceSizeMismatch { .. })
        ));
        let bad = RenderOptions {
            pixel_ratio: 0.0,
            include_texts: true,
        };
        assert!(matches!(
            compositor.render(&mut surface, 5, 5, &scene, &source, bad),
            Err(RenderError::InvalidPixelRatio(_))
        ));
    }

    #[test]
    fn stage_anchored_shapes_ignore_content_origin() {
        let source = gradient_source(50, 50);
        let mut scene = plain_scene();
        scene.set_solid_background(Color::WHITE);
        let id = scene.add_shape(ShapeKind::Rectangle, Point::new(4.0, 4.0));
        scene
            .update_shape(id, |shape| {
                shape.anchor = crate::scene::PositionAnchor::Stage;
                shape.w = 20.0;
                shape.h = 20.0;
                shape.fill.enabled = true;
                shape.fill.color = Color::rgb(0, 0, 0);
            })
            .expect("shape");
        let mut compositor = Compositor::default();
        let (pixmap, _) = compositor
            .render_to_pixmap(&scene, &source, RenderOptions::default())
            .expect("render");
        assert_eq!(rgba(&pixmap, 14, 14), [0, 0, 0, 255]);
    }

    #[test]
    fn pattern_background_fills_canvas() {
        let source = gradient_source(40, 40);
        let mut scene = plain_scene();
        scene.set_pattern_kind(crate::scene::PatternKind::Grid);
        let mut compositor = Compositor::default();
        let (pixmap, _) = compositor
            .render_to_pixmap(&scene, &source, RenderOptions::default())
            .expect("render");
        assert!(pixmap.pixels().iter().all(|pixel| pixel.alpha() == 255));
    }

    #[test]
    fn preview_redraws_only_after_scene_changes() {
        let source = gradient_source(40, 30);
        let mut scene = plain_scene();
        let mut compositor = Compositor::default();
        let mut preview = PreviewSurface::new(1.6);
        assert_eq!(preview.pixel_ratio(), 2.0);

        assert!(preview.redraw_if_dirty(&mut compositor, &scene, &source).expect("first"));
        assert!(!preview.redraw_if_dirty(&mut compositor, &scene, &source).expect("clean"));
        let pixmap = preview.pixmap().expect("pixmap");
        assert_eq!((pixmap.width(), pixmap.height()), ((40 + 128) * 2, (30 + 128) * 2));

        scene.set_padding(10, 10);
        assert!(preview.redraw_if_dirty(&mut compositor, &scene, &source).expect("dirty"));
        let pixmap = preview.pixmap().expect("pixmap");
        assert_eq!((pixmap.width(), pixmap.height()), (120, 100));
    }

    #[test]
    fn preview_pixel_ratio_rounds_and_floors() {
        assert_eq!(preview_pixel_ratio(0.5), 1.0);
        assert_eq!(preview_pixel_ratio(1.4), 1.0);
        assert_eq!(preview_pixel_ratio(2.6), 3.0);
        assert_eq!(preview_pixel_ratio(f64::NAN), 1.0);
    }

    #[test]
    fn layout_info_reports_text_bounds_without_drawing_text() {
        let source = gradient_source(100, 60);
        let mut scene = plain_scene();
        let id = scene.add_text(Point::new(4.0, 6.0));
        let mut compositor = Compositor::default();
        let (_, info) = compositor
            .render_to_pixmap(
                &scene,
                &source,
                RenderOptions {
                    pixel_ratio: 1.0,
                    include_texts: false,
                },
            )
            .expect("render");
        let bounds = info.text_bounds(id).expect("bounds");
        assert_eq!((bounds.x, bounds.y), (68.0, 70.0));
    }
}
