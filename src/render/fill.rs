use std::collections::HashMap;
use std::f32::consts::PI;

use tiny_skia::{
    FillRule, FilterQuality, GradientStop as SkiaStop, LineCap, Paint, Path, PathBuilder,
    Pattern, Pixmap, Shader, SpreadMode, Stroke, Transform,
};

use crate::geometry::{polyline_path, rounded_rect_path, Color, Point, Rect};
use crate::scene::{GradientStop, PatternFill, PatternKind};

const TILE_CACHE_LIMIT: usize = 16;
const NOISE_SEED: u32 = 1337;
const NOISE_DOTS: u32 = 10;
const NOISE_ALPHA: f32 = 0.45;

/// Linear gradient across `rect`, centered, with a span of `max(w, h)` each way.
pub(crate) fn linear_gradient_shader(
    rect: Rect,
    angle_degrees: f32,
    stops: &[GradientStop],
) -> Option<Shader<'static>> {
    gradient_around(rect.center(), rect.w.abs().max(rect.h.abs()), angle_degrees, stops)
}

/// Gradient running from `center - dir * span` to `center + dir * span`.
pub(crate) fn gradient_around(
    center: Point,
    span: f32,
    angle_degrees: f32,
    stops: &[GradientStop],
) -> Option<Shader<'static>> {
    let first = stops.first()?;
    let radians = angle_degrees * PI / 180.0;
    let (sin, cos) = radians.sin_cos();
    let start = tiny_skia::Point::from_xy(center.x - cos * span, center.y - sin * span);
    let end = tiny_skia::Point::from_xy(center.x + cos * span, center.y + sin * span);

    let mut ordered = stops.to_vec();
    ordered.sort_by(|a, b| a.position.total_cmp(&b.position));
    let skia_stops = ordered
        .iter()
        .map(|stop| SkiaStop::new(stop.position.clamp(0.0, 1.0), stop.color.to_skia()))
        .collect::<Vec<_>>();

    tiny_skia::LinearGradient::new(
        start,
        end,
        skia_stops,
        SpreadMode::Pad,
        Transform::identity(),
    )
    .or(Some(Shader::SolidColor(first.color.to_skia())))
}

/// Two-color gradient used by text fills and text backgrounds.
pub(crate) fn two_color_gradient(
    center: Point,
    span: f32,
    angle_degrees: f32,
    from: Color,
    to: Color,
) -> Option<Shader<'static>> {
    gradient_around(
        center,
        span,
        angle_degrees,
        &[GradientStop::new(from, 0.0), GradientStop::new(to, 1.0)],
    )
}

pub(crate) fn solid_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = true;
    paint
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TileKey {
    kind: PatternKind,
    foreground: Color,
    background: Color,
    tile: u32,
    device: u32,
}

/// Rasterized pattern tiles keyed by kind, colors and device size.
#[derive(Debug, Default)]
pub struct TileCache {
    entries: HashMap<TileKey, Pixmap>,
}

impl TileCache {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Repeating shader for `pattern`; tiles are rasterized at device resolution.
    pub(crate) fn pattern_shader(
        &mut self,
        pattern: &PatternFill,
        pixel_ratio: f32,
    ) -> Option<Shader<'_>> {
        let tile = pattern.tile_scale().floor();
        let device = (tile * pixel_ratio).round().max(1.0) as u32;
        let key = TileKey {
            kind: pattern.kind,
            foreground: pattern.foreground,
            background: pattern.background,
            tile: tile as u32,
            device,
        };
        if !self.entries.contains_key(&key) {
            if self.entries.len() >= TILE_CACHE_LIMIT {
                self.entries.clear();
            }
            let pixmap = build_tile(pattern.kind, pattern.foreground, pattern.background, tile, device)?;
            tracing::trace!(kind = pattern.kind.label(), device, "pattern tile rasterized");
            self.entries.insert(key, pixmap);
        }
        let pixmap = self.entries.get(&key)?;
        let to_user = tile / device as f32;
        let quality = if (device as f32 - tile * pixel_ratio).abs() < f32::EPSILON {
            FilterQuality::Nearest
        } else {
            FilterQuality::Bilinear
        };
        Some(Pattern::new(
            pixmap.as_ref(),
            SpreadMode::Repeat,
            quality,
            1.0,
            Transform::from_scale(to_user, to_user),
        ))
    }
}

/// Draws one `t`x`t` tile (in tile units) into a `device`-sized pixmap.
fn build_tile(
    kind: PatternKind,
    foreground: Color,
    background: Color,
    t: f32,
    device: u32,
) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(device, device)?;
    pixmap.fill(background.to_skia());
    let ts = Transform::from_scale(device as f32 / t, device as f32 / t);
    let paint = solid_paint(foreground);
    let line_width = (t * 0.06).round().max(1.0);
    let stroke = Stroke {
        width: line_width,
        ..Stroke::default()
    };
    let center = t / 2.0;

    let stroke_path = |pixmap: &mut Pixmap, path: Option<Path>, stroke: &Stroke| {
        if let Some(path) = path {
            pixmap.stroke_path(&path, &paint, stroke, ts, None);
        }
    };
    let fill_path = |pixmap: &mut Pixmap, path: Option<Path>| {
        if let Some(path) = path {
            pixmap.fill_path(&path, &paint, FillRule::Winding, ts, None);
        }
    };

    match kind {
        PatternKind::Dots => {
            let radius = (t * 0.12).round().max(1.0);
            fill_path(&mut pixmap, PathBuilder::from_circle(center, center, radius));
        }
        PatternKind::Grid => {
            let path = segments(&[((0.0, 0.0), (0.0, t)), ((0.0, 0.0), (t, 0.0))]);
            stroke_path(&mut pixmap, path, &stroke);
        }
        PatternKind::Cross => {
            let path = segments(&[((center, 0.0), (center, t)), ((0.0, center), (t, center))]);
            stroke_path(&mut pixmap, path, &stroke);
        }
        PatternKind::Crosshatch => {
            let path = segments(&[((0.0, 0.0), (t, t)), ((0.0, t), (t, 0.0))]);
            stroke_path(&mut pixmap, path, &stroke);
        }
        PatternKind::Diagonal => {
            stroke_path(&mut pixmap, segments(&[((0.0, t), (t, 0.0))]), &stroke);
        }
        PatternKind::Zigzag => {
            let amp = t * 0.25;
            let step = (t / 4.0).round().max(2.0);
            let mut points = vec![Point::new(0.0, center)];
            let mut up = true;
            let mut x = 0.0;
            while x <= t {
                points.push(Point::new(x, if up { center - amp } else { center + amp }));
                up = !up;
                x += step;
            }
            stroke_path(&mut pixmap, polyline_path(&points, false), &stroke);
        }
        PatternKind::Wave => {
            let amp = t * 0.15;
            let steps = t as u32;
            let points = (0..=steps)
                .map(|x| {
                    let x = x as f32;
                    Point::new(x, center + (x / t * 2.0 * PI).sin() * amp)
                })
                .collect::<Vec<_>>();
            stroke_path(&mut pixmap, polyline_path(&points, false), &stroke);
        }
        PatternKind::Plus => {
            let half = t * 0.3 / 2.0;
            let path = segments(&[
                ((center - half, center), (center + half, center)),
                ((center, center - half), (center, center + half)),
            ]);
            stroke_path(&mut pixmap, path, &stroke);
        }
        PatternKind::Hex => {
            let radius = t * 0.32;
            let points = (0..6)
                .map(|i| {
                    let angle = PI / 3.0 * i as f32;
                    Point::new(center + radius * angle.cos(), center + radius * angle.sin())
                })
                .collect::<Vec<_>>();
            stroke_path(&mut pixmap, polyline_path(&points, true), &stroke);
        }
        PatternKind::Noise => {
            let dot = (t * 0.06).round().max(1.0);
            let noise_paint = solid_paint(foreground.with_opacity(NOISE_ALPHA));
            for i in 0..NOISE_DOTS {
                let x = (noise_unit(i) * t).floor();
                let y = (noise_unit(i + 1) * t).floor();
                if let Some(rect) = tiny_skia::Rect::from_xywh(x, y, dot, dot) {
                    pixmap.fill_rect(rect, &noise_paint, ts, None);
                }
            }
        }
        PatternKind::Icons => {
            let side = (t * 0.3).round();
            let radius = (side * 0.25).round();
            fill_path(&mut pixmap, rounded_rect_path(Rect::new(0.0, 0.0, side, side), radius));
        }
        PatternKind::Circuit => {
            let pad = (t * 0.2).round();
            let via = (t * 0.08).round().max(1.0);
            let trace = Stroke {
                line_cap: LineCap::Round,
                ..stroke.clone()
            };
            let path = tiny_skia::Rect::from_xywh(pad, pad, t - pad * 2.0, t - pad * 2.0)
                .map(PathBuilder::from_rect);
            stroke_path(&mut pixmap, path, &trace);
            fill_path(&mut pixmap, PathBuilder::from_circle(t - pad * 1.2, center, via));
        }
        PatternKind::Chevron => {
            let off = (t * 0.2).round();
            let points = [
                Point::new(0.0, off),
                Point::new(center, t - off),
                Point::new(t, off),
            ];
            stroke_path(&mut pixmap, polyline_path(&points, false), &stroke);
        }
        PatternKind::Stars => {
            let radius = t * 0.18;
            let points = (0..5)
                .map(|k| {
                    let angle = PI * 2.0 * k as f32 / 5.0;
                    Point::new(center + angle.cos() * radius, center + angle.sin() * radius)
                })
                .collect::<Vec<_>>();
            stroke_path(&mut pixmap, polyline_path(&points, true), &stroke);
        }
        PatternKind::Sprinkles => {
            let tile = t as u32;
            let len = (t * 0.18).round().max(2.0);
            for i in 0..6_u32 {
                let x = ((i * 97) % tile) as f32;
                let y = (((i + 3) * 53) % tile) as f32;
                let angle = i as f32 * PI / 3.0;
                let path = segments(&[((x, y), (x + angle.cos() * len, y + angle.sin() * len))]);
                stroke_path(&mut pixmap, path, &stroke);
            }
        }
        PatternKind::Herringbone => {
            let step = (t / 4.0).round().max(2.0);
            let mut lines = Vec::new();
            let mut y = 0.0;
            while y <= t {
                lines.push(((0.0, y), (center, y - step)));
                lines.push(((center, y), (t, y - step)));
                y += step;
            }
            stroke_path(&mut pixmap, segments(&lines), &stroke);
        }
    }
    Some(pixmap)
}

type Segment = ((f32, f32), (f32, f32));

fn segments(lines: &[Segment]) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for ((x0, y0), (x1, y1)) in lines {
        pb.move_to(*x0, *y0);
        pb.line_to(*x1, *y1);
    }
    pb.finish()
}

/// Deterministic value in `[0, 1)` for dot `index`.
fn noise_unit(index: u32) -> f32 {
    let mut h = index
        .wrapping_mul(0x9e37_79b9)
        .wrapping_add(NOISE_SEED);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    (h >> 8) as f32 / (1u32 << 24) as f32
}
