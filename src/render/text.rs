use std::collections::HashMap;
use std::path::PathBuf;

use ab_glyph::{Font, FontArc, FontVec, GlyphId, OutlineCurve, PxScale, ScaleFont};
use fontdb::{Database, Family, Query, Source, Stretch, Style, Weight};
use tiny_skia::{FillRule, LineJoin, Mask, Paint, Path, PathBuilder, Pixmap, Stroke, Transform};

use super::fill::{solid_paint, two_color_gradient};
use super::shadow::{draw_with_shadow, ShadowParams};
use crate::geometry::{rounded_rect_path, Point, Rect};
use crate::scene::{PaintKind, TextNode};

const LINE_HEIGHT_FACTOR: f32 = 1.2;
const FALLBACK_ADVANCE: f32 = 0.6;
const FALLBACK_ASCENT: f32 = 0.8;
const FALLBACK_DESCENT: f32 = 0.2;
const ITALIC_SKEW: f32 = 0.2;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FaceKey {
    family: String,
    bold: bool,
    italic: bool,
}

#[derive(Debug, Clone)]
struct ResolvedFace {
    font: FontArc,
    synthetic_italic: bool,
}

/// System font lookup by family, weight and style, with per-request caching.
pub struct FontBook {
    db: Database,
    faces: HashMap<FaceKey, Option<ResolvedFace>>,
    warned_missing: bool,
}

impl std::fmt::Debug for FontBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBook")
            .field("faces", &self.db.len())
            .field("cached", &self.faces.len())
            .finish()
    }
}

impl Default for FontBook {
    fn default() -> Self {
        Self::empty()
    }
}

impl FontBook {
    /// Book with no faces; text falls back to fixed metrics and draws no glyphs.
    pub fn empty() -> Self {
        Self {
            db: Database::new(),
            faces: HashMap::new(),
            warned_missing: false,
        }
    }

    pub fn system(extra_dirs: &[PathBuf]) -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        for dir in extra_dirs {
            db.load_fonts_dir(dir);
        }
        tracing::debug!(faces = db.len(), "font database loaded");
        Self {
            db,
            faces: HashMap::new(),
            warned_missing: false,
        }
    }

    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    fn resolve(&mut self, family: &str, bold: bool, italic: bool) -> Option<ResolvedFace> {
        let key = FaceKey {
            family: family.to_string(),
            bold,
            italic,
        };
        if let Some(cached) = self.faces.get(&key) {
            return cached.clone();
        }
        let resolved = self.query(family, bold, italic);
        if resolved.is_none() && !self.warned_missing {
            tracing::warn!(family, "no usable font face; text will not be drawn");
            self.warned_missing = true;
        }
        self.faces.insert(key, resolved.clone());
        resolved
    }

    fn query(&self, family: &str, bold: bool, italic: bool) -> Option<ResolvedFace> {
        let families = [Family::Name(family), Family::SansSerif];
        let query = Query {
            families: &families,
            weight: if bold { Weight::BOLD } else { Weight::NORMAL },
            stretch: Stretch::Normal,
            style: if italic { Style::Italic } else { Style::Normal },
        };
        let id = self
            .db
            .query(&query)
            .or_else(|| self.db.faces().next().map(|face| face.id))?;
        let face = self.db.face(id)?;
        let font = load_face(&face.source, face.index)?;
        Some(ResolvedFace {
            font,
            synthetic_italic: italic && face.style == Style::Normal,
        })
    }
}

fn load_face(source: &Source, index: u32) -> Option<FontArc> {
    let data = match source {
        Source::Binary(data) => data.as_ref().as_ref().to_vec(),
        Source::File(path) => match std::fs::read(path) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read font file");
                return None;
            }
        },
        Source::SharedFile(_, data) => data.as_ref().as_ref().to_vec(),
    };
    match FontVec::try_from_vec_and_index(data, index) {
        Ok(font) => Some(FontArc::new(font)),
        Err(err) => {
            tracing::warn!(error = %err, "failed to decode font face");
            None
        }
    }
}

/// One measured line of a text block, in canvas pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct LineLayout {
    pub text: String,
    pub width: f32,
    pub height: f32,
    /// Top edge of the line box.
    pub top: f32,
}

/// Measured text block placed at its canvas anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub anchor_x: f32,
    pub top: f32,
    pub font_size: f32,
    pub max_width: f32,
    pub lines: Vec<LineLayout>,
}

impl TextLayout {
    pub fn total_height(&self) -> f32 {
        self.lines.iter().map(|line| line.height).sum()
    }

    /// Left edge of the widest line, which also bounds the block.
    pub fn block_left(&self, align: crate::scene::TextAlign) -> f32 {
        self.anchor_x + align.left_offset(self.max_width)
    }

    pub fn bounds(&self, align: crate::scene::TextAlign) -> Rect {
        Rect::new(
            self.block_left(align),
            self.top,
            self.max_width,
            self.total_height(),
        )
    }
}

struct FaceMetrics<'a> {
    face: Option<&'a ResolvedFace>,
    size: f32,
}

impl FaceMetrics<'_> {
    fn scale(font: &FontArc, size: f32) -> PxScale {
        let em = font.units_per_em().unwrap_or(1000.0);
        PxScale::from(size * font.height_unscaled() / em)
    }

    fn width(&self, text: &str) -> f32 {
        let Some(face) = self.face else {
            return text.chars().count() as f32 * self.size * FALLBACK_ADVANCE;
        };
        let scaled = face.font.as_scaled(Self::scale(&face.font, self.size));
        let mut width = 0.0_f32;
        let mut previous: Option<GlyphId> = None;
        for ch in text.chars() {
            if ch.is_control() {
                continue;
            }
            let glyph = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                width += scaled.kern(prev, glyph);
            }
            width += scaled.h_advance(glyph);
            previous = Some(glyph);
        }
        width.max(0.0)
    }

    /// Ink height of `text`; zero when nothing has an outline.
    fn ink_height(&self, text: &str) -> f32 {
        let Some(face) = self.face else {
            return self.size * (FALLBACK_ASCENT + FALLBACK_DESCENT);
        };
        let scaled = face.font.as_scaled(Self::scale(&face.font, self.size));
        let mut top = f32::MAX;
        let mut bottom = f32::MIN;
        for ch in text.chars().filter(|ch| !ch.is_control()) {
            let glyph = scaled.scaled_glyph(ch);
            if let Some(outline) = face.font.outline_glyph(glyph) {
                let bounds = outline.px_bounds();
                top = top.min(bounds.min.y);
                bottom = bottom.max(bounds.max.y);
            }
        }
        if bottom > top {
            bottom - top
        } else {
            0.0
        }
    }

    fn line_height(&self, text: &str) -> f32 {
        let ink = self.ink_height(text);
        let ink = if ink > 0.0 { ink } else { self.size };
        self.size.max(ink) * LINE_HEIGHT_FACTOR
    }

    /// Distance from the top of the em box to the baseline.
    fn baseline_offset(&self) -> f32 {
        let Some(face) = self.face else {
            return self.size * FALLBACK_ASCENT;
        };
        let ascent = face.font.ascent_unscaled();
        let descent = face.font.descent_unscaled().abs();
        if ascent + descent > 0.0 {
            self.size * ascent / (ascent + descent)
        } else {
            self.size * FALLBACK_ASCENT
        }
    }

    /// Glyph outlines for `text` with the em box top-left at (`left`, `top`).
    fn line_path(&self, text: &str, left: f32, top: f32) -> Option<Path> {
        let face = self.face?;
        let font = &face.font;
        let scaled = font.as_scaled(Self::scale(font, self.size));
        let (sx, sy) = (scaled.h_scale_factor(), scaled.v_scale_factor());
        let baseline = top + self.baseline_offset();
        let skew = if face.synthetic_italic { ITALIC_SKEW } else { 0.0 };

        let mut pb = PathBuilder::new();
        let mut pen = left;
        let mut previous: Option<GlyphId> = None;
        for ch in text.chars() {
            if ch.is_control() {
                continue;
            }
            let glyph = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                pen += scaled.kern(prev, glyph);
            }
            if let Some(outline) = font.outline(glyph) {
                let map = |p: ab_glyph::Point| {
                    let y = baseline - p.y * sy;
                    (pen + p.x * sx + (baseline - y) * skew, y)
                };
                let mut cursor: Option<ab_glyph::Point> = None;
                for curve in &outline.curves {
                    let start = match curve {
                        OutlineCurve::Line(p0, _)
                        | OutlineCurve::Quad(p0, _, _)
                        | OutlineCurve::Cubic(p0, _, _, _) => *p0,
                    };
                    if cursor != Some(start) {
                        if cursor.is_some() {
                            pb.close();
                        }
                        let (x, y) = map(start);
                        pb.move_to(x, y);
                    }
                    let end = match curve {
                        OutlineCurve::Line(_, p1) => {
                            let (x, y) = map(*p1);
                            pb.line_to(x, y);
                            *p1
                        }
                        OutlineCurve::Quad(_, p1, p2) => {
                            let (x1, y1) = map(*p1);
                            let (x2, y2) = map(*p2);
                            pb.quad_to(x1, y1, x2, y2);
                            *p2
                        }
                        OutlineCurve::Cubic(_, p1, p2, p3) => {
                            let (x1, y1) = map(*p1);
                            let (x2, y2) = map(*p2);
                            let (x3, y3) = map(*p3);
                            pb.cubic_to(x1, y1, x2, y2, x3, y3);
                            *p3
                        }
                    };
                    cursor = Some(end);
                }
                if cursor.is_some() {
                    pb.close();
                }
            }
            pen += scaled.h_advance(glyph);
            previous = Some(glyph);
        }
        pb.finish()
    }
}

impl FontBook {
    /// Measures `node` with its anchor at `anchor` (canvas pixels).
    pub fn layout(&mut self, node: &TextNode, anchor: Point) -> TextLayout {
        let face = self.resolve(&node.font_family, node.bold, node.italic);
        let metrics = FaceMetrics {
            face: face.as_ref(),
            size: node.effective_font_size(),
        };
        layout_with(&metrics, node, anchor)
    }
}

fn layout_with(metrics: &FaceMetrics<'_>, node: &TextNode, anchor: Point) -> TextLayout {
    let mut cursor = anchor.y;
    let mut max_width = 0.0_f32;
    let lines = node
        .lines()
        .map(|text| {
            let width = metrics.width(text);
            let height = metrics.line_height(text);
            max_width = max_width.max(width);
            let line = LineLayout {
                text: text.to_string(),
                width,
                height,
                top: cursor,
            };
            cursor += height;
            line
        })
        .collect();
    TextLayout {
        anchor_x: anchor.x,
        top: anchor.y,
        font_size: metrics.size,
        max_width,
        lines,
    }
}

/// Draws `node` and returns its block bounds in canvas pixels.
pub(crate) fn draw_text(
    surface: &mut Pixmap,
    fonts: &mut FontBook,
    node: &TextNode,
    anchor: Point,
    base: Transform,
    pixel_ratio: f32,
    clip: Option<&Mask>,
) -> Rect {
    let face = fonts.resolve(&node.font_family, node.bold, node.italic);
    let metrics = FaceMetrics {
        face: face.as_ref(),
        size: node.effective_font_size(),
    };
    let layout = layout_with(&metrics, node, anchor);
    let bounds = layout.bounds(node.align);

    if node.background.enabled {
        draw_text_background(surface, node, bounds, base, clip);
    }
    if metrics.face.is_none() {
        return bounds;
    }

    let glyph_paths = layout
        .lines
        .iter()
        .filter_map(|line| {
            let left = layout.anchor_x + node.align.left_offset(line.width);
            metrics
                .line_path(&line.text, left, line.top)
                .map(|path| (line.top, path))
        })
        .collect::<Vec<_>>();
    if glyph_paths.is_empty() {
        return bounds;
    }

    let outline_width = if node.outline.enabled && node.outline.width.is_finite() {
        node.outline.width.max(0.0)
    } else {
        0.0
    };
    let outline = (outline_width > 0.0).then(|| {
        (
            solid_paint(node.outline.color),
            Stroke {
                width: outline_width,
                line_join: LineJoin::Round,
                ..Stroke::default()
            },
        )
    });
    let gradient_left = bounds.x;
    let span = layout.max_width.max(layout.font_size);
    let fill_paint = |line_top: f32| -> Paint<'static> {
        match node.fill.kind {
            PaintKind::Solid => solid_paint(node.fill.color),
            PaintKind::Linear => two_color_gradient(
                Point::new(gradient_left, line_top),
                span,
                node.fill.angle_degrees,
                node.fill.color,
                node.fill.color2,
            )
            .map(|shader| Paint {
                shader,
                ..Paint::default()
            })
            .unwrap_or_else(|| solid_paint(node.fill.color)),
        }
    };

    draw_with_shadow(
        surface,
        ShadowParams::from_node(&node.shadow),
        pixel_ratio,
        base,
        bounds.inflate(outline_width + layout.font_size * ITALIC_SKEW),
        clip,
        |pixmap, ts, mask| {
            for (line_top, path) in &glyph_paths {
                if let Some((paint, stroke)) = &outline {
                    pixmap.stroke_path(path, paint, stroke, ts, mask);
                }
                pixmap.fill_path(path, &fill_paint(*line_top), FillRule::Winding, ts, mask);
            }
        },
    );
    bounds
}

fn draw_text_background(
    surface: &mut Pixmap,
    node: &TextNode,
    bounds: Rect,
    base: Transform,
    clip: Option<&Mask>,
) {
    let style = &node.background;
    let non_negative = |value: f32| if value.is_finite() { value.max(0.0) } else { 0.0 };
    let pad_x = non_negative(style.padding_x);
    let pad_y = non_negative(style.padding_y);
    let rect = Rect::new(
        bounds.x - pad_x,
        bounds.y - pad_y,
        bounds.w + pad_x * 2.0,
        bounds.h + pad_y * 2.0,
    );
    let Some(path) = rounded_rect_path(rect, non_negative(style.corner_radius)) else {
        return;
    };
    let alpha = if style.alpha.is_finite() {
        style.alpha.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let paint = match style.kind {
        PaintKind::Solid => solid_paint(style.color.with_opacity(alpha)),
        PaintKind::Linear => two_color_gradient(
            rect.center(),
            rect.w.max(rect.h),
            style.angle_degrees,
            style.color.with_opacity(alpha),
            style.color2.with_opacity(alpha),
        )
        .map(|shader| Paint {
            shader,
            ..Paint::default()
        })
        .unwrap_or_else(|| solid_paint(style.color.with_opacity(alpha))),
    };
    surface.fill_path(&path, &paint, FillRule::Winding, base, clip);
}
