use std::f32::consts::PI;

use tiny_skia::{FillRule, LineCap, LineJoin, Mask, Path, PathBuilder, Pixmap, Stroke, Transform};

use super::fill::solid_paint;
use super::shadow::{draw_with_shadow, ShadowParams};
use crate::geometry::{ellipse_path, polyline_path, Point, Rect};
use crate::scene::{ShapeKind, ShapeNode};

/// Paths for one shape in canvas space, before rotation.
struct ShapePaths {
    fill: Option<Path>,
    stroke: Option<Path>,
}

fn shape_paths(shape: &ShapeNode, origin: Point) -> ShapePaths {
    let x = origin.x + shape.x;
    let y = origin.y + shape.y;
    let (w, h) = (shape.w, shape.h);
    match shape.kind {
        ShapeKind::Rectangle => {
            let path = Rect::new(x, y, w, h).to_skia().map(PathBuilder::from_rect);
            ShapePaths {
                fill: path.clone(),
                stroke: path,
            }
        }
        ShapeKind::Circle => {
            let path = ellipse_path(Point::new(x + w / 2.0, y + h / 2.0), w / 2.0, h / 2.0);
            ShapePaths {
                fill: path.clone(),
                stroke: path,
            }
        }
        ShapeKind::Triangle => {
            let points = [
                Point::new(x + w / 2.0, y),
                Point::new(x + w, y + h),
                Point::new(x, y + h),
            ];
            let path = polyline_path(&points, true);
            ShapePaths {
                fill: path.clone(),
                stroke: path,
            }
        }
        ShapeKind::Line => ShapePaths {
            fill: None,
            stroke: segment(x, y, x + w, y + h, None),
        },
        ShapeKind::Arrow => {
            let head = shape.arrow_head();
            let angle = h.atan2(w);
            let end = (x + w, y + h);
            let barbs = [angle - PI / 6.0, angle + PI / 6.0]
                .map(|a| (end.0 - head * a.cos(), end.1 - head * a.sin()));
            ShapePaths {
                fill: None,
                stroke: segment(x, y, end.0, end.1, Some((end, barbs))),
            }
        }
    }
}

type Barbs = ((f32, f32), [(f32, f32); 2]);

fn segment(x0: f32, y0: f32, x1: f32, y1: f32, barbs: Option<Barbs>) -> Option<Path> {
    let mut pb = PathBuilder::new();
    pb.move_to(x0, y0);
    pb.line_to(x1, y1);
    if let Some((end, tips)) = barbs {
        for tip in tips {
            pb.move_to(end.0, end.1);
            pb.line_to(tip.0, tip.1);
        }
    }
    pb.finish()
}

/// Canvas-space bounds including stroke and arrow heads, before rotation.
pub(crate) fn shape_extent(shape: &ShapeNode, origin: Point) -> Rect {
    let rect = shape.bounds().translate(origin.x, origin.y);
    let reach = shape.stroke.effective_width() / 2.0
        + if shape.kind == ShapeKind::Arrow {
            shape.arrow_head()
        } else {
            0.0
        };
    rect.inflate(reach)
}

/// Draws `shape` with its origin at `origin` (canvas pixels).
pub(crate) fn draw_shape(
    surface: &mut Pixmap,
    shape: &ShapeNode,
    origin: Point,
    base: Transform,
    pixel_ratio: f32,
    clip: Option<&Mask>,
) {
    let paths = shape_paths(shape, origin);
    let rotation = shape.effective_rotation();
    let transform = if rotation == 0.0 {
        base
    } else {
        let center = shape.geometry().center();
        base.pre_concat(Transform::from_rotate_at(
            rotation,
            origin.x + center.x,
            origin.y + center.y,
        ))
    };
    let stroke = Stroke {
        width: shape.stroke.effective_width(),
        line_cap: if shape.kind.is_segment() {
            LineCap::Round
        } else {
            LineCap::Butt
        },
        line_join: LineJoin::Miter,
        ..Stroke::default()
    };
    let stroke_paint = solid_paint(shape.stroke.color);
    let fill_paint = solid_paint(shape.fill.color);
    let fill_enabled = shape.fill.enabled;

    draw_with_shadow(
        surface,
        ShadowParams::from_node(&shape.shadow),
        pixel_ratio,
        transform,
        shape_extent(shape, origin),
        clip,
        |pixmap, ts, mask| {
            if fill_enabled {
                if let Some(path) = &paths.fill {
                    pixmap.fill_path(path, &fill_paint, FillRule::Winding, ts, mask);
                }
            }
            if let Some(path) = &paths.stroke {
                pixmap.stroke_path(path, &stroke_paint, &stroke, ts, mask);
            }
        },
    );
}
