use super::handles::Handle;
use crate::geometry::{Point, Rect};
use crate::scene::{NodeId, Scene, SceneLayout, ShapeNode};

/// Pointer slack around node bounds, in canvas pixels.
pub const HIT_PADDING: f32 = 4.0;

/// What a pointer-down landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    ShapeHandle { id: NodeId, handle: Handle },
    Rotate(NodeId),
    Shape(NodeId),
    Text(NodeId),
    CropHandle(Handle),
    CropBody,
    Canvas,
}

/// Topmost shape under `point` (canvas pixels).
pub fn shape_at(scene: &Scene, layout: &SceneLayout, point: Point) -> Option<NodeId> {
    scene
        .shapes()
        .iter()
        .rev()
        .find(|shape| shape_contains(shape, layout.anchor_origin(shape.anchor), point))
        .map(|shape| shape.id)
}

/// Topmost text block under `point`, from bounds measured by the last render.
pub fn text_at(text_bounds: &[(NodeId, Rect)], point: Point) -> Option<NodeId> {
    text_bounds
        .iter()
        .rev()
        .find(|(_, bounds)| bounds.contains(point, HIT_PADDING))
        .map(|(id, _)| *id)
}

fn shape_contains(shape: &ShapeNode, origin: Point, point: Point) -> bool {
    let reach = HIT_PADDING.max(shape.stroke.effective_width() / 2.0);
    if shape.kind.is_segment() {
        let start = Point::new(origin.x + shape.x, origin.y + shape.y);
        let end = start.offset(shape.w, shape.h);
        return distance_to_segment(point, start, end) <= reach;
    }
    let bounds = shape.bounds().translate(origin.x, origin.y);
    let rotation = shape.effective_rotation();
    let local = point.rotated_around(bounds.center(), -rotation.to_radians());
    bounds.contains(local, reach)
}

fn distance_to_segment(point: Point, start: Point, end: Point) -> f32 {
    let (vx, vy) = (end.x - start.x, end.y - start.y);
    let length_sq = vx * vx + vy * vy;
    let t = if length_sq <= f32::EPSILON {
        0.0
    } else {
        (((point.x - start.x) * vx + (point.y - start.y) * vy) / length_sq).clamp(0.0, 1.0)
    };
    let closest = Point::new(start.x + vx * t, start.y + vy * t);
    (point.x - closest.x).hypot(point.y - closest.y)
}
