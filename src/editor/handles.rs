use std::f32::consts::FRAC_PI_4;

use super::EditorViewport;
use crate::geometry::{Point, Rect};
use crate::scene::{ShapeGeometry, ShapeKind, ShapeNode};

/// Grid unit for snapping shape geometry, in canvas pixels.
pub const GRID_SIZE: f32 = 8.0;
/// Distance of the rotate handle above the selection box, in screen pixels.
pub const ROTATE_HANDLE_OFFSET: f32 = 16.0;
/// Pointer reach of a handle, in screen pixels.
pub const HANDLE_HIT_RADIUS: f32 = 6.0;
/// Smallest edge a box shape (or length a segment) can be resized down to.
pub const SHAPE_MIN_SIZE: f32 = 10.0;
const ROTATE_SNAP_DEGREES: f32 = 15.0;
const RATIO_EPSILON: f32 = 1e-6;

/// Compass handle on a selection box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    NorthWest,
    North,
    NorthEast,
    West,
    East,
    SouthWest,
    South,
    SouthEast,
}

impl Handle {
    pub const ALL: [Handle; 8] = [
        Self::NorthWest,
        Self::North,
        Self::NorthEast,
        Self::West,
        Self::East,
        Self::SouthWest,
        Self::South,
        Self::SouthEast,
    ];

    pub const fn has_west(self) -> bool {
        matches!(self, Self::NorthWest | Self::West | Self::SouthWest)
    }

    pub const fn has_east(self) -> bool {
        matches!(self, Self::NorthEast | Self::East | Self::SouthEast)
    }

    pub const fn has_north(self) -> bool {
        matches!(self, Self::NorthWest | Self::North | Self::NorthEast)
    }

    pub const fn has_south(self) -> bool {
        matches!(self, Self::SouthWest | Self::South | Self::SouthEast)
    }

    pub const fn is_corner(self) -> bool {
        matches!(
            self,
            Self::NorthWest | Self::NorthEast | Self::SouthWest | Self::SouthEast
        )
    }

    /// Where this handle sits on `rect`.
    pub fn position_on(self, rect: Rect) -> Point {
        let x = if self.has_west() {
            rect.x
        } else if self.has_east() {
            rect.right()
        } else {
            rect.x + rect.w / 2.0
        };
        let y = if self.has_north() {
            rect.y
        } else if self.has_south() {
            rect.bottom()
        } else {
            rect.y + rect.h / 2.0
        };
        Point::new(x, y)
    }
}

/// Screen placement of a selected shape's handles.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeHandles {
    /// Selection box in screen pixels, before rotation.
    pub frame: Rect,
    /// Hidden while a non-segment shape is rotated.
    pub compass: Vec<(Handle, Point)>,
    pub rotate: Point,
    pub center: Point,
}

impl ShapeHandles {
    pub fn for_shape(shape: &ShapeNode, origin: Point, viewport: &EditorViewport) -> Self {
        let bounds = shape.bounds().translate(origin.x, origin.y);
        let top_left = viewport.canvas_to_screen(Point::new(bounds.x, bounds.y));
        let zoom = viewport.zoom();
        let frame = Rect::new(top_left.x, top_left.y, bounds.w * zoom, bounds.h * zoom);
        let center = frame.center();
        let rotation = shape.effective_rotation();

        let compass = if rotation == 0.0 {
            Handle::ALL
                .iter()
                .map(|handle| (*handle, handle.position_on(frame)))
                .collect()
        } else {
            Vec::new()
        };
        let rotate = Point::new(center.x, frame.y - ROTATE_HANDLE_OFFSET)
            .rotated_around(center, rotation.to_radians());

        Self {
            frame,
            compass,
            rotate,
            center,
        }
    }

    /// Nearest compass handle within reach; small boxes put several in range.
    pub fn handle_at(&self, screen: Point) -> Option<Handle> {
        nearest_handle(&self.compass, screen)
    }

    pub fn is_rotate_at(&self, screen: Point) -> bool {
        within_reach(self.rotate, screen)
    }
}

fn within_reach(handle: Point, pointer: Point) -> bool {
    (pointer.x - handle.x).abs() <= HANDLE_HIT_RADIUS
        && (pointer.y - handle.y).abs() <= HANDLE_HIT_RADIUS
}

pub(crate) fn nearest_handle(handles: &[(Handle, Point)], pointer: Point) -> Option<Handle> {
    handles
        .iter()
        .filter(|(_, position)| within_reach(*position, pointer))
        .min_by(|(_, a), (_, b)| {
            let da = (a.x - pointer.x).hypot(a.y - pointer.y);
            let db = (b.x - pointer.x).hypot(b.y - pointer.y);
            da.total_cmp(&db)
        })
        .map(|(handle, _)| *handle)
}

fn sign(value: f32) -> f32 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

pub fn snap_value(value: f32, grid: f32) -> f32 {
    if grid <= 0.0 {
        return value;
    }
    (value / grid).round() * grid
}

pub fn snap_geometry(geometry: ShapeGeometry, grid: f32) -> ShapeGeometry {
    ShapeGeometry {
        x: snap_value(geometry.x, grid),
        y: snap_value(geometry.y, grid),
        w: snap_value(geometry.w, grid),
        h: snap_value(geometry.h, grid),
    }
}

/// Folds an angle into (-180, 180].
pub fn normalize_degrees(degrees: f32) -> f32 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let folded = degrees.rem_euclid(360.0);
    if folded > 180.0 {
        folded - 360.0
    } else {
        folded
    }
}

/// Rotates `(x, y)` onto the nearest 45° direction, keeping its length.
fn snap_direction(x: f32, y: f32) -> (f32, f32) {
    let length = x.hypot(y);
    if length <= 0.0 {
        return (x, y);
    }
    let angle = (y.atan2(x) / FRAC_PI_4).round() * FRAC_PI_4;
    (length * angle.cos(), length * angle.sin())
}

/// Geometry after dragging `handle` by `(dx, dy)` canvas pixels from `start`.
///
/// `keep_ratio` holds the start aspect (1:1 for circles) for box shapes and
/// snaps segments to 45° around their midpoint.
pub fn resize_shape(
    kind: ShapeKind,
    start: ShapeGeometry,
    handle: Handle,
    dx: f32,
    dy: f32,
    keep_ratio: bool,
) -> ShapeGeometry {
    let next = resize_free(kind, start, handle, dx, dy, keep_ratio);
    clamp_min_extent(kind, start, next, handle, keep_ratio)
}

fn resize_free(
    kind: ShapeKind,
    start: ShapeGeometry,
    handle: Handle,
    dx: f32,
    dy: f32,
    keep_ratio: bool,
) -> ShapeGeometry {
    let ShapeGeometry {
        x: sx,
        y: sy,
        w: sw,
        h: sh,
    } = start;
    let mut next = start;
    if handle.has_west() {
        next.x = sx + dx;
        next.w = sw - dx;
    }
    if handle.has_east() {
        next.w = sw + dx;
    }
    if handle.has_north() {
        next.y = sy + dy;
        next.h = sh - dy;
    }
    if handle.has_south() {
        next.h = sh + dy;
    }
    if !keep_ratio {
        return next;
    }

    if kind.is_segment() {
        let center = start.center();
        let anchor_x = if handle.has_west() { next.x } else { sx };
        let anchor_y = if handle.has_north() { next.y } else { sy };
        let end_x = if anchor_x == sx { next.x + next.w } else { anchor_x };
        let end_y = if anchor_y == sy { next.y + next.h } else { anchor_y };
        let (vx, vy) = snap_direction(end_x - center.x, end_y - center.y);
        if vx == 0.0 && vy == 0.0 {
            return next;
        }
        return ShapeGeometry {
            x: center.x - vx,
            y: center.y - vy,
            w: vx * 2.0,
            h: vy * 2.0,
        };
    }

    let ratio = if kind == ShapeKind::Circle {
        1.0
    } else {
        sw.abs() / sh.abs().max(RATIO_EPSILON)
    };
    match handle {
        Handle::East | Handle::West => {
            next.h = sign(next.h) * next.w.abs() / ratio;
            next.y = sy + (sh - next.h) / 2.0;
        }
        Handle::North | Handle::South => {
            next.w = sign(next.w) * next.h.abs() * ratio;
            next.x = sx + (sw - next.w) / 2.0;
        }
        _ => {
            if (next.w - sw).abs() > (next.h - sh).abs() {
                next.h = sign(next.h) * next.w.abs() / ratio;
            } else {
                next.w = sign(next.w) * next.h.abs() * ratio;
            }
            next.x = if handle.has_west() { sx + (sw - next.w) } else { sx };
            next.y = if handle.has_north() { sy + (sh - next.h) } else { sy };
        }
    }
    next
}

/// Grows a resized shape back to [`SHAPE_MIN_SIZE`], keeping the edges the
/// handle does not drag where they were at drag start.
pub fn clamp_min_extent(
    kind: ShapeKind,
    start: ShapeGeometry,
    next: ShapeGeometry,
    handle: Handle,
    keep_ratio: bool,
) -> ShapeGeometry {
    if kind.is_segment() {
        return clamp_segment_length(start, next, handle, keep_ratio);
    }

    let (min_w, min_h) = if keep_ratio {
        let ratio = if kind == ShapeKind::Circle {
            1.0
        } else {
            start.w.abs() / start.h.abs().max(RATIO_EPSILON)
        };
        if ratio >= 1.0 {
            (SHAPE_MIN_SIZE * ratio, SHAPE_MIN_SIZE)
        } else {
            (SHAPE_MIN_SIZE, SHAPE_MIN_SIZE / ratio.max(RATIO_EPSILON))
        }
    } else {
        (SHAPE_MIN_SIZE, SHAPE_MIN_SIZE)
    };
    let mut w = next.w;
    let mut h = next.h;
    if keep_ratio {
        // Both axes grow together so the kept ratio survives.
        if w.abs() < min_w || h.abs() < min_h {
            w = signed_like(w, start.w) * min_w;
            h = signed_like(h, start.h) * min_h;
        }
    } else {
        if w.abs() < min_w {
            w = signed_like(w, start.w) * min_w;
        }
        if h.abs() < min_h {
            h = signed_like(h, start.h) * min_h;
        }
    }
    if w == next.w && h == next.h {
        return next;
    }

    let x = if handle.has_west() {
        start.x + start.w - w
    } else if handle.has_east() {
        start.x
    } else if keep_ratio {
        start.x + (start.w - w) / 2.0
    } else {
        next.x
    };
    let y = if handle.has_north() {
        start.y + start.h - h
    } else if handle.has_south() {
        start.y
    } else if keep_ratio {
        start.y + (start.h - h) / 2.0
    } else {
        next.y
    };
    ShapeGeometry { x, y, w, h }
}

fn clamp_segment_length(
    start: ShapeGeometry,
    next: ShapeGeometry,
    handle: Handle,
    keep_ratio: bool,
) -> ShapeGeometry {
    let length = next.w.hypot(next.h);
    if length >= SHAPE_MIN_SIZE {
        return next;
    }
    let (ux, uy) = if length > 0.0 {
        (next.w / length, next.h / length)
    } else {
        let start_length = start.w.hypot(start.h);
        if start_length > 0.0 {
            (start.w / start_length, start.h / start_length)
        } else {
            (1.0, 0.0)
        }
    };
    let w = ux * SHAPE_MIN_SIZE;
    let h = uy * SHAPE_MIN_SIZE;
    if keep_ratio {
        let center = next.center();
        return ShapeGeometry {
            x: center.x - w / 2.0,
            y: center.y - h / 2.0,
            w,
            h,
        };
    }
    // The endpoint on the side the handle does not drag stays fixed.
    let x = if handle.has_west() {
        next.x + next.w - w
    } else {
        next.x
    };
    let y = if handle.has_north() {
        next.y + next.h - h
    } else {
        next.y
    };
    ShapeGeometry { x, y, w, h }
}

fn signed_like(value: f32, fallback: f32) -> f32 {
    if value != 0.0 {
        sign(value)
    } else {
        sign(fallback)
    }
}

/// Extent of a shape being placed by a drag of `(dx, dy)` canvas pixels.
///
/// `uniform` forces 1:1 boxes and 45° segments; `aspect` (w/h) locks boxes to
/// that ratio, growing the lagging axis.
pub fn placement_extent(
    kind: ShapeKind,
    dx: f32,
    dy: f32,
    uniform: bool,
    aspect: Option<f32>,
) -> (f32, f32) {
    if kind.is_segment() {
        return if uniform { snap_direction(dx, dy) } else { (dx, dy) };
    }
    let target = if uniform {
        Some(1.0)
    } else {
        aspect.filter(|ratio| ratio.is_finite() && *ratio > 0.0)
    };
    let Some(target) = target else {
        return (dx, dy);
    };
    let (w, h) = (dx.abs(), dy.abs());
    if w >= h * target {
        (dx, sign(dy) * w / target)
    } else {
        (sign(dx) * h * target, dy)
    }
}

/// Result of a rotate-handle drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rotation {
    Degrees(f32),
    /// Segments rotate their direction vector about the midpoint instead.
    Segment(ShapeGeometry),
}

/// Applies `delta` radians of pointer sweep to the shape captured at drag start.
pub fn rotate_shape(
    kind: ShapeKind,
    start: ShapeGeometry,
    start_degrees: f32,
    delta: f32,
    snap: bool,
) -> Rotation {
    let delta = if snap {
        let step = ROTATE_SNAP_DEGREES.to_radians();
        (delta / step).round() * step
    } else {
        delta
    };
    if kind.is_segment() {
        let center = start.center();
        let (half_w, half_h) = (start.w / 2.0, start.h / 2.0);
        let (sin, cos) = delta.sin_cos();
        let rx = half_w * cos - half_h * sin;
        let ry = half_w * sin + half_h * cos;
        return Rotation::Segment(ShapeGeometry {
            x: center.x - rx,
            y: center.y - ry,
            w: rx * 2.0,
            h: ry * 2.0,
        });
    }
    Rotation::Degrees(normalize_degrees(start_degrees + delta.to_degrees()))
}

/// Angle of `pointer` around `center`, in radians.
pub fn pointer_angle(center: Point, pointer: Point) -> f32 {
    (pointer.y - center.y).atan2(pointer.x - center.x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    fn geometry(x: f32, y: f32, w: f32, h: f32) -> ShapeGeometry {
        ShapeGeometry { x, y, w, h }
    }

    #[test]
    fn edge_handles_touch_one_axis() {
        let start = geometry(10.0, 10.0, 100.0, 50.0);
        let east = resize_shape(ShapeKind::Rectangle, start, Handle::East, 20.0, 30.0, false);
        assert_eq!(east, geometry(10.0, 10.0, 120.0, 50.0));
        let north = resize_shape(ShapeKind::Rectangle, start, Handle::North, 20.0, 10.0, false);
        assert_eq!(north, geometry(10.0, 20.0, 100.0, 40.0));
    }

    #[test]
    fn corner_handle_moves_origin_and_extent() {
        let start = geometry(10.0, 10.0, 100.0, 50.0);
        let next = resize_shape(ShapeKind::Rectangle, start, Handle::NorthWest, -10.0, 5.0, false);
        assert_eq!(next, geometry(0.0, 15.0, 110.0, 45.0));
    }

    #[test]
    fn shift_corner_keeps_start_ratio() {
        let start = geometry(0.0, 0.0, 100.0, 50.0);
        let next = resize_shape(ShapeKind::Rectangle, start, Handle::SouthEast, 40.0, 5.0, true);
        assert!(close(next.w, 140.0));
        assert!(close(next.h, 70.0));
        assert_eq!((next.x, next.y), (0.0, 0.0));

        let pulled = resize_shape(ShapeKind::Rectangle, start, Handle::NorthWest, 10.0, -30.0, true);
        assert!(close(pulled.w / pulled.h, 2.0));
        assert!(close(pulled.x + pulled.w, 100.0));
        assert!(close(pulled.y + pulled.h, 50.0));
    }

    #[test]
    fn shift_circle_stays_round() {
        let start = geometry(0.0, 0.0, 80.0, 40.0);
        let next = resize_shape(ShapeKind::Circle, start, Handle::East, 20.0, 0.0, true);
        assert!(close(next.w, 100.0));
        assert!(close(next.h, 100.0));
    }

    #[test]
    fn shift_segment_snaps_to_diagonal_around_midpoint() {
        let start = geometry(0.0, 0.0, 100.0, 10.0);
        let next = resize_shape(ShapeKind::Line, start, Handle::SouthEast, 0.0, 80.0, true);
        assert!(close(next.w, next.h));
        let center = next.center();
        assert!(close(center.x, 50.0));
        assert!(close(center.y, 5.0));
    }

    #[test]
    fn shrinking_past_minimum_keeps_opposite_edge() {
        let start = geometry(0.0, 0.0, 100.0, 50.0);
        let east = resize_shape(ShapeKind::Rectangle, start, Handle::East, -95.0, 0.0, false);
        assert_eq!(east, geometry(0.0, 0.0, SHAPE_MIN_SIZE, 50.0));

        let west = resize_shape(ShapeKind::Rectangle, start, Handle::West, 95.0, 0.0, false);
        assert_eq!(west, geometry(90.0, 0.0, SHAPE_MIN_SIZE, 50.0));

        let north = resize_shape(ShapeKind::Rectangle, start, Handle::North, 0.0, 48.0, false);
        assert_eq!(north, geometry(0.0, 40.0, 100.0, SHAPE_MIN_SIZE));

        // Dragging far past the opposite edge flips the box instead.
        let flipped = resize_shape(ShapeKind::Rectangle, start, Handle::East, -150.0, 0.0, false);
        assert_eq!(flipped.w, -50.0);
    }

    #[test]
    fn ratio_locked_minimum_keeps_ratio_and_anchor() {
        let start = geometry(0.0, 0.0, 100.0, 50.0);
        let next = resize_shape(ShapeKind::Rectangle, start, Handle::NorthWest, 95.0, 48.0, true);
        assert!(close(next.w, 20.0));
        assert!(close(next.h, 10.0));
        assert!(close(next.x + next.w, 100.0));
        assert!(close(next.y + next.h, 50.0));

        let side = resize_shape(ShapeKind::Rectangle, start, Handle::West, 95.0, 0.0, true);
        assert!(close(side.w, 20.0));
        assert!(close(side.h, 10.0));
        assert!(close(side.x, 80.0));
        assert!(close(side.y, 20.0));
    }

    #[test]
    fn segments_keep_minimum_length() {
        let start = geometry(0.0, 0.0, 100.0, 0.0);
        let next = resize_shape(ShapeKind::Line, start, Handle::East, -97.0, 0.0, false);
        assert_eq!(next, geometry(0.0, 0.0, SHAPE_MIN_SIZE, 0.0));

        let collapsed = resize_shape(ShapeKind::Arrow, start, Handle::West, 100.0, 0.0, false);
        assert!(close(collapsed.w.hypot(collapsed.h), SHAPE_MIN_SIZE));
        assert!(close(collapsed.x + collapsed.w, 100.0));
    }

    #[test]
    fn snapped_resize_is_clamped_again() {
        let start = geometry(0.0, 0.0, 64.0, 32.0);
        let resized = resize_shape(ShapeKind::Rectangle, start, Handle::East, -53.0, 0.0, false);
        assert_eq!(resized.w, 11.0);
        let snapped = snap_geometry(resized, GRID_SIZE);
        assert_eq!(snapped.w, 8.0);
        let clamped = clamp_min_extent(ShapeKind::Rectangle, start, snapped, Handle::East, false);
        assert_eq!(clamped, geometry(0.0, 0.0, SHAPE_MIN_SIZE, 32.0));
    }

    #[test]
    fn snapping_rounds_to_grid() {
        let snapped = snap_geometry(geometry(3.0, 12.0, 37.0, -5.0), GRID_SIZE);
        assert_eq!(snapped, geometry(0.0, 16.0, 40.0, -8.0));
        assert_eq!(snap_value(13.0, 0.0), 13.0);
    }

    #[test]
    fn degrees_fold_into_half_open_range() {
        assert_eq!(normalize_degrees(190.0), -170.0);
        assert_eq!(normalize_degrees(180.0), 180.0);
        assert_eq!(normalize_degrees(-180.0), 180.0);
        assert_eq!(normalize_degrees(f32::NAN), 0.0);
    }

    #[test]
    fn box_rotation_accumulates_and_snaps() {
        let start = geometry(0.0, 0.0, 10.0, 10.0);
        let free = rotate_shape(ShapeKind::Rectangle, start, 10.0, 0.2, false);
        let Rotation::Degrees(degrees) = free else {
            panic!("box shapes rotate by degrees");
        };
        assert!(close(degrees, 10.0 + 0.2_f32.to_degrees()));

        let snapped = rotate_shape(ShapeKind::Rectangle, start, 0.0, 0.30, true);
        let Rotation::Degrees(degrees) = snapped else {
            panic!("box shapes rotate by degrees");
        };
        assert!(close(degrees, 15.0));
    }

    #[test]
    fn segment_rotation_turns_direction_vector() {
        let start = geometry(0.0, 0.0, 100.0, 0.0);
        let rotated = rotate_shape(ShapeKind::Arrow, start, 0.0, std::f32::consts::FRAC_PI_2, false);
        let Rotation::Segment(next) = rotated else {
            panic!("segments rotate their vector");
        };
        assert!(close(next.w, 0.0));
        assert!(close(next.h, 100.0));
        assert!(close(next.center().x, 50.0));
        assert!(close(next.center().y, 0.0));
    }

    #[test]
    fn aspect_locked_placement_reaches_target_ratio() {
        let (w, h) = placement_extent(ShapeKind::Rectangle, 100.0, 50.0, false, Some(2.0));
        assert!(close(w / h, 2.0));
        let (w, h) = placement_extent(ShapeKind::Rectangle, 100.0, 60.0, false, Some(2.0));
        assert!(close(w / h, 2.0));
        assert_eq!(h, 60.0);
    }

    #[test]
    fn uniform_placement_is_square_or_diagonal() {
        let (w, h) = placement_extent(ShapeKind::Triangle, -30.0, 10.0, true, None);
        assert_eq!((w, h), (-30.0, 30.0));
        let (w, h) = placement_extent(ShapeKind::Arrow, 100.0, 10.0, true, None);
        assert!(close(h, 0.0));
        assert!(close(w, 100.0_f32.hypot(10.0)));
    }

    #[test]
    fn handles_pin_to_shape_corners_at_zoom() {
        let mut viewport = EditorViewport::new();
        viewport.set_zoom_percent(200);
        viewport.set_pan(-30, 12);
        let mut shape = ShapeNode::new(1, ShapeKind::Rectangle, Point::new(20.0, 10.0));
        shape.w = 50.0;
        shape.h = 40.0;
        let origin = Point::new(64.0, 64.0);
        let handles = ShapeHandles::for_shape(&shape, origin, &viewport);

        let (_, south_east) = handles
            .compass
            .iter()
            .find(|(handle, _)| *handle == Handle::SouthEast)
            .copied()
            .expect("south-east handle");
        assert_eq!(
            viewport.screen_to_canvas(south_east),
            Point::new(64.0 + 70.0, 64.0 + 50.0)
        );
        assert_eq!(handles.rotate, Point::new(-30.0 + 2.0 * 109.0, 12.0 + 2.0 * 74.0 - 16.0));
        assert_eq!(handles.handle_at(south_east.offset(3.0, -3.0)), Some(Handle::SouthEast));
        assert!(handles.is_rotate_at(handles.rotate));
    }

    #[test]
    fn rotated_box_hides_compass_handles() {
        let viewport = EditorViewport::new();
        let mut shape = ShapeNode::new(1, ShapeKind::Rectangle, Point::default());
        shape.w = 40.0;
        shape.h = 40.0;
        shape.rotation_degrees = 30.0;
        let handles = ShapeHandles::for_shape(&shape, Point::default(), &viewport);
        assert!(handles.compass.is_empty());

        let mut line = ShapeNode::new(2, ShapeKind::Line, Point::default());
        line.w = 40.0;
        line.rotation_degrees = 30.0;
        let handles = ShapeHandles::for_shape(&line, Point::default(), &viewport);
        assert_eq!(handles.compass.len(), 8);
    }
}
