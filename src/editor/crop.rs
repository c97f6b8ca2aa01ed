use super::handles::Handle;
use crate::geometry::{Point, Rect};

/// Smallest marquee edge, in canvas pixels.
pub const CROP_MIN_SIZE: f32 = 10.0;

/// Crop selection being edited over the content rect, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropMarquee {
    selection: Rect,
    bounds: Rect,
    /// Target width over height while aspect lock is engaged.
    aspect: Option<f32>,
}

impl CropMarquee {
    /// Starts a marquee at `anchor`, pulled inside `bounds`.
    pub fn begin(anchor: Point, bounds: Rect, aspect: Option<f32>) -> Self {
        let bounds = bounds.normalized();
        let anchor = clamp_point(anchor, bounds);
        Self {
            selection: Rect::new(anchor.x, anchor.y, 0.0, 0.0),
            bounds,
            aspect: aspect.filter(|ratio| ratio.is_finite() && *ratio > 0.0),
        }
    }

    pub fn selection(&self) -> Rect {
        self.selection
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn aspect(&self) -> Option<f32> {
        self.aspect
    }

    pub fn set_aspect(&mut self, aspect: Option<f32>) {
        self.aspect = aspect.filter(|ratio| ratio.is_finite() && *ratio > 0.0);
        if let Some(target) = self.aspect {
            let selection = self.selection;
            let (w, h) = grow_to_minimum(selection.w, (selection.w / target).round(), target);
            let (w, h) = fit_size(
                w,
                h,
                self.bounds.right() - selection.x,
                self.bounds.bottom() - selection.y,
            );
            self.selection = place_inside(Rect::new(selection.x, selection.y, w, h), self.bounds);
        }
    }

    /// Regions of the content rect outside the selection, for dimming.
    pub fn dim_rects(&self) -> [Rect; 4] {
        dim_rects(self.selection, self.bounds)
    }

    /// Sizes a fresh marquee from its anchor to `current`.
    pub fn stretch(&mut self, anchor: Point, current: Point) {
        let anchor = clamp_point(anchor, self.bounds);
        let current = clamp_point(current, self.bounds);
        let dx = current.x - anchor.x;
        let dy = current.y - anchor.y;
        let (mut w, mut h) = (dx.abs(), dy.abs());
        let Some(target) = self.aspect else {
            let x = if dx >= 0.0 { anchor.x } else { anchor.x - w };
            let y = if dy >= 0.0 { anchor.y } else { anchor.y - h };
            self.selection = clamp_to_bounds(Rect::new(x, y, w, h), self.bounds);
            return;
        };

        if w >= h * target {
            h = w / target;
        } else {
            w = h * target;
        }
        let room_x = if dx >= 0.0 {
            self.bounds.right() - anchor.x
        } else {
            anchor.x - self.bounds.x
        };
        let room_y = if dy >= 0.0 {
            self.bounds.bottom() - anchor.y
        } else {
            anchor.y - self.bounds.y
        };
        let (w, h) = grow_to_minimum(w, h, target);
        let (w, h) = fit_size(w, h, room_x, room_y);
        let x = if dx >= 0.0 { anchor.x } else { anchor.x - w };
        let y = if dy >= 0.0 { anchor.y } else { anchor.y - h };
        self.selection = place_inside(Rect::new(x, y, w, h), self.bounds);
    }

    /// Resizes from the selection captured at drag start.
    ///
    /// The edges opposite the dragged handle stay put. With the aspect lock
    /// on, both axes shrink by one factor when the marquee meets the bounds.
    pub fn resize_from(&mut self, start: Rect, handle: Handle, dx: f32, dy: f32) {
        let start = start.normalized();
        let (mut w, mut h) = (start.w, start.h);
        if handle.has_east() {
            w = start.w + dx;
        }
        if handle.has_west() {
            w = start.w - dx;
        }
        if handle.has_south() {
            h = start.h + dy;
        }
        if handle.has_north() {
            h = start.h - dy;
        }

        let room_x = if handle.has_west() {
            start.right() - self.bounds.x
        } else {
            self.bounds.right() - start.x
        };
        let room_y = if handle.has_north() {
            start.bottom() - self.bounds.y
        } else {
            self.bounds.bottom() - start.y
        };

        let (w, h) = match self.aspect {
            Some(target) => {
                let (w, h) = if handle.is_corner() {
                    if dx.abs() >= dy.abs() {
                        (w, (w / target).round())
                    } else {
                        ((h * target).round(), h)
                    }
                } else if handle.has_east() || handle.has_west() {
                    (w, (w / target).round())
                } else {
                    ((h * target).round(), h)
                };
                let (w, h) = grow_to_minimum(w, h, target);
                fit_size(w, h, room_x, room_y)
            }
            None => (
                w.min(room_x).max(CROP_MIN_SIZE),
                h.min(room_y).max(CROP_MIN_SIZE),
            ),
        };

        let x = if handle.has_west() {
            start.right() - w
        } else {
            start.x
        };
        let y = if handle.has_north() {
            start.bottom() - h
        } else {
            start.y
        };
        let next = Rect::new(x, y, w, h);
        self.selection = if self.aspect.is_some() {
            place_inside(next, self.bounds)
        } else {
            clamp_to_bounds(next, self.bounds)
        };
    }

    /// Moves the selection captured at drag start, staying inside the bounds.
    pub fn move_from(&mut self, start: Rect, dx: f32, dy: f32) {
        self.selection = clamp_to_bounds(start.translate(dx, dy), self.bounds);
    }
}

fn clamp_point(point: Point, bounds: Rect) -> Point {
    Point::new(
        point.x.clamp(bounds.x, bounds.right().max(bounds.x)),
        point.y.clamp(bounds.y, bounds.bottom().max(bounds.y)),
    )
}

/// Keeps `rect` inside `bounds` with both edges at least [`CROP_MIN_SIZE`].
pub fn clamp_to_bounds(rect: Rect, bounds: Rect) -> Rect {
    let rect = rect.normalized();
    place_inside(
        Rect::new(
            rect.x,
            rect.y,
            rect.w.max(CROP_MIN_SIZE),
            rect.h.max(CROP_MIN_SIZE),
        ),
        bounds,
    )
}

/// Moves `rect` inside `bounds` without enforcing a minimum size.
fn place_inside(rect: Rect, bounds: Rect) -> Rect {
    let rect = rect.normalized();
    let w = rect.w.min(bounds.w.max(0.0));
    let h = rect.h.min(bounds.h.max(0.0));
    let x = rect.x.min(bounds.right() - w).max(bounds.x);
    let y = rect.y.min(bounds.bottom() - h).max(bounds.y);
    Rect::new(x, y, w, h)
}

/// Grows a ratio-locked size until neither edge is below [`CROP_MIN_SIZE`].
fn grow_to_minimum(w: f32, h: f32, target: f32) -> (f32, f32) {
    let min_h = CROP_MIN_SIZE.max(CROP_MIN_SIZE / target);
    if h >= min_h && w >= CROP_MIN_SIZE {
        (w, h)
    } else {
        (min_h * target, min_h)
    }
}

/// Scales both edges down by one factor so the size fits `room_w` by `room_h`.
fn fit_size(w: f32, h: f32, room_w: f32, room_h: f32) -> (f32, f32) {
    let fit = (room_w.max(0.0) / w.max(f32::EPSILON))
        .min(room_h.max(0.0) / h.max(f32::EPSILON))
        .min(1.0);
    (w * fit, h * fit)
}

/// Left, right, top and bottom regions of `bounds` outside `selection`.
pub fn dim_rects(selection: Rect, bounds: Rect) -> [Rect; 4] {
    let left = Rect::new(bounds.x, bounds.y, selection.x - bounds.x, bounds.h);
    let right = Rect::new(
        selection.right(),
        bounds.y,
        bounds.right() - selection.right(),
        bounds.h,
    );
    let top = Rect::new(selection.x, bounds.y, selection.w, selection.y - bounds.y);
    let bottom = Rect::new(
        selection.x,
        selection.bottom(),
        selection.w,
        bounds.bottom() - selection.bottom(),
    );
    [left, right, top, bottom]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Rect {
        Rect::new(50.0, 40.0, 300.0, 200.0)
    }

    #[test]
    fn begin_pulls_anchor_inside_content() {
        let marquee = CropMarquee::begin(Point::new(0.0, 500.0), bounds(), None);
        assert_eq!(marquee.selection(), Rect::new(50.0, 240.0, 0.0, 0.0));
    }

    #[test]
    fn stretch_follows_pointer_in_any_direction() {
        let anchor = Point::new(200.0, 100.0);
        let mut marquee = CropMarquee::begin(anchor, bounds(), None);
        marquee.stretch(anchor, Point::new(120.0, 160.0));
        assert_eq!(marquee.selection(), Rect::new(120.0, 100.0, 80.0, 60.0));

        marquee.stretch(anchor, Point::new(-100.0, 0.0));
        assert_eq!(marquee.selection(), Rect::new(50.0, 40.0, 150.0, 60.0));
    }

    #[test]
    fn tiny_stretch_is_clamped_to_minimum() {
        let anchor = Point::new(100.0, 100.0);
        let mut marquee = CropMarquee::begin(anchor, bounds(), None);
        marquee.stretch(anchor, Point::new(102.0, 101.0));
        let selection = marquee.selection();
        assert_eq!((selection.w, selection.h), (CROP_MIN_SIZE, CROP_MIN_SIZE));
    }

    #[test]
    fn locked_stretch_keeps_ratio_and_stays_inside() {
        let anchor = Point::new(60.0, 50.0);
        let mut marquee = CropMarquee::begin(anchor, bounds(), Some(2.0));
        marquee.stretch(anchor, Point::new(160.0, 60.0));
        assert_eq!(marquee.selection(), Rect::new(60.0, 50.0, 100.0, 50.0));

        marquee.stretch(anchor, Point::new(400.0, 300.0));
        let selection = marquee.selection();
        assert!((selection.w / selection.h - 2.0).abs() < 1e-3);
        assert!(selection.bottom() <= bounds().bottom() + 1e-3);
        assert!(selection.right() <= bounds().right() + 1e-3);
    }

    #[test]
    fn handles_resize_with_minimum_size() {
        let start = Rect::new(100.0, 100.0, 100.0, 80.0);
        let mut marquee = CropMarquee::begin(Point::new(100.0, 100.0), bounds(), None);
        marquee.resize_from(start, Handle::East, 30.0, 0.0);
        assert_eq!(marquee.selection(), Rect::new(100.0, 100.0, 130.0, 80.0));

        marquee.resize_from(start, Handle::West, 500.0, 0.0);
        assert_eq!(marquee.selection().w, CROP_MIN_SIZE);

        marquee.resize_from(start, Handle::North, 0.0, -20.0);
        assert_eq!(marquee.selection(), Rect::new(100.0, 80.0, 100.0, 100.0));
    }

    #[test]
    fn locked_corner_resize_anchors_opposite_corner() {
        let start = Rect::new(100.0, 100.0, 100.0, 50.0);
        let mut marquee = CropMarquee::begin(Point::new(100.0, 100.0), bounds(), Some(2.0));
        marquee.resize_from(start, Handle::NorthWest, -40.0, -5.0);
        let selection = marquee.selection();
        assert_eq!(selection, Rect::new(60.0, 80.0, 140.0, 70.0));
        assert_eq!((selection.right(), selection.bottom()), (200.0, 150.0));

        marquee.resize_from(start, Handle::South, 0.0, 10.0);
        assert_eq!(marquee.selection(), Rect::new(100.0, 100.0, 120.0, 60.0));
    }

    #[test]
    fn shrinking_past_minimum_keeps_far_edges() {
        let start = Rect::new(100.0, 50.0, 100.0, 50.0);
        let mut marquee = CropMarquee::begin(Point::new(100.0, 50.0), bounds(), None);
        marquee.resize_from(start, Handle::West, 200.0, 0.0);
        let selection = marquee.selection();
        assert_eq!(selection, Rect::new(190.0, 50.0, CROP_MIN_SIZE, 50.0));
        assert_eq!(selection.right(), start.right());

        marquee.resize_from(start, Handle::NorthWest, 200.0, 200.0);
        let selection = marquee.selection();
        assert_eq!(selection, Rect::new(190.0, 90.0, CROP_MIN_SIZE, CROP_MIN_SIZE));
        assert_eq!(
            (selection.right(), selection.bottom()),
            (start.right(), start.bottom())
        );
    }

    #[test]
    fn locked_resize_fits_bounds_with_one_factor() {
        let bounds = Rect::new(0.0, 0.0, 300.0, 200.0);
        let start = Rect::new(100.0, 100.0, 100.0, 50.0);
        let mut marquee = CropMarquee::begin(Point::new(100.0, 100.0), bounds, Some(2.0));

        marquee.resize_from(start, Handle::East, 400.0, 0.0);
        assert_eq!(marquee.selection(), Rect::new(100.0, 100.0, 200.0, 100.0));

        marquee.resize_from(start, Handle::West, -400.0, 0.0);
        let selection = marquee.selection();
        assert_eq!(selection, Rect::new(0.0, 100.0, 200.0, 100.0));
        assert_eq!(selection.right(), start.right());
    }

    #[test]
    fn locked_minimum_keeps_ratio() {
        let start = Rect::new(100.0, 100.0, 100.0, 50.0);
        let mut marquee = CropMarquee::begin(Point::new(100.0, 100.0), bounds(), Some(2.0));
        marquee.resize_from(start, Handle::East, -200.0, 0.0);
        assert_eq!(marquee.selection(), Rect::new(100.0, 100.0, 20.0, 10.0));

        let anchor = Point::new(100.0, 100.0);
        marquee.stretch(anchor, anchor);
        assert_eq!(marquee.selection(), Rect::new(100.0, 100.0, 20.0, 10.0));
    }

    #[test]
    fn body_drag_stays_inside_bounds() {
        let start = Rect::new(100.0, 100.0, 100.0, 50.0);
        let mut marquee = CropMarquee::begin(Point::new(100.0, 100.0), bounds(), None);
        marquee.move_from(start, 1000.0, -1000.0);
        assert_eq!(marquee.selection(), Rect::new(250.0, 40.0, 100.0, 50.0));
    }

    #[test]
    fn dim_rects_cover_outside_regions() {
        let [left, right, top, bottom] = dim_rects(Rect::new(100.0, 80.0, 50.0, 60.0), bounds());
        assert_eq!(left, Rect::new(50.0, 40.0, 50.0, 200.0));
        assert_eq!(right, Rect::new(150.0, 40.0, 200.0, 200.0));
        assert_eq!(top, Rect::new(100.0, 40.0, 50.0, 40.0));
        assert_eq!(bottom, Rect::new(100.0, 140.0, 50.0, 100.0));
    }
}
