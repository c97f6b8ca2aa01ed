//! Interactive overlay engine.
//!
//! The overlay receives pointer events in on-screen pixels and turns them into
//! [`Scene`](crate::scene::Scene) mutations. [`EditorViewport`] owns the view
//! zoom and the canvas's on-screen origin; every conversion between the two
//! coordinate spaces goes through it.

pub mod crop;
pub mod gesture;
pub mod handles;
pub mod hit;
pub mod overlay;
pub mod tool;

use crate::geometry::Point;

pub use crop::{dim_rects, CropMarquee, CROP_MIN_SIZE};
pub use gesture::DragSession;
pub use handles::{Handle, ShapeHandles, GRID_SIZE, ROTATE_HANDLE_OFFSET};
pub use hit::HitTarget;
pub use overlay::{Modifiers, Overlay, OverlayContext, OverlayResponse, Selection};
pub use tool::{ActiveTool, AspectPreset};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditorViewport {
    zoom_percent: u16,
    pan_x: i32,
    pan_y: i32,
}

const VIEWPORT_ZOOM_MIN_PERCENT: u16 = 1;
const VIEWPORT_ZOOM_MAX_PERCENT: u16 = 1600;
const VIEWPORT_ZOOM_LEVELS_PERCENT: &[u16] = &[
    1, 2, 3, 4, 5, 8, 10, 12, 16, 20, 25, 33, 50, 67, 75, 80, 90, 100, 110, 125, 150, 175, 200,
    250, 300, 400, 500, 600, 800, 1000, 1200, 1600,
];

fn clamp_zoom_percent(zoom_percent: u16) -> u16 {
    zoom_percent.clamp(VIEWPORT_ZOOM_MIN_PERCENT, VIEWPORT_ZOOM_MAX_PERCENT)
}

fn next_zoom_in_level(current_zoom_percent: u16) -> u16 {
    for &level in VIEWPORT_ZOOM_LEVELS_PERCENT {
        if level > current_zoom_percent {
            return level;
        }
    }
    VIEWPORT_ZOOM_MAX_PERCENT
}

fn next_zoom_out_level(current_zoom_percent: u16) -> u16 {
    for &level in VIEWPORT_ZOOM_LEVELS_PERCENT.iter().rev() {
        if level < current_zoom_percent {
            return level;
        }
    }
    VIEWPORT_ZOOM_MIN_PERCENT
}

impl Default for EditorViewport {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorViewport {
    pub const fn new() -> Self {
        Self {
            zoom_percent: 100,
            pan_x: 0,
            pan_y: 0,
        }
    }

    pub const fn zoom_percent(&self) -> u16 {
        self.zoom_percent
    }

    /// Screen pixels per canvas pixel.
    pub fn zoom(&self) -> f32 {
        f32::from(self.zoom_percent) / 100.0
    }

    /// Screen position of the canvas's top-left corner.
    pub const fn pan_x(&self) -> i32 {
        self.pan_x
    }

    pub const fn pan_y(&self) -> i32 {
        self.pan_y
    }

    pub const fn min_zoom_percent() -> u16 {
        VIEWPORT_ZOOM_MIN_PERCENT
    }

    pub const fn max_zoom_percent() -> u16 {
        VIEWPORT_ZOOM_MAX_PERCENT
    }

    pub fn zoom_in(&mut self) {
        self.zoom_percent = next_zoom_in_level(clamp_zoom_percent(self.zoom_percent));
    }

    pub fn zoom_out(&mut self) {
        self.zoom_percent = next_zoom_out_level(clamp_zoom_percent(self.zoom_percent));
    }

    pub fn set_zoom_percent(&mut self, zoom_percent: u16) {
        self.zoom_percent = clamp_zoom_percent(zoom_percent);
    }

    pub fn pan_by(&mut self, delta_x: i32, delta_y: i32) {
        if delta_x == 0 && delta_y == 0 {
            return;
        }
        self.pan_x = self.pan_x.saturating_add(delta_x);
        self.pan_y = self.pan_y.saturating_add(delta_y);
    }

    pub fn set_pan(&mut self, pan_x: i32, pan_y: i32) {
        self.pan_x = pan_x;
        self.pan_y = pan_y;
    }

    /// Picks the largest ladder zoom not above 100% at which the canvas fits,
    /// then centers it inside the viewport.
    pub fn fit_to(&mut self, viewport_width: u32, viewport_height: u32, canvas_width: u32, canvas_height: u32) {
        let fits = |level: u16| {
            let zoom = f32::from(level) / 100.0;
            canvas_width as f32 * zoom <= viewport_width as f32
                && canvas_height as f32 * zoom <= viewport_height as f32
        };
        self.zoom_percent = VIEWPORT_ZOOM_LEVELS_PERCENT
            .iter()
            .copied()
            .filter(|level| *level <= 100)
            .rev()
            .find(|level| fits(*level))
            .unwrap_or(VIEWPORT_ZOOM_MIN_PERCENT);
        let zoom = self.zoom();
        let slack_x = viewport_width as f32 - canvas_width as f32 * zoom;
        let slack_y = viewport_height as f32 - canvas_height as f32 * zoom;
        self.pan_x = (slack_x / 2.0).floor() as i32;
        self.pan_y = (slack_y / 2.0).floor() as i32;
        tracing::debug!(zoom_percent = self.zoom_percent, "viewport fitted");
    }

    pub fn canvas_to_screen(&self, point: Point) -> Point {
        let zoom = self.zoom();
        Point::new(
            self.pan_x as f32 + point.x * zoom,
            self.pan_y as f32 + point.y * zoom,
        )
    }

    pub fn screen_to_canvas(&self, point: Point) -> Point {
        let zoom = self.zoom();
        Point::new(
            (point.x - self.pan_x as f32) / zoom,
            (point.y - self.pan_y as f32) / zoom,
        )
    }

    /// Converts a pointer delta in screen pixels to canvas pixels.
    pub fn screen_delta_to_canvas(&self, delta_x: f32, delta_y: f32) -> (f32, f32) {
        let zoom = self.zoom();
        (delta_x / zoom, delta_y / zoom)
    }
}
