/// Shared geometric and color primitives used by the scene, renderer and overlay.
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tiny_skia::{FillRule, Mask, Path, PathBuilder, Transform};

const KAPPA: f32 = 0.552_284_8;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Rotates the point around `center` by `radians` (clockwise in y-down space).
    pub fn rotated_around(self, center: Point, radians: f32) -> Self {
        if radians == 0.0 {
            return self;
        }
        let (sin, cos) = radians.sin_cos();
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        Self::new(
            center.x + dx * cos - dy * sin,
            center.y + dx * sin + dy * cos,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Returns the same area with non-negative width and height.
    pub fn normalized(self) -> Self {
        let (x, w) = if self.w < 0.0 {
            (self.x + self.w, -self.w)
        } else {
            (self.x, self.w)
        };
        let (y, h) = if self.h < 0.0 {
            (self.y + self.h, -self.h)
        } else {
            (self.y, self.h)
        };
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn translate(self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    pub fn inflate(self, amount: f32) -> Self {
        Self {
            x: self.x - amount,
            y: self.y - amount,
            w: self.w + amount * 2.0,
            h: self.h + amount * 2.0,
        }
    }

    pub fn union(self, other: Rect) -> Self {
        let a = self.normalized();
        let b = other.normalized();
        let left = a.x.min(b.x);
        let top = a.y.min(b.y);
        Self::new(
            left,
            top,
            a.right().max(b.right()) - left,
            a.bottom().max(b.bottom()) - top,
        )
    }

    pub fn contains(&self, point: Point, padding: f32) -> bool {
        let rect = self.normalized();
        point.x >= rect.x - padding
            && point.x <= rect.right() + padding
            && point.y >= rect.y - padding
            && point.y <= rect.bottom() + padding
    }

    pub fn to_skia(self) -> Option<tiny_skia::Rect> {
        let rect = self.normalized();
        tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.w, rect.h)
    }

    /// Axis-aligned bounds of this rect after `transform`.
    pub fn transformed_bounds(self, transform: Transform) -> Self {
        let rect = self.normalized();
        let mut corners = [
            tiny_skia::Point::from_xy(rect.x, rect.y),
            tiny_skia::Point::from_xy(rect.right(), rect.y),
            tiny_skia::Point::from_xy(rect.x, rect.bottom()),
            tiny_skia::Point::from_xy(rect.right(), rect.bottom()),
        ];
        transform.map_points(&mut corners);
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        for corner in corners {
            min_x = min_x.min(corner.x);
            min_y = min_y.min(corner.y);
            max_x = max_x.max(corner.x);
            max_y = max_y.max(corner.y);
        }
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorParseError {
    #[error("color must start with '#': {0}")]
    MissingHash(String),
    #[error("color must have 3, 6 or 8 hex digits: {0}")]
    InvalidLength(String),
    #[error("invalid hex digit in color: {0}")]
    InvalidDigit(String),
}

/// Straight (non-premultiplied) RGBA color, serialized as a hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(value: &str) -> Result<Self, ColorParseError> {
        let digits = value
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| ColorParseError::MissingHash(value.to_string()))?;
        let nibble = |index: usize| -> Result<u8, ColorParseError> {
            digits
                .get(index..index + 1)
                .and_then(|digit| u8::from_str_radix(digit, 16).ok())
                .ok_or_else(|| ColorParseError::InvalidDigit(value.to_string()))
        };
        let byte = |index: usize| -> Result<u8, ColorParseError> {
            Ok(nibble(index)? * 16 + nibble(index + 1)?)
        };
        match digits.len() {
            3 => Ok(Self::rgb(
                nibble(0)? * 17,
                nibble(1)? * 17,
                nibble(2)? * 17,
            )),
            6 => Ok(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => Err(ColorParseError::InvalidLength(value.to_string())),
        }
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!(
                "#{:02x}{:02x}{:02x}{:02x}",
                self.r, self.g, self.b, self.a
            )
        }
    }

    /// Multiplies the existing alpha by `opacity`, clamped to `[0, 1]`.
    pub fn with_opacity(self, opacity: f32) -> Self {
        let opacity = if opacity.is_finite() {
            opacity.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            a: (f32::from(self.a) * opacity).round() as u8,
            ..self
        }
    }

    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Rounded rectangle path; the radius is clamped to half of the shorter side.
pub fn rounded_rect_path(rect: Rect, radius: f32) -> Option<Path> {
    let rect = rect.normalized();
    if rect.w <= 0.0 || rect.h <= 0.0 {
        return None;
    }
    let r = radius.max(0.0).min(rect.w / 2.0).min(rect.h / 2.0);
    if r <= 0.0 {
        return Some(PathBuilder::from_rect(rect.to_skia()?));
    }

    let (x, y, right, bottom) = (rect.x, rect.y, rect.right(), rect.bottom());
    let k = r * KAPPA;
    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(right - r, y);
    pb.cubic_to(right - r + k, y, right, y + r - k, right, y + r);
    pb.line_to(right, bottom - r);
    pb.cubic_to(right, bottom - r + k, right - r + k, bottom, right - r, bottom);
    pb.line_to(x + r, bottom);
    pb.cubic_to(x + r - k, bottom, x, bottom - r + k, x, bottom - r);
    pb.line_to(x, y + r);
    pb.cubic_to(x, y + r - k, x + r - k, y, x + r, y);
    pb.close();
    pb.finish()
}

pub fn ellipse_path(center: Point, radius_x: f32, radius_y: f32) -> Option<Path> {
    let oval = tiny_skia::Rect::from_xywh(
        center.x - radius_x.abs(),
        center.y - radius_y.abs(),
        radius_x.abs() * 2.0,
        radius_y.abs() * 2.0,
    )?;
    PathBuilder::from_oval(oval)
}

pub fn polyline_path(points: &[Point], closed: bool) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x, first.y);
    for point in rest {
        pb.line_to(point.x, point.y);
    }
    if closed {
        pb.close();
    }
    pb.finish()
}

/// Coverage mask for `path` on a `width`x`height` device surface.
pub fn clip_mask(
    width: u32,
    height: u32,
    path: &Path,
    transform: Transform,
    anti_alias: bool,
) -> Option<Mask> {
    let mut mask = Mask::new(width, height)?;
    mask.fill_path(path, FillRule::Winding, anti_alias, transform);
    Some(mask)
}

pub fn rect_clip_mask(width: u32, height: u32, rect: Rect, transform: Transform) -> Option<Mask> {
    let path = PathBuilder::from_rect(rect.to_skia()?);
    clip_mask(width, height, &path, transform, false)
}
