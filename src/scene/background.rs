use serde::{Deserialize, Serialize};

use super::error::{SceneError, SceneResult};
use crate::geometry::Color;

pub const GRADIENT_MIN_STOPS: usize = 2;
pub const GRADIENT_MAX_STOPS: usize = 5;
pub const PATTERN_MIN_TILE: f32 = 8.0;
pub const PATTERN_MAX_TILE: f32 = 64.0;

const NEW_STOP_COLOR: Color = Color::WHITE;
const NEW_STOP_POSITION: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Background {
    Solid { color: Color },
    LinearGradient(LinearGradient),
    Pattern(PatternFill),
}

impl Default for Background {
    fn default() -> Self {
        Self::Solid {
            color: Color::WHITE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub color: Color,
    pub position: f32,
}

impl GradientStop {
    pub fn new(color: Color, position: f32) -> Self {
        Self {
            color,
            position: clamp_unit(position),
        }
    }
}

/// Ordered stop list that always holds between two and five stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<GradientStop>", into = "Vec<GradientStop>")]
pub struct GradientStops(Vec<GradientStop>);

impl GradientStops {
    pub fn new(stops: Vec<GradientStop>) -> SceneResult<Self> {
        if stops.len() < GRADIENT_MIN_STOPS {
            return Err(SceneError::TooFewGradientStops {
                min: GRADIENT_MIN_STOPS,
            });
        }
        if stops.len() > GRADIENT_MAX_STOPS {
            return Err(SceneError::TooManyGradientStops {
                max: GRADIENT_MAX_STOPS,
            });
        }
        Ok(Self(
            stops
                .into_iter()
                .map(|stop| GradientStop::new(stop.color, stop.position))
                .collect(),
        ))
    }

    pub fn two(from: Color, to: Color) -> Self {
        Self(vec![GradientStop::new(from, 0.0), GradientStop::new(to, 1.0)])
    }

    pub fn as_slice(&self) -> &[GradientStop] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends a white stop at the midpoint.
    pub fn add_stop(&mut self) -> SceneResult<()> {
        if self.0.len() >= GRADIENT_MAX_STOPS {
            return Err(SceneError::TooManyGradientStops {
                max: GRADIENT_MAX_STOPS,
            });
        }
        self.0
            .push(GradientStop::new(NEW_STOP_COLOR, NEW_STOP_POSITION));
        Ok(())
    }

    pub fn remove_stop(&mut self, index: usize) -> SceneResult<GradientStop> {
        if self.0.len() <= GRADIENT_MIN_STOPS {
            return Err(SceneError::TooFewGradientStops {
                min: GRADIENT_MIN_STOPS,
            });
        }
        self.check_index(index)?;
        Ok(self.0.remove(index))
    }

    pub fn set_color(&mut self, index: usize, color: Color) -> SceneResult<()> {
        self.check_index(index)?;
        self.0[index].color = color;
        Ok(())
    }

    pub fn set_position(&mut self, index: usize, position: f32) -> SceneResult<()> {
        self.check_index(index)?;
        self.0[index].position = clamp_unit(position);
        Ok(())
    }

    fn check_index(&self, index: usize) -> SceneResult<()> {
        if index >= self.0.len() {
            return Err(SceneError::GradientStopOutOfRange {
                index,
                len: self.0.len(),
            });
        }
        Ok(())
    }
}

impl TryFrom<Vec<GradientStop>> for GradientStops {
    type Error = SceneError;

    fn try_from(stops: Vec<GradientStop>) -> Result<Self, Self::Error> {
        Self::new(stops)
    }
}

impl From<GradientStops> for Vec<GradientStop> {
    fn from(stops: GradientStops) -> Self {
        stops.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearGradient {
    pub angle_degrees: f32,
    pub stops: GradientStops,
}

impl LinearGradient {
    pub fn new(angle_degrees: f32, stops: GradientStops) -> Self {
        Self {
            angle_degrees,
            stops,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Dots,
    Grid,
    Diagonal,
    Wave,
    Icons,
    Cross,
    Crosshatch,
    Hex,
    Zigzag,
    Plus,
    Noise,
    Circuit,
    Chevron,
    Stars,
    Sprinkles,
    Herringbone,
}

impl PatternKind {
    pub const ALL: [PatternKind; 16] = [
        Self::Dots,
        Self::Grid,
        Self::Diagonal,
        Self::Wave,
        Self::Icons,
        Self::Cross,
        Self::Crosshatch,
        Self::Hex,
        Self::Zigzag,
        Self::Plus,
        Self::Noise,
        Self::Circuit,
        Self::Chevron,
        Self::Stars,
        Self::Sprinkles,
        Self::Herringbone,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Dots => "dots",
            Self::Grid => "grid",
            Self::Diagonal => "diagonal",
            Self::Wave => "wave",
            Self::Icons => "icons",
            Self::Cross => "cross",
            Self::Crosshatch => "crosshatch",
            Self::Hex => "hex",
            Self::Zigzag => "zigzag",
            Self::Plus => "plus",
            Self::Noise => "noise",
            Self::Circuit => "circuit",
            Self::Chevron => "chevron",
            Self::Stars => "stars",
            Self::Sprinkles => "sprinkles",
            Self::Herringbone => "herringbone",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternFill {
    pub kind: PatternKind,
    pub foreground: Color,
    pub background: Color,
    tile_scale: f32,
}

impl PatternFill {
    pub fn new(kind: PatternKind, foreground: Color, background: Color, tile_scale: f32) -> Self {
        Self {
            kind,
            foreground,
            background,
            tile_scale: clamp_tile_scale(tile_scale),
        }
    }

    /// Tile edge length in content pixels, always within `[8, 64]`.
    pub fn tile_scale(&self) -> f32 {
        clamp_tile_scale(self.tile_scale)
    }

    pub fn set_tile_scale(&mut self, tile_scale: f32) {
        self.tile_scale = clamp_tile_scale(tile_scale);
    }

    /// Switches the pattern kind while keeping colors and scale.
    pub fn with_kind(self, kind: PatternKind) -> Self {
        Self { kind, ..self }
    }
}

impl Default for PatternFill {
    fn default() -> Self {
        Self::new(
            PatternKind::Dots,
            Color::rgb(0xcb, 0xd5, 0xe1),
            Color::rgb(0xf8, 0xfa, 0xfc),
            24.0,
        )
    }
}

pub const SOLID_PRESETS: [Color; 6] = [
    Color::rgb(0xff, 0xff, 0xff),
    Color::rgb(0xf3, 0xf4, 0xf6),
    Color::rgb(0x0f, 0x17, 0x2a),
    Color::rgb(0x1f, 0x29, 0x37),
    Color::rgb(0xfd, 0xe6, 0x8a),
    Color::rgb(0xbf, 0xdb, 0xfe),
];

pub fn gradient_presets() -> Vec<LinearGradient> {
    [
        (45.0, Color::rgb(0xff, 0x7e, 0x5f), Color::rgb(0xfe, 0xb4, 0x7b)),
        (60.0, Color::rgb(0x66, 0x7e, 0xea), Color::rgb(0x76, 0x4b, 0xa2)),
        (120.0, Color::rgb(0x43, 0xe9, 0x7b), Color::rgb(0x38, 0xf9, 0xd7)),
        (45.0, Color::rgb(0xfa, 0x70, 0x9a), Color::rgb(0xfe, 0xe1, 0x40)),
        (60.0, Color::rgb(0x30, 0xcf, 0xd0), Color::rgb(0x33, 0x08, 0x67)),
        (120.0, Color::rgb(0x0f, 0x17, 0x2a), Color::rgb(0x33, 0x41, 0x55)),
    ]
    .into_iter()
    .map(|(angle, from, to)| LinearGradient::new(angle, GradientStops::two(from, to)))
    .collect()
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn clamp_tile_scale(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(PATTERN_MIN_TILE, PATTERN_MAX_TILE)
    } else {
        PATTERN_MIN_TILE
    }
}
