use serde::{Deserialize, Serialize};

use crate::geometry::Color;

pub const CORNER_RADIUS_MAX: f32 = 40.0;
pub const SHADOW_BLUR_MAX: f32 = 96.0;
pub const SHADOW_OFFSET_LIMIT: f32 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStyle {
    #[default]
    Regular,
    Notch,
    TitleOnly,
}

impl WindowStyle {
    pub const fn bar_height(self) -> u32 {
        match self {
            Self::Regular | Self::Notch => 44,
            Self::TitleOnly => 28,
        }
    }

    pub const fn has_traffic_lights(self) -> bool {
        !matches!(self, Self::TitleOnly)
    }
}

/// Simulated app window drawn around the screenshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowFrame {
    pub visible: bool,
    style: WindowStyle,
    pub bar_color: Color,
    corner_radius: f32,
}

impl Default for WindowFrame {
    fn default() -> Self {
        Self {
            visible: true,
            style: WindowStyle::Regular,
            bar_color: Color::rgb(0x1f, 0x29, 0x37),
            corner_radius: 16.0,
        }
    }
}

impl WindowFrame {
    pub const fn style(&self) -> WindowStyle {
        self.style
    }

    pub fn set_style(&mut self, style: WindowStyle) {
        self.style = style;
    }

    /// Title-bar height in content pixels; derived from the style.
    pub const fn bar_height(&self) -> u32 {
        self.style.bar_height()
    }

    /// Bar height contributed to layout, zero when the frame is hidden.
    pub const fn visible_bar_height(&self) -> u32 {
        if self.visible {
            self.bar_height()
        } else {
            0
        }
    }

    pub fn corner_radius(&self) -> f32 {
        clamp_finite(self.corner_radius, 0.0, CORNER_RADIUS_MAX)
    }

    pub fn set_corner_radius(&mut self, radius: f32) {
        self.corner_radius = clamp_finite(radius, 0.0, CORNER_RADIUS_MAX);
    }
}

/// Drop shadow cast by the window frame, or by the image when the frame is hidden.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    pub enabled: bool,
    pub color: Color,
    opacity: f32,
    blur: f32,
    offset_x: f32,
    offset_y: f32,
}

impl Default for Shadow {
    fn default() -> Self {
        ShadowPreset::Soft.shadow()
    }
}

impl Shadow {
    pub fn new(
        enabled: bool,
        color: Color,
        opacity: f32,
        blur: f32,
        offset_x: f32,
        offset_y: f32,
    ) -> Self {
        let mut shadow = Self {
            enabled,
            color,
            opacity: 0.0,
            blur: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
        };
        shadow.set_opacity(opacity);
        shadow.set_blur(blur);
        shadow.set_offset(offset_x, offset_y);
        shadow
    }

    pub fn opacity(&self) -> f32 {
        clamp_finite(self.opacity, 0.0, 1.0)
    }

    pub fn blur(&self) -> f32 {
        clamp_finite(self.blur, 0.0, SHADOW_BLUR_MAX)
    }

    pub fn offset(&self) -> (f32, f32) {
        (
            clamp_finite(self.offset_x, -SHADOW_OFFSET_LIMIT, SHADOW_OFFSET_LIMIT),
            clamp_finite(self.offset_y, -SHADOW_OFFSET_LIMIT, SHADOW_OFFSET_LIMIT),
        )
    }

    pub fn set_opacity(&mut self, opacity: f32) {
        self.opacity = clamp_finite(opacity, 0.0, 1.0);
    }

    pub fn set_blur(&mut self, blur: f32) {
        self.blur = clamp_finite(blur, 0.0, SHADOW_BLUR_MAX);
    }

    pub fn set_offset(&mut self, offset_x: f32, offset_y: f32) {
        self.offset_x = clamp_finite(offset_x, -SHADOW_OFFSET_LIMIT, SHADOW_OFFSET_LIMIT);
        self.offset_y = clamp_finite(offset_y, -SHADOW_OFFSET_LIMIT, SHADOW_OFFSET_LIMIT);
    }

    /// Shadow color with the opacity folded into alpha.
    pub fn effective_color(&self) -> Color {
        self.color.with_opacity(self.opacity())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShadowPreset {
    Off,
    Soft,
    Dramatic,
    Glow,
    Long,
}

impl ShadowPreset {
    pub const ALL: [ShadowPreset; 5] = [
        Self::Off,
        Self::Soft,
        Self::Dramatic,
        Self::Glow,
        Self::Long,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Soft => "Soft",
            Self::Dramatic => "Dramatic",
            Self::Glow => "Glow",
            Self::Long => "Long",
        }
    }

    pub fn shadow(self) -> Shadow {
        match self {
            Self::Off => Shadow::new(false, Color::BLACK, 0.1, 0.0, 0.0, 0.0),
            Self::Soft => Shadow::new(true, Color::rgb(0x0f, 0x17, 0x2a), 0.22, 40.0, 0.0, 22.0),
            Self::Dramatic => {
                Shadow::new(true, Color::rgb(0x0b, 0x11, 0x20), 0.28, 28.0, 8.0, 32.0)
            }
            Self::Glow => Shadow::new(true, Color::rgb(0x38, 0xbd, 0xf8), 0.35, 48.0, 0.0, 12.0),
            Self::Long => Shadow::new(true, Color::rgb(0x0f, 0x17, 0x2a), 0.2, 26.0, 40.0, 60.0),
        }
    }
}

pub(crate) fn clamp_finite(value: f32, min: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        min.max(0.0).min(max)
    }
}
