use crate::scene::ShapeKind;

/// Tool currently driving pointer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveTool {
    #[default]
    Select,
    Crop,
    /// A click creates a text node only while armed.
    Text { armed: bool },
    Shape { kind: ShapeKind, keep_placing: bool },
}

impl ActiveTool {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Select => "Select",
            Self::Crop => "Crop",
            Self::Text { .. } => "Text",
            Self::Shape { kind, .. } => match kind {
                ShapeKind::Rectangle => "Rectangle",
                ShapeKind::Circle => "Circle",
                ShapeKind::Triangle => "Triangle",
                ShapeKind::Line => "Line",
                ShapeKind::Arrow => "Arrow",
            },
        }
    }

    pub const fn is_select(self) -> bool {
        matches!(self, Self::Select)
    }

    pub const fn armed_text() -> Self {
        Self::Text { armed: true }
    }

    pub const fn shape(kind: ShapeKind) -> Self {
        Self::Shape {
            kind,
            keep_placing: false,
        }
    }
}

/// Aspect ratios offered by the crop marquee and shape placement lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectPreset {
    #[default]
    Free,
    Ratio16x9,
    Ratio4x3,
    Ratio1x1,
    Ratio9x16,
    Original,
}

impl AspectPreset {
    pub const ALL: [AspectPreset; 6] = [
        Self::Free,
        Self::Ratio16x9,
        Self::Ratio4x3,
        Self::Ratio1x1,
        Self::Ratio9x16,
        Self::Original,
    ];

    pub const fn is_free(self) -> bool {
        matches!(self, Self::Free)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Ratio16x9 => "16:9",
            Self::Ratio4x3 => "4:3",
            Self::Ratio1x1 => "1:1",
            Self::Ratio9x16 => "9:16",
            Self::Original => "Original",
        }
    }

    pub const fn ratio(self) -> Option<(u32, u32)> {
        match self {
            Self::Free | Self::Original => None,
            Self::Ratio16x9 => Some((16, 9)),
            Self::Ratio4x3 => Some((4, 3)),
            Self::Ratio1x1 => Some((1, 1)),
            Self::Ratio9x16 => Some((9, 16)),
        }
    }

    /// Effective ratio; `Original` follows the content size.
    pub fn resolve_ratio(self, content_width: u32, content_height: u32) -> Option<(u32, u32)> {
        self.ratio().or_else(|| {
            if self == Self::Original {
                Some((content_width.max(1), content_height.max(1)))
            } else {
                None
            }
        })
    }

    /// Width over height, or `None` when unlocked.
    pub fn target_aspect(self, content_width: u32, content_height: u32) -> Option<f32> {
        self.resolve_ratio(content_width, content_height)
            .map(|(w, h)| w as f32 / h as f32)
    }
}
