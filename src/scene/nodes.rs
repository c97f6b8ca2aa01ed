use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::store::SceneNode;
use super::NodeId;
use crate::geometry::{Color, Point, Rect};

pub const ARROW_HEAD_DEFAULT: f32 = 12.0;
pub const ARROW_HEAD_MIN: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionAnchor {
    /// Relative to the content rect origin; moves with the screenshot.
    #[default]
    Content,
    /// Relative to the canvas origin.
    Stage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Rectangle,
    Circle,
    Triangle,
    Line,
    Arrow,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 5] = [
        Self::Rectangle,
        Self::Circle,
        Self::Triangle,
        Self::Line,
        Self::Arrow,
    ];

    /// Lines and arrows encode direction in their w/h vector and ignore rotation.
    pub const fn is_segment(self) -> bool {
        matches!(self, Self::Line | Self::Arrow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f32,
}

impl StrokeStyle {
    pub fn effective_width(&self) -> f32 {
        if self.width.is_finite() {
            self.width.max(1.0)
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillStyle {
    pub enabled: bool,
    pub color: Color,
}

/// Per-node drop shadow; defaults mirror the inspector's initial values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropShadow {
    pub enabled: bool,
    pub color: Color,
    pub alpha: f32,
    pub blur: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Default for DropShadow {
    fn default() -> Self {
        Self {
            enabled: false,
            color: Color::BLACK,
            alpha: 0.5,
            blur: 8.0,
            offset_x: 0.0,
            offset_y: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeNode {
    pub id: NodeId,
    pub kind: ShapeKind,
    #[serde(default)]
    pub anchor: PositionAnchor,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    #[serde(default)]
    pub rotation_degrees: f32,
    pub stroke: StrokeStyle,
    pub fill: FillStyle,
    #[serde(default = "default_arrow_head")]
    pub arrow_head_size: f32,
    #[serde(default)]
    pub shadow: DropShadow,
}

fn default_arrow_head() -> f32 {
    ARROW_HEAD_DEFAULT
}

impl ShapeNode {
    /// Zero-size shape at `origin`, ready to be sized by a drag.
    pub fn new(id: NodeId, kind: ShapeKind, origin: Point) -> Self {
        Self {
            id,
            kind,
            anchor: PositionAnchor::Content,
            x: origin.x,
            y: origin.y,
            w: 0.0,
            h: 0.0,
            rotation_degrees: 0.0,
            stroke: StrokeStyle {
                color: Color::rgb(0xef, 0x44, 0x44),
                width: 4.0,
            },
            fill: FillStyle {
                enabled: false,
                color: Color::rgba(0xef, 0x44, 0x44, 0x33),
            },
            arrow_head_size: ARROW_HEAD_DEFAULT,
            shadow: DropShadow::default(),
        }
    }

    pub fn geometry(&self) -> ShapeGeometry {
        ShapeGeometry {
            x: self.x,
            y: self.y,
            w: self.w,
            h: self.h,
        }
    }

    pub fn set_geometry(&mut self, geometry: ShapeGeometry) {
        self.x = geometry.x;
        self.y = geometry.y;
        self.w = geometry.w;
        self.h = geometry.h;
    }

    /// Bounds with negative extents folded, in the node's own anchor space.
    pub fn bounds(&self) -> Rect {
        self.geometry().rect().normalized()
    }

    /// Rotation that actually applies when drawing.
    pub fn effective_rotation(&self) -> f32 {
        if self.kind.is_segment() || !self.rotation_degrees.is_finite() {
            0.0
        } else {
            self.rotation_degrees
        }
    }

    pub fn arrow_head(&self) -> f32 {
        if self.arrow_head_size.is_finite() {
            self.arrow_head_size.max(ARROW_HEAD_MIN)
        } else {
            ARROW_HEAD_DEFAULT
        }
    }
}

impl SceneNode for ShapeNode {
    fn id(&self) -> NodeId {
        self.id
    }
}

/// Signed x/y/w/h; negative extents mean a handle was dragged past the origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShapeGeometry {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl ShapeGeometry {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

impl TextAlign {
    /// Horizontal shift from the anchor x to the left edge of a line `width` wide.
    pub fn left_offset(self, width: f32) -> f32 {
        match self {
            Self::Left => 0.0,
            Self::Center => -width / 2.0,
            Self::Right => -width,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaintKind {
    #[default]
    Solid,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextFill {
    pub kind: PaintKind,
    pub color: Color,
    pub color2: Color,
    pub angle_degrees: f32,
}

impl Default for TextFill {
    fn default() -> Self {
        Self {
            kind: PaintKind::Solid,
            color: Color::WHITE,
            color2: Color::WHITE,
            angle_degrees: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextOutline {
    pub enabled: bool,
    pub color: Color,
    pub width: f32,
}

impl Default for TextOutline {
    fn default() -> Self {
        Self {
            enabled: false,
            color: Color::BLACK,
            width: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextBackground {
    pub enabled: bool,
    pub kind: PaintKind,
    pub color: Color,
    pub color2: Color,
    pub angle_degrees: f32,
    pub alpha: f32,
    pub padding_x: f32,
    pub padding_y: f32,
    pub corner_radius: f32,
}

impl Default for TextBackground {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: PaintKind::Solid,
            color: Color::rgb(0x11, 0x18, 0x27),
            color2: Color::rgb(0x37, 0x41, 0x51),
            angle_degrees: 90.0,
            alpha: 0.8,
            padding_x: 6.0,
            padding_y: 2.0,
            corner_radius: 6.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self")]
pub struct TextNode {
    pub id: NodeId,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub anchor: PositionAnchor,
    text: String,
    pub font_family: String,
    pub font_size: f32,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub align: TextAlign,
    #[serde(default)]
    pub fill: TextFill,
    #[serde(default)]
    pub outline: TextOutline,
    #[serde(default)]
    pub background: TextBackground,
    #[serde(default)]
    pub shadow: DropShadow,
    /// Template fields hold exactly one line.
    #[serde(default)]
    single_line: bool,
}

impl TextNode {
    pub fn new(id: NodeId, origin: Point) -> Self {
        Self {
            id,
            x: origin.x,
            y: origin.y,
            anchor: PositionAnchor::Content,
            text: String::from("Text"),
            font_family: String::from("Inter"),
            font_size: 32.0,
            bold: false,
            italic: false,
            align: TextAlign::Left,
            fill: TextFill::default(),
            outline: TextOutline::default(),
            background: TextBackground::default(),
            shadow: DropShadow::default(),
            single_line: false,
        }
    }

    /// Stage-anchored single-line field used by caption templates.
    pub fn single_line_field(id: NodeId, origin: Point, text: &str) -> Self {
        let mut node = Self::new(id, origin);
        node.anchor = PositionAnchor::Stage;
        node.single_line = true;
        node.set_text(text);
        node
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_single_line(&self) -> bool {
        self.single_line
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = if self.single_line {
            flatten_newlines(text)
        } else {
            text.to_string()
        };
    }

    pub fn set_single_line(&mut self, single_line: bool) {
        self.single_line = single_line;
        if single_line {
            self.text = flatten_newlines(&self.text);
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        self.text.split('\n')
    }

    /// Pixel size used for glyphs: rounded, at least 1.
    pub fn effective_font_size(&self) -> f32 {
        if self.font_size.is_finite() {
            self.font_size.round().max(1.0)
        } else {
            1.0
        }
    }
}

impl Serialize for TextNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        TextNode::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for TextNode {
    /// Loaded template fields get the same newline folding as `set_text`.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut node = TextNode::deserialize(deserializer)?;
        let single_line = node.single_line;
        node.set_single_line(single_line);
        Ok(node)
    }
}

impl SceneNode for TextNode {
    fn id(&self) -> NodeId {
        self.id
    }
}

fn flatten_newlines(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loaded_single_line_text_is_flattened() {
        let node: TextNode = serde_json::from_str(
            r#"{
                "id": 7, "x": 0.0, "y": 0.0, "text": "Launch\nday\r\nnotes",
                "font_family": "Inter", "font_size": 24.0, "single_line": true
            }"#,
        )
        .expect("text node parses");
        assert!(node.is_single_line());
        assert_eq!(node.text(), "Launch day notes");

        let json = serde_json::to_string(&node).expect("serialize");
        let restored: TextNode = serde_json::from_str(&json).expect("round trip");
        assert_eq!(restored, node);
    }

    #[test]
    fn loaded_multi_line_text_keeps_newlines() {
        let node: TextNode = serde_json::from_str(
            r#"{ "id": 1, "x": 0.0, "y": 0.0, "text": "a\nb", "font_family": "Inter", "font_size": 12.0 }"#,
        )
        .expect("text node parses");
        assert_eq!(node.lines().count(), 2);
    }

    #[test]
    fn shape_bounds_normalize_negative_extents() {
        let mut shape = ShapeNode::new(1, ShapeKind::Rectangle, Point::new(50.0, 40.0));
        shape.w = -20.0;
        shape.h = -10.0;
        assert_eq!(shape.bounds(), Rect::new(30.0, 30.0, 20.0, 10.0));
    }

    #[test]
    fn segments_ignore_rotation_field() {
        let mut line = ShapeNode::new(1, ShapeKind::Line, Point::default());
        line.rotation_degrees = 45.0;
        assert_eq!(line.effective_rotation(), 0.0);

        let mut rect = ShapeNode::new(2, ShapeKind::Rectangle, Point::default());
        rect.rotation_degrees = 45.0;
        assert_eq!(rect.effective_rotation(), 45.0);
    }

    #[test]
    fn arrow_head_has_a_floor() {
        let mut arrow = ShapeNode::new(1, ShapeKind::Arrow, Point::default());
        arrow.arrow_head_size = 1.0;
        assert_eq!(arrow.arrow_head(), ARROW_HEAD_MIN);
        assert_eq!(arrow.stroke.effective_width(), 4.0);
    }

    #[test]
    fn single_line_fields_flatten_newlines() {
        let mut node = TextNode::single_line_field(1, Point::default(), "Hello\nworld");
        assert_eq!(node.text(), "Hello world");
        node.set_text("a\r\nb\nc");
        assert_eq!(node.text(), "a b c");
        assert_eq!(node.lines().count(), 1);
    }

    #[test]
    fn multi_line_text_keeps_newlines() {
        let mut node = TextNode::new(1, Point::default());
        node.set_text("one\ntwo");
        assert_eq!(node.lines().collect::<Vec<_>>(), vec!["one", "two"]);
        node.set_single_line(true);
        assert_eq!(node.text(), "one two");
    }

    #[test]
    fn effective_font_size_rounds_and_floors_at_one() {
        let mut node = TextNode::new(1, Point::default());
        node.font_size = 0.2;
        assert_eq!(node.effective_font_size(), 1.0);
        node.font_size = 17.6;
        assert_eq!(node.effective_font_size(), 18.0);
    }

    #[test]
    fn align_offsets_shift_left_edge() {
        assert_eq!(TextAlign::Left.left_offset(100.0), 0.0);
        assert_eq!(TextAlign::Center.left_offset(100.0), -50.0);
        assert_eq!(TextAlign::Right.left_offset(100.0), -100.0);
    }
}
