//! In-memory description of everything the compositor draws.
//!
//! The [`Scene`] is owned by the editing session and mutated only through its
//! methods, each of which clamps its input and bumps [`Scene::revision`] so the
//! preview knows to redraw.

pub mod background;
pub mod error;
pub mod frame;
pub mod nodes;
pub mod sizing;
pub mod store;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::geometry::{Color, Point, Rect};

pub use background::{
    gradient_presets, Background, GradientStop, GradientStops, LinearGradient, PatternFill,
    PatternKind,
};
pub use error::{SceneError, SceneResult};
pub use frame::{Shadow, ShadowPreset, WindowFrame, WindowStyle};
pub use nodes::{
    DropShadow, FillStyle, PaintKind, PositionAnchor, ShapeGeometry, ShapeKind, ShapeNode,
    StrokeStyle, TextAlign, TextBackground, TextFill, TextNode, TextOutline,
};
pub use sizing::{
    CanvasSizing, CropRect, ExportFormat, ExportSettings, ImageDims, ImageSizing, Padding,
    PixelMultiplier,
};
pub use store::{NodeStore, SceneNode};

pub type NodeId = u64;

const DUPLICATE_OFFSET: f32 = 16.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, remote = "Self")]
pub struct Scene {
    background: Background,
    padding: Padding,
    window_frame: WindowFrame,
    shadow: Shadow,
    crop: Option<CropRect>,
    sizing: ImageSizing,
    offset: Point,
    canvas: CanvasSizing,
    shapes: NodeStore<ShapeNode>,
    texts: NodeStore<TextNode>,
    export: ExportSettings,
    #[serde(skip)]
    next_id: NodeId,
    #[serde(skip)]
    revision: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            background: Background::default(),
            padding: Padding::default(),
            window_frame: WindowFrame::default(),
            shadow: Shadow::default(),
            crop: None,
            sizing: ImageSizing::default(),
            offset: Point::default(),
            canvas: CanvasSizing::Auto,
            shapes: NodeStore::default(),
            texts: NodeStore::default(),
            export: ExportSettings::default(),
            next_id: 1,
            revision: 0,
        }
    }
}

/// Resolved placement of every layer for one canvas size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneLayout {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub content_x: f32,
    pub content_y: f32,
    pub scaled_width: u32,
    pub scaled_height: u32,
    /// Window rect (bar included) when the frame is visible.
    pub frame: Option<Rect>,
    /// Source region actually drawn.
    pub crop: CropRect,
}

impl SceneLayout {
    pub fn content_origin(&self) -> Point {
        Point::new(self.content_x, self.content_y)
    }

    pub fn content_rect(&self) -> Rect {
        Rect::new(
            self.content_x,
            self.content_y,
            self.scaled_width as f32,
            self.scaled_height as f32,
        )
    }

    /// Content pixels per source pixel along each axis.
    pub fn image_scale(&self) -> (f32, f32) {
        (
            self.scaled_width as f32 / self.crop.w.max(1) as f32,
            self.scaled_height as f32 / self.crop.h.max(1) as f32,
        )
    }

    /// Maps a canvas-space point into source-image pixels.
    pub fn canvas_to_source(&self, point: Point) -> Point {
        let (scale_x, scale_y) = self.image_scale();
        Point::new(
            self.crop.x as f32 + (point.x - self.content_x) / scale_x,
            self.crop.y as f32 + (point.y - self.content_y) / scale_y,
        )
    }

    /// Origin of a node's coordinate space in canvas pixels.
    pub fn anchor_origin(&self, anchor: PositionAnchor) -> Point {
        match anchor {
            PositionAnchor::Content => self.content_origin(),
            PositionAnchor::Stage => Point::default(),
        }
    }
}

impl Serialize for Scene {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Scene::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for Scene {
    /// Loaded scenes pass through the same clamps as the setters.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut scene = Scene::deserialize(deserializer)?;
        scene.sanitize();
        Ok(scene)
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic counter bumped by every mutation.
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    fn sanitize(&mut self) {
        self.padding = Padding::new(i64::from(self.padding.x), i64::from(self.padding.y));
        let radius = self.window_frame.corner_radius();
        self.window_frame.set_corner_radius(radius);
        let shadow = self.shadow;
        self.shadow = Shadow::new(
            shadow.enabled,
            shadow.color,
            shadow.opacity(),
            shadow.blur(),
            shadow.offset().0,
            shadow.offset().1,
        );
        self.sizing = self.sizing.sanitized();
        if !(self.offset.x.is_finite() && self.offset.y.is_finite()) {
            self.offset = Point::default();
        }
        if let CanvasSizing::Custom { width, height } = self.canvas {
            self.canvas = CanvasSizing::custom(i64::from(width), i64::from(height));
        }
        self.export = ExportSettings::new(
            self.export.format,
            self.export.jpeg_quality(),
            self.export.multiplier,
        );
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn allocate_id(&mut self) -> NodeId {
        let floor = self
            .shapes
            .max_id()
            .into_iter()
            .chain(self.texts.max_id())
            .max()
            .map_or(1, |id| id.saturating_add(1));
        let id = self.next_id.max(floor);
        self.next_id = id.saturating_add(1);
        id
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    pub fn window_frame(&self) -> &WindowFrame {
        &self.window_frame
    }

    pub fn shadow(&self) -> &Shadow {
        &self.shadow
    }

    pub fn crop(&self) -> Option<CropRect> {
        self.crop
    }

    pub fn sizing(&self) -> &ImageSizing {
        &self.sizing
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn canvas_sizing(&self) -> CanvasSizing {
        self.canvas
    }

    pub fn export_settings(&self) -> &ExportSettings {
        &self.export
    }

    pub fn shapes(&self) -> &NodeStore<ShapeNode> {
        &self.shapes
    }

    pub fn texts(&self) -> &NodeStore<TextNode> {
        &self.texts
    }

    pub fn shape(&self, id: NodeId) -> Option<&ShapeNode> {
        self.shapes.get(id)
    }

    pub fn text(&self, id: NodeId) -> Option<&TextNode> {
        self.texts.get(id)
    }

    pub fn set_background(&mut self, background: Background) {
        self.background = background;
        self.touch();
    }

    pub fn set_solid_background(&mut self, color: Color) {
        self.set_background(Background::Solid { color });
    }

    /// Switches the pattern kind, starting from the default pattern if needed.
    pub fn set_pattern_kind(&mut self, kind: PatternKind) {
        let base = match &self.background {
            Background::Pattern(pattern) => *pattern,
            _ => PatternFill::default(),
        };
        self.set_background(Background::Pattern(base.with_kind(kind)));
    }

    pub fn set_gradient_angle(&mut self, angle_degrees: f32) -> SceneResult<()> {
        self.gradient_mut()?.angle_degrees = if angle_degrees.is_finite() {
            angle_degrees.rem_euclid(360.0)
        } else {
            0.0
        };
        self.touch();
        Ok(())
    }

    pub fn add_gradient_stop(&mut self) -> SceneResult<()> {
        self.gradient_mut()?.stops.add_stop()?;
        self.touch();
        Ok(())
    }

    pub fn remove_gradient_stop(&mut self, index: usize) -> SceneResult<GradientStop> {
        let removed = self.gradient_mut()?.stops.remove_stop(index)?;
        self.touch();
        Ok(removed)
    }

    pub fn set_gradient_stop(
        &mut self,
        index: usize,
        color: Color,
        position: f32,
    ) -> SceneResult<()> {
        let gradient = self.gradient_mut()?;
        let mut stops = gradient.stops.clone();
        stops.set_color(index, color)?;
        stops.set_position(index, position)?;
        gradient.stops = stops;
        self.touch();
        Ok(())
    }

    fn gradient_mut(&mut self) -> SceneResult<&mut LinearGradient> {
        match &mut self.background {
            Background::LinearGradient(gradient) => Ok(gradient),
            _ => Err(SceneError::NotAGradient),
        }
    }

    pub fn set_padding(&mut self, x: i64, y: i64) {
        self.padding = Padding::new(x, y);
        self.touch();
    }

    pub fn set_window_visible(&mut self, visible: bool) {
        self.window_frame.visible = visible;
        self.touch();
    }

    pub fn set_window_style(&mut self, style: WindowStyle) {
        self.window_frame.set_style(style);
        self.touch();
    }

    pub fn set_window_bar_color(&mut self, color: Color) {
        self.window_frame.bar_color = color;
        self.touch();
    }

    pub fn set_corner_radius(&mut self, radius: f32) {
        self.window_frame.set_corner_radius(radius);
        self.touch();
    }

    pub fn set_shadow(&mut self, shadow: Shadow) {
        self.shadow = Shadow::new(
            shadow.enabled,
            shadow.color,
            shadow.opacity(),
            shadow.blur(),
            shadow.offset().0,
            shadow.offset().1,
        );
        self.touch();
    }

    pub fn update_shadow(&mut self, update: impl FnOnce(&mut Shadow)) {
        update(&mut self.shadow);
        let shadow = self.shadow;
        self.set_shadow(shadow);
    }

    pub fn apply_shadow_preset(&mut self, preset: ShadowPreset) {
        self.set_shadow(preset.shadow());
    }

    pub fn set_scale_factor(&mut self, factor: f32) {
        self.sizing.set_scale_factor(factor);
        self.touch();
    }

    pub fn set_target_width(&mut self, width: Option<f32>) {
        self.sizing.set_target_width(width);
        self.touch();
    }

    pub fn set_offset(&mut self, offset: Point) {
        if !(offset.x.is_finite() && offset.y.is_finite()) {
            return;
        }
        self.offset = offset;
        self.touch();
    }

    pub fn set_canvas_sizing(&mut self, sizing: CanvasSizing) {
        self.canvas = match sizing {
            CanvasSizing::Custom { width, height } => {
                CanvasSizing::custom(i64::from(width), i64::from(height))
            }
            other => other,
        };
        self.touch();
    }

    pub fn set_export_settings(&mut self, settings: ExportSettings) {
        self.export = ExportSettings::new(
            settings.format,
            settings.jpeg_quality(),
            settings.multiplier,
        );
        self.touch();
    }

    /// Sets the crop in source pixels, clamped into `dims`.
    pub fn set_crop(&mut self, crop: Option<CropRect>, dims: ImageDims) {
        self.crop = crop.and_then(|crop| CropRect::clamped(crop.to_rect(), dims));
        self.touch();
    }

    pub fn reset_crop(&mut self) {
        self.crop = None;
        self.touch();
    }

    /// Commits a marquee given in canvas pixels.
    ///
    /// The marquee is mapped through the current layout, so a second crop
    /// selects from the already-cropped image.
    pub fn apply_crop_marquee(&mut self, marquee: Rect, dims: ImageDims) -> Option<CropRect> {
        let layout = self.layout(dims);
        let marquee = marquee.normalized();
        let top_left = layout.canvas_to_source(Point::new(marquee.x, marquee.y));
        let bottom_right = layout.canvas_to_source(Point::new(marquee.right(), marquee.bottom()));
        let crop = CropRect::clamped(
            Rect::new(
                top_left.x,
                top_left.y,
                bottom_right.x - top_left.x,
                bottom_right.y - top_left.y,
            ),
            dims,
        )?;
        tracing::debug!(?crop, "crop applied");
        self.crop = Some(crop);
        self.touch();
        Some(crop)
    }

    pub fn effective_crop(&self, dims: ImageDims) -> CropRect {
        self.crop
            .filter(|crop| crop.fits(dims))
            .unwrap_or_else(|| dims.full_crop())
    }

    /// Canvas size the preview and export both use.
    pub fn canvas_size(&self, dims: ImageDims) -> (u32, u32) {
        let (scaled_width, scaled_height) = self.sizing.scaled_size(self.effective_crop(dims));
        let needed = self.content_block(scaled_width, scaled_height);
        self.canvas.resolve(needed)
    }

    /// Padded content size, frame bar included; saturates instead of wrapping.
    fn content_block(&self, scaled_width: u32, scaled_height: u32) -> (u32, u32) {
        let bar = self.window_frame.visible_bar_height();
        (
            scaled_width.saturating_add(self.padding.x.saturating_mul(2)),
            scaled_height
                .saturating_add(bar)
                .saturating_add(self.padding.y.saturating_mul(2)),
        )
    }

    pub fn layout(&self, dims: ImageDims) -> SceneLayout {
        let (width, height) = self.canvas_size(dims);
        self.layout_for_canvas(dims, width, height)
    }

    /// Layout for an explicit canvas size; extra room centers the content block.
    pub fn layout_for_canvas(&self, dims: ImageDims, canvas_width: u32, canvas_height: u32) -> SceneLayout {
        let crop = self.effective_crop(dims);
        let (scaled_width, scaled_height) = self.sizing.scaled_size(crop);
        let bar = self.window_frame.visible_bar_height();
        let (needed_width, needed_height) = self.content_block(scaled_width, scaled_height);
        let slack_x = canvas_width.saturating_sub(needed_width) as f32 / 2.0;
        let slack_y = canvas_height.saturating_sub(needed_height) as f32 / 2.0;

        let window_x = self.padding.x as f32 + slack_x + self.offset.x;
        let window_y = self.padding.y as f32 + slack_y + self.offset.y;
        let frame = self.window_frame.visible.then(|| {
            Rect::new(
                window_x,
                window_y,
                scaled_width as f32,
                scaled_height.saturating_add(bar) as f32,
            )
        });

        SceneLayout {
            canvas_width,
            canvas_height,
            content_x: window_x,
            content_y: window_y + bar as f32,
            scaled_width,
            scaled_height,
            frame,
            crop,
        }
    }

    pub fn add_shape(&mut self, kind: ShapeKind, origin: Point) -> NodeId {
        let id = self.allocate_id();
        let shape = ShapeNode::new(id, kind, origin);
        self.insert_shape(shape);
        tracing::debug!(shape_id = id, ?kind, "shape placed");
        id
    }

    pub fn add_text(&mut self, origin: Point) -> NodeId {
        let id = self.allocate_id();
        self.insert_text(TextNode::new(id, origin));
        tracing::debug!(text_id = id, "text placed");
        id
    }

    /// Stage-anchored single-line caption field.
    pub fn add_template_field(&mut self, origin: Point, text: &str) -> NodeId {
        let id = self.allocate_id();
        self.insert_text(TextNode::single_line_field(id, origin, text));
        id
    }

    fn insert_shape(&mut self, shape: ShapeNode) {
        if let Err(err) = self.shapes.insert(shape) {
            tracing::warn!(?err, "shape insert rejected");
            return;
        }
        self.touch();
    }

    fn insert_text(&mut self, text: TextNode) {
        if let Err(err) = self.texts.insert(text) {
            tracing::warn!(?err, "text insert rejected");
            return;
        }
        self.touch();
    }

    pub fn update_shape(
        &mut self,
        id: NodeId,
        update: impl FnOnce(&mut ShapeNode),
    ) -> SceneResult<()> {
        let shape = self.shapes.get_mut(id).ok_or(SceneError::NodeNotFound(id))?;
        update(shape);
        shape.id = id;
        self.touch();
        Ok(())
    }

    pub fn update_text(&mut self, id: NodeId, update: impl FnOnce(&mut TextNode)) -> SceneResult<()> {
        let text = self.texts.get_mut(id).ok_or(SceneError::NodeNotFound(id))?;
        update(text);
        text.id = id;
        self.touch();
        Ok(())
    }

    pub fn set_text_content(&mut self, id: NodeId, content: &str) -> SceneResult<()> {
        self.update_text(id, |text| text.set_text(content))
    }

    pub fn remove_shape(&mut self, id: NodeId) -> Option<ShapeNode> {
        let removed = self.shapes.remove(id)?;
        self.touch();
        Some(removed)
    }

    pub fn remove_text(&mut self, id: NodeId) -> Option<TextNode> {
        let removed = self.texts.remove(id)?;
        self.touch();
        Some(removed)
    }

    /// Removes a shape or text node; ids are unique across both lists.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        self.remove_shape(id).is_some() || self.remove_text(id).is_some()
    }

    pub fn duplicate_node(&mut self, id: NodeId) -> SceneResult<NodeId> {
        if let Some(shape) = self.shapes.get(id).cloned() {
            let new_id = self.allocate_id();
            let copy = ShapeNode {
                id: new_id,
                x: shape.x + DUPLICATE_OFFSET,
                y: shape.y + DUPLICATE_OFFSET,
                ..shape
            };
            self.insert_shape(copy);
            return Ok(new_id);
        }
        if let Some(text) = self.texts.get(id).cloned() {
            let new_id = self.allocate_id();
            let mut copy = text;
            copy.id = new_id;
            copy.x += DUPLICATE_OFFSET;
            copy.y += DUPLICATE_OFFSET;
            self.insert_text(copy);
            return Ok(new_id);
        }
        Err(SceneError::NodeNotFound(id))
    }

    pub fn bring_to_front(&mut self, id: NodeId) -> SceneResult<()> {
        if self.shapes.contains(id) {
            self.shapes.bring_to_front(id)?;
        } else {
            self.texts.bring_to_front(id)?;
        }
        self.touch();
        Ok(())
    }

    pub fn send_to_back(&mut self, id: NodeId) -> SceneResult<()> {
        if self.shapes.contains(id) {
            self.shapes.send_to_back(id)?;
        } else {
            self.texts.send_to_back(id)?;
        }
        self.touch();
        Ok(())
    }
}
