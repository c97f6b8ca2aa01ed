use super::crop::CropMarquee;
use super::gesture::DragSession;
use super::handles::{
    clamp_min_extent, nearest_handle, placement_extent, pointer_angle, resize_shape,
    rotate_shape, snap_geometry, snap_value, Handle, Rotation, ShapeHandles, GRID_SIZE,
};
use super::hit::{shape_at, text_at, HitTarget};
use super::tool::{ActiveTool, AspectPreset};
use super::EditorViewport;
use crate::geometry::{Point, Rect};
use crate::scene::{
    CropRect, ImageDims, NodeId, PositionAnchor, Scene, SceneLayout, SceneResult, ShapeGeometry,
};

/// Content-pixel travel a text drag needs before the node moves.
const TEXT_DRAG_THRESHOLD: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
}

impl Modifiers {
    pub const NONE: Self = Self { shift: false };
    pub const SHIFT: Self = Self { shift: true };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Shape(NodeId),
    Text(NodeId),
}

impl Selection {
    pub const fn id(self) -> NodeId {
        match self {
            Self::Shape(id) | Self::Text(id) => id,
        }
    }
}

/// Read-only inputs for one pointer event.
#[derive(Debug, Clone, Copy)]
pub struct OverlayContext<'a> {
    pub viewport: &'a EditorViewport,
    pub dims: ImageDims,
    /// Text blocks measured by the last render, in canvas pixels.
    pub text_bounds: &'a [(NodeId, Rect)],
}

/// What the host should do after a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OverlayResponse {
    pub scene_changed: bool,
    pub selection_changed: bool,
    /// A text node was clicked without dragging and should take keyboard focus.
    pub edit_text: Option<NodeId>,
}

impl OverlayResponse {
    fn changed() -> Self {
        Self {
            scene_changed: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    PanImage {
        start_offset: Point,
    },
    MoveShape {
        id: NodeId,
        start: ShapeGeometry,
    },
    ResizeShape {
        id: NodeId,
        handle: Handle,
        start: ShapeGeometry,
    },
    RotateShape {
        id: NodeId,
        start: ShapeGeometry,
        start_degrees: f32,
        center: Point,
        start_angle: f32,
    },
    PlaceShape {
        id: NodeId,
    },
    MoveText {
        id: NodeId,
        start: Point,
        moved: bool,
    },
    CropStretch {
        anchor: Point,
    },
    CropResize {
        handle: Handle,
        start: Rect,
    },
    CropMove {
        start: Rect,
    },
}

/// Turns pointer input over the preview into scene edits for the active tool.
#[derive(Debug, Clone)]
pub struct Overlay {
    tool: ActiveTool,
    selection: Option<Selection>,
    drag: DragSession<Gesture>,
    crop: Option<CropMarquee>,
    crop_aspect: AspectPreset,
    shape_aspect: Option<f32>,
    snap_to_grid: bool,
    grid_size: f32,
}

impl Default for Overlay {
    fn default() -> Self {
        Self::new()
    }
}

impl Overlay {
    pub fn new() -> Self {
        Self {
            tool: ActiveTool::Select,
            selection: None,
            drag: DragSession::Idle,
            crop: None,
            crop_aspect: AspectPreset::Free,
            shape_aspect: None,
            snap_to_grid: false,
            grid_size: GRID_SIZE,
        }
    }

    pub fn tool(&self) -> ActiveTool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: ActiveTool) {
        if self.drag.end().is_some() {
            tracing::debug!("drag ended by tool switch");
        }
        if tool != ActiveTool::Crop {
            self.crop = None;
        }
        tracing::debug!(tool = tool.label(), "tool selected");
        self.tool = tool;
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn select(&mut self, selection: Option<Selection>) {
        self.selection = selection;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn snap_to_grid(&self) -> bool {
        self.snap_to_grid
    }

    pub fn set_snap_to_grid(&mut self, enabled: bool) {
        self.snap_to_grid = enabled;
    }

    pub fn grid_size(&self) -> f32 {
        self.grid_size
    }

    pub fn set_grid_size(&mut self, grid_size: f32) {
        self.grid_size = if grid_size.is_finite() && grid_size >= 1.0 {
            grid_size
        } else {
            GRID_SIZE
        };
    }

    /// Width-over-height lock for new shapes; `None` leaves them free.
    pub fn set_shape_aspect(&mut self, aspect: Option<f32>) {
        self.shape_aspect = aspect.filter(|ratio| ratio.is_finite() && *ratio > 0.0);
    }

    pub fn shape_aspect(&self) -> Option<f32> {
        self.shape_aspect
    }

    pub fn crop_aspect(&self) -> AspectPreset {
        self.crop_aspect
    }

    pub fn set_crop_aspect(&mut self, preset: AspectPreset, scene: &Scene, dims: ImageDims) {
        self.crop_aspect = preset;
        let layout = scene.layout(dims);
        let target = preset.target_aspect(layout.scaled_width, layout.scaled_height);
        if let Some(marquee) = self.crop.as_mut() {
            marquee.set_aspect(target);
        }
    }

    pub fn crop_marquee(&self) -> Option<&CropMarquee> {
        self.crop.as_ref()
    }

    /// Commits the marquee as the scene crop and returns to the select tool.
    pub fn apply_crop(&mut self, scene: &mut Scene, dims: ImageDims) -> Option<CropRect> {
        let marquee = self.crop.take()?;
        self.drag.end();
        let applied = scene.apply_crop_marquee(marquee.selection(), dims);
        if applied.is_none() {
            tracing::warn!(selection = ?marquee.selection(), "crop marquee outside image");
        }
        self.tool = ActiveTool::Select;
        applied
    }

    pub fn cancel_crop(&mut self) {
        self.crop = None;
        self.drag.end();
        self.tool = ActiveTool::Select;
        tracing::debug!("crop cancelled");
    }

    /// Handle placement for the selected shape, in screen pixels.
    pub fn shape_handles(&self, scene: &Scene, ctx: &OverlayContext<'_>) -> Option<ShapeHandles> {
        let Some(Selection::Shape(id)) = self.selection else {
            return None;
        };
        let shape = scene.shape(id)?;
        let layout = scene.layout(ctx.dims);
        Some(ShapeHandles::for_shape(
            shape,
            layout.anchor_origin(shape.anchor),
            ctx.viewport,
        ))
    }

    /// Marquee handles in screen pixels.
    pub fn crop_handles(&self, viewport: &EditorViewport) -> Vec<(Handle, Point)> {
        let Some(marquee) = &self.crop else {
            return Vec::new();
        };
        let selection = screen_rect(viewport, marquee.selection());
        Handle::ALL
            .iter()
            .map(|handle| (*handle, handle.position_on(selection)))
            .collect()
    }

    /// Resolves what lies under `screen`, handles first.
    pub fn hit_test(&self, scene: &Scene, ctx: &OverlayContext<'_>, screen: Point) -> HitTarget {
        if let Some(marquee) = &self.crop {
            if let Some(handle) = nearest_handle(&self.crop_handles(ctx.viewport), screen) {
                return HitTarget::CropHandle(handle);
            }
            let point = ctx.viewport.screen_to_canvas(screen);
            if marquee.selection().contains(point, 0.0) {
                return HitTarget::CropBody;
            }
            return HitTarget::Canvas;
        }

        if let Some(handles) = self.shape_handles(scene, ctx) {
            if let Some(Selection::Shape(id)) = self.selection {
                if handles.is_rotate_at(screen) {
                    return HitTarget::Rotate(id);
                }
                if let Some(handle) = handles.handle_at(screen) {
                    return HitTarget::ShapeHandle { id, handle };
                }
            }
        }

        let point = ctx.viewport.screen_to_canvas(screen);
        if let Some(id) = text_at(ctx.text_bounds, point).filter(|id| scene.text(*id).is_some()) {
            return HitTarget::Text(id);
        }
        let layout = scene.layout(ctx.dims);
        match shape_at(scene, &layout, point) {
            Some(id) => HitTarget::Shape(id),
            None => HitTarget::Canvas,
        }
    }

    pub fn pointer_down(
        &mut self,
        scene: &mut Scene,
        ctx: &OverlayContext<'_>,
        screen: Point,
        _modifiers: Modifiers,
    ) -> OverlayResponse {
        self.drop_stale_selection(scene);
        let layout = scene.layout(ctx.dims);
        let point = ctx.viewport.screen_to_canvas(screen);

        match self.tool {
            ActiveTool::Crop => self.crop_pointer_down(scene, ctx, &layout, screen, point),
            ActiveTool::Text { armed: true } => {
                let origin = anchor_point(&layout, PositionAnchor::Content, point);
                let id = scene.add_text(origin);
                self.selection = Some(Selection::Text(id));
                self.tool = ActiveTool::Text { armed: false };
                OverlayResponse {
                    scene_changed: true,
                    selection_changed: true,
                    edit_text: Some(id),
                }
            }
            ActiveTool::Shape { kind, .. } => {
                let mut origin = anchor_point(&layout, PositionAnchor::Content, point);
                if self.snap_to_grid {
                    origin = Point::new(
                        snap_value(origin.x, self.grid_size),
                        snap_value(origin.y, self.grid_size),
                    );
                }
                let id = scene.add_shape(kind, origin);
                self.selection = Some(Selection::Shape(id));
                self.drag.begin(screen, Gesture::PlaceShape { id });
                OverlayResponse {
                    scene_changed: true,
                    selection_changed: true,
                    edit_text: None,
                }
            }
            ActiveTool::Select | ActiveTool::Text { armed: false } => {
                self.select_pointer_down(scene, ctx, screen)
            }
        }
    }

    fn crop_pointer_down(
        &mut self,
        scene: &Scene,
        ctx: &OverlayContext<'_>,
        layout: &SceneLayout,
        screen: Point,
        point: Point,
    ) -> OverlayResponse {
        let gesture = match (self.hit_test(scene, ctx, screen), self.crop) {
            (HitTarget::CropHandle(handle), Some(marquee)) => Gesture::CropResize {
                handle,
                start: marquee.selection(),
            },
            (HitTarget::CropBody, Some(marquee)) => Gesture::CropMove {
                start: marquee.selection(),
            },
            _ => {
                let target = self
                    .crop_aspect
                    .target_aspect(layout.scaled_width, layout.scaled_height);
                let marquee = CropMarquee::begin(point, layout.content_rect(), target);
                let anchor = Point::new(marquee.selection().x, marquee.selection().y);
                self.crop = Some(marquee);
                Gesture::CropStretch { anchor }
            }
        };
        self.drag.begin(screen, gesture);
        OverlayResponse::default()
    }

    fn select_pointer_down(
        &mut self,
        scene: &Scene,
        ctx: &OverlayContext<'_>,
        screen: Point,
    ) -> OverlayResponse {
        let previous = self.selection;
        let gesture = match self.hit_test(scene, ctx, screen) {
            HitTarget::ShapeHandle { id, handle } => scene.shape(id).map(|shape| {
                Gesture::ResizeShape {
                    id,
                    handle,
                    start: shape.geometry(),
                }
            }),
            HitTarget::Rotate(id) => {
                let handles = self.shape_handles(scene, ctx);
                scene.shape(id).zip(handles).map(|(shape, handles)| {
                    Gesture::RotateShape {
                        id,
                        start: shape.geometry(),
                        start_degrees: shape.rotation_degrees,
                        center: handles.center,
                        start_angle: pointer_angle(handles.center, screen),
                    }
                })
            }
            HitTarget::Shape(id) => {
                self.selection = Some(Selection::Shape(id));
                scene.shape(id).map(|shape| Gesture::MoveShape {
                    id,
                    start: shape.geometry(),
                })
            }
            HitTarget::Text(id) => {
                self.selection = Some(Selection::Text(id));
                scene.text(id).map(|text| Gesture::MoveText {
                    id,
                    start: Point::new(text.x, text.y),
                    moved: false,
                })
            }
            HitTarget::Canvas | HitTarget::CropHandle(_) | HitTarget::CropBody => {
                self.selection = None;
                Some(Gesture::PanImage {
                    start_offset: scene.offset(),
                })
            }
        };
        if let Some(gesture) = gesture {
            self.drag.begin(screen, gesture);
        }
        OverlayResponse {
            selection_changed: previous != self.selection,
            ..OverlayResponse::default()
        }
    }

    pub fn pointer_move(
        &mut self,
        scene: &mut Scene,
        ctx: &OverlayContext<'_>,
        screen: Point,
        modifiers: Modifiers,
    ) -> OverlayResponse {
        let Some((screen_dx, screen_dy)) = self.drag.delta(screen) else {
            return OverlayResponse::default();
        };
        let (dx, dy) = ctx.viewport.screen_delta_to_canvas(screen_dx, screen_dy);
        let snap = self.snap_to_grid.then_some(self.grid_size);
        let Some(gesture) = self.drag.snapshot_mut() else {
            return OverlayResponse::default();
        };

        let result = match *gesture {
            Gesture::PanImage { start_offset } => {
                scene.set_offset(start_offset.offset(dx, dy));
                Ok(())
            }
            Gesture::MoveShape { id, start } => {
                let mut x = start.x + dx;
                let mut y = start.y + dy;
                if let Some(grid) = snap {
                    x = snap_value(x, grid);
                    y = snap_value(y, grid);
                }
                scene.update_shape(id, |shape| {
                    shape.x = x;
                    shape.y = y;
                })
            }
            Gesture::ResizeShape { id, handle, start } => {
                let Some(kind) = scene.shape(id).map(|shape| shape.kind) else {
                    return OverlayResponse::default();
                };
                let mut next = resize_shape(kind, start, handle, dx, dy, modifiers.shift);
                if let Some(grid) = snap {
                    next = clamp_min_extent(
                        kind,
                        start,
                        snap_geometry(next, grid),
                        handle,
                        modifiers.shift,
                    );
                }
                scene.update_shape(id, |shape| shape.set_geometry(next))
            }
            Gesture::RotateShape {
                id,
                start,
                start_degrees,
                center,
                start_angle,
            } => {
                let Some(kind) = scene.shape(id).map(|shape| shape.kind) else {
                    return OverlayResponse::default();
                };
                let delta = pointer_angle(center, screen) - start_angle;
                match rotate_shape(kind, start, start_degrees, delta, modifiers.shift) {
                    Rotation::Degrees(degrees) => {
                        scene.update_shape(id, |shape| shape.rotation_degrees = degrees)
                    }
                    Rotation::Segment(next) => {
                        scene.update_shape(id, |shape| shape.set_geometry(next))
                    }
                }
            }
            Gesture::PlaceShape { id } => {
                let Some(kind) = scene.shape(id).map(|shape| shape.kind) else {
                    return OverlayResponse::default();
                };
                let (mut w, mut h) =
                    placement_extent(kind, dx, dy, modifiers.shift, self.shape_aspect);
                if let Some(grid) = snap {
                    w = snap_value(w, grid);
                    h = snap_value(h, grid);
                }
                scene.update_shape(id, |shape| {
                    shape.w = w;
                    shape.h = h;
                })
            }
            Gesture::MoveText {
                id,
                start,
                ref mut moved,
            } => {
                if !*moved && dx.abs() <= TEXT_DRAG_THRESHOLD && dy.abs() <= TEXT_DRAG_THRESHOLD {
                    return OverlayResponse::default();
                }
                *moved = true;
                scene.update_text(id, |text| {
                    text.x = start.x + dx;
                    text.y = start.y + dy;
                })
            }
            Gesture::CropStretch { anchor } => {
                if let Some(marquee) = self.crop.as_mut() {
                    let current = ctx.viewport.screen_to_canvas(screen);
                    marquee.stretch(anchor, current);
                }
                return OverlayResponse::default();
            }
            Gesture::CropResize { handle, start } => {
                if let Some(marquee) = self.crop.as_mut() {
                    marquee.resize_from(start, handle, dx, dy);
                }
                return OverlayResponse::default();
            }
            Gesture::CropMove { start } => {
                if let Some(marquee) = self.crop.as_mut() {
                    marquee.move_from(start, dx, dy);
                }
                return OverlayResponse::default();
            }
        };
        self.finish_update(result)
    }

    fn finish_update(&mut self, result: SceneResult<()>) -> OverlayResponse {
        match result {
            Ok(()) => OverlayResponse::changed(),
            Err(err) => {
                tracing::warn!(?err, "drag target vanished");
                self.drag.end();
                OverlayResponse::default()
            }
        }
    }

    pub fn pointer_up(
        &mut self,
        scene: &mut Scene,
        ctx: &OverlayContext<'_>,
        screen: Point,
        modifiers: Modifiers,
    ) -> OverlayResponse {
        let mut response = self.pointer_move(scene, ctx, screen, modifiers);
        let Some(gesture) = self.drag.end() else {
            return response;
        };
        match gesture {
            Gesture::PlaceShape { id } => {
                let empty = scene
                    .shape(id)
                    .is_some_and(|shape| shape.w == 0.0 && shape.h == 0.0);
                if empty {
                    scene.remove_shape(id);
                    self.selection = None;
                    response.scene_changed = true;
                    response.selection_changed = true;
                    tracing::debug!(shape_id = id, "empty shape discarded");
                }
                if let ActiveTool::Shape {
                    keep_placing: false,
                    ..
                } = self.tool
                {
                    self.tool = ActiveTool::Select;
                }
            }
            Gesture::MoveText { id, moved: false, .. } => {
                response.edit_text = Some(id);
            }
            Gesture::CropStretch { .. } | Gesture::CropResize { .. } | Gesture::CropMove { .. } => {
                if let Some(marquee) = &self.crop {
                    tracing::debug!(selection = ?marquee.selection(), "crop marquee updated");
                }
            }
            _ => {}
        }
        response
    }

    /// Ends any drag when pointer capture is lost, keeping edits made so far.
    pub fn capture_lost(&mut self) {
        if self.drag.end().is_some() {
            tracing::debug!("pointer capture lost; drag ended");
        }
    }

    pub fn delete_selected(&mut self, scene: &mut Scene) -> bool {
        let Some(selection) = self.selection.take() else {
            return false;
        };
        self.drag.end();
        scene.remove_node(selection.id())
    }

    pub fn duplicate_selected(&mut self, scene: &mut Scene) -> SceneResult<Option<NodeId>> {
        let Some(selection) = self.selection else {
            return Ok(None);
        };
        let id = scene.duplicate_node(selection.id())?;
        self.selection = Some(match selection {
            Selection::Shape(_) => Selection::Shape(id),
            Selection::Text(_) => Selection::Text(id),
        });
        Ok(Some(id))
    }

    fn drop_stale_selection(&mut self, scene: &Scene) {
        let stale = match self.selection {
            Some(Selection::Shape(id)) => scene.shape(id).is_none(),
            Some(Selection::Text(id)) => scene.text(id).is_none(),
            None => false,
        };
        if stale {
            tracing::warn!(selection = ?self.selection, "selection no longer in scene");
            self.selection = None;
        }
    }
}

fn anchor_point(layout: &SceneLayout, anchor: PositionAnchor, canvas: Point) -> Point {
    let origin = layout.anchor_origin(anchor);
    Point::new(canvas.x - origin.x, canvas.y - origin.y)
}

fn screen_rect(viewport: &EditorViewport, rect: Rect) -> Rect {
    let top_left = viewport.canvas_to_screen(Point::new(rect.x, rect.y));
    let zoom = viewport.zoom();
    Rect::new(top_left.x, top_left.y, rect.w * zoom, rect.h * zoom)
}
