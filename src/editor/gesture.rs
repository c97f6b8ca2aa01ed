use crate::geometry::Point;

/// Pointer-capture lifecycle of one gesture: `Idle` until pointer-down, then
/// `Dragging` with whatever the gesture captured at its start.
#[derive(Debug, Clone, PartialEq)]
pub enum DragSession<T> {
    Idle,
    Dragging { origin: Point, snapshot: T },
}

impl<T> Default for DragSession<T> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T> DragSession<T> {
    /// Starts a gesture at `origin` (screen pixels); a session still open is dropped.
    pub fn begin(&mut self, origin: Point, snapshot: T) {
        if self.is_dragging() {
            tracing::debug!("previous drag session replaced without release");
        }
        *self = Self::Dragging { origin, snapshot };
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, Self::Dragging { .. })
    }

    pub fn snapshot(&self) -> Option<&T> {
        match self {
            Self::Dragging { snapshot, .. } => Some(snapshot),
            Self::Idle => None,
        }
    }

    pub fn snapshot_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Dragging { snapshot, .. } => Some(snapshot),
            Self::Idle => None,
        }
    }

    /// Screen-pixel travel since the gesture started.
    pub fn delta(&self, current: Point) -> Option<(f32, f32)> {
        match self {
            Self::Dragging { origin, .. } => Some((current.x - origin.x, current.y - origin.y)),
            Self::Idle => None,
        }
    }

    /// Ends the gesture, on release or on lost capture alike.
    pub fn end(&mut self) -> Option<T> {
        match std::mem::take(self) {
            Self::Dragging { snapshot, .. } => Some(snapshot),
            Self::Idle => None,
        }
    }
}
