/// Lifecycle of one editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No image loaded; nothing is rendered.
    #[default]
    Empty,
    Editing,
    /// An export job is running; the preview stays interactive.
    Exporting,
}

impl SessionState {
    pub const fn has_image(self) -> bool {
        !matches!(self, Self::Empty)
    }

    pub const fn is_exporting(self) -> bool {
        matches!(self, Self::Exporting)
    }
}
