use crate::config::ConfigPathError;
use crate::export::ExportError;
use crate::render::RenderError;
use crate::scene::SceneError;
use crate::state::StateError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    ConfigPath(#[from] ConfigPathError),
    #[error("invalid scene description: {0}")]
    SceneFile(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
