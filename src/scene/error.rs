use super::NodeId;
use thiserror::Error;

pub type SceneResult<T> = std::result::Result<T, SceneError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("gradient must keep at least {min} stops")]
    TooFewGradientStops { min: usize },
    #[error("gradient can hold at most {max} stops")]
    TooManyGradientStops { max: usize },
    #[error("gradient stop index {index} out of range (len {len})")]
    GradientStopOutOfRange { index: usize, len: usize },
    #[error("background is not a linear gradient")]
    NotAGradient,
    #[error("node id {0} already exists")]
    DuplicateNodeId(NodeId),
    #[error("node id {0} not found")]
    NodeNotFound(NodeId),
}
