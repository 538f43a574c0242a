use thiserror::Error;

use crate::scene::NodeId;

/// Errors surfaced by the ring core.
///
/// None of these are retried; callers log them and carry on with whatever
/// part of the scene is already in place.
#[derive(Clone, Debug, Error)]
pub enum RingError {
    #[error("invalid ring configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load asset `{path}`: {reason}")]
    AssetLoad { path: String, reason: String },

    #[error("animation clip `{0}` not found")]
    ClipNotFound(String),

    #[error("tile index {index} out of range (ring has {count} tiles)")]
    TileOutOfRange { index: usize, count: usize },

    #[error("unknown scene node {0:?}")]
    UnknownNode(NodeId),

    #[error("model asset `{0}` contains no meshes")]
    EmptyModel(String),

    #[error("invalid skeleton: {0}")]
    InvalidSkeleton(String),
}

pub type Result<T> = std::result::Result<T, RingError>;
