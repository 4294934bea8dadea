// error.rs — renderer error taxonomy

use std::collections::TryReserveError;
use thiserror::Error;

/// Error type returned by the external collaborators (interop, color conversion).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum RendererError {
    /// Rejected input; the renderer state is left untouched.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("out of memory while building geometry")]
    OutOfMemory(#[from] TryReserveError),

    #[error("shader build failed: {0}")]
    ShaderBuild(String),

    #[error("failed to acquire GPU resource: {0}")]
    ResourceAcquisition(String),

    /// Failure reported by the texture-upload or color-conversion collaborator.
    #[error("upstream failure: {0}")]
    Upstream(#[source] BoxError),

    /// The last `prepare` failed, so the bound textures do not hold the current frame.
    #[error("no valid frame to draw")]
    StaleFrame,

    #[error("invalid renderer options: {0}")]
    Config(#[from] serde_json::Error),

    #[error("failed to read renderer options: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RendererError>;
