use thiserror::Error;

use crate::device::Size;

/// Errors surfaced by the renderer.
///
/// Context acquisition, shader build and context loss are fatal for the
/// renderer that hit them. Texture errors only affect the request that asked
/// for the texture.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("canvas could not provide a GPU context: {0}")]
    ContextUnavailable(String),

    #[error("shader program failed to build: {log}")]
    ShaderBuild { log: String },

    #[error("shader program has no vertex attribute `{0}`")]
    MissingAttribute(&'static str),

    #[error("failed to fetch texture from {url}: {reason}")]
    TextureFetch { url: String, reason: String },

    #[error("failed to decode texture from {origin}: {reason}")]
    TextureDecode { origin: String, reason: String },

    #[error("pixel buffer holds {len} bytes, expected {expected} for {width}x{height}")]
    PixelBufferSize {
        width: u32,
        height: u32,
        len: usize,
        expected: usize,
    },

    #[error("cutout {width}x{height} at ({x}, {y}) exceeds atlas bounds {atlas}")]
    CutoutOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        atlas: Size,
    },

    #[error("surface size {surface} does not match backend size {backend}")]
    SizeMismatch { surface: Size, backend: Size },

    #[error("GPU context has been released")]
    ContextLost,

    #[error("GPU operation failed: {0}")]
    Gpu(String),
}

impl RenderError {
    /// Whether the error leaves the owning GPU context unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RenderError::ContextUnavailable(_)
                | RenderError::ShaderBuild { .. }
                | RenderError::MissingAttribute(_)
                | RenderError::ContextLost
        )
    }
}
