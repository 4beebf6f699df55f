//! GPU context abstraction.
//!
//! This module is responsible for:
//! - the object-safe [`GpuContext`] contract the renderer draws through
//! - context options passed through from callers
//! - the wgpu-backed implementation ([`WgpuContext`])

mod context;
mod gpu;
mod options;
mod surface;

#[cfg(test)]
pub(crate) mod recording;

pub use context::{
    AttributeFormat, BlendMode, BufferId, BufferKind, ContextId, DepthFunc, DepthState,
    DrawCall, DrawUniforms, GpuContext, ProgramId, RowOrder, Sampling, Size, TextureId,
    TextureImage, VertexBinding, Wrap,
};
pub use gpu::WgpuContext;
pub use options::ContextOptions;
pub use surface::SurfaceErrorAction;
