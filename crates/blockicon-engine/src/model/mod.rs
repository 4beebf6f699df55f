//! Model geometry.
//!
//! [`geometry`] is a pure table from [`ModelKind`] to vertex data;
//! [`create_model`] uploads that data into one GPU context.

mod geometry;
mod kind;

pub use geometry::{geometry, Geometry};
pub use kind::ModelKind;

use crate::device::{BufferId, BufferKind, GpuContext};
use crate::error::RenderError;

/// GPU-side geometry of one [`ModelKind`] inside one context.
///
/// Buffers are reclaimed when the owning context is released.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub kind: ModelKind,
    pub positions: BufferId,
    pub indices: BufferId,
    pub tex_coords: BufferId,
    pub lighting: BufferId,
    pub index_count: u32,
    pub scale: f32,
    pub padded_scale: f32,
    pub is_3d: bool,
}

impl Model {
    /// Base orthographic scale for the requested padding mode.
    pub fn base_scale(&self, padded: bool) -> f32 {
        if padded { self.padded_scale } else { self.scale }
    }
}

/// Uploads the geometry of `kind` into `ctx`.
///
/// Every call creates fresh buffers; caching per context is the caller's job.
pub fn create_model(ctx: &mut dyn GpuContext, kind: ModelKind) -> Result<Model, RenderError> {
    let geo = geometry(kind);
    Ok(Model {
        kind,
        positions: ctx.create_buffer(BufferKind::Vertex, bytemuck::cast_slice(&geo.positions))?,
        indices: ctx.create_buffer(BufferKind::Index, bytemuck::cast_slice(&geo.indices))?,
        tex_coords: ctx.create_buffer(BufferKind::Vertex, bytemuck::cast_slice(&geo.tex_coords))?,
        lighting: ctx.create_buffer(BufferKind::Vertex, bytemuck::cast_slice(&geo.lighting))?,
        index_count: geo.indices.len() as u32,
        scale: kind.base_scale(false),
        padded_scale: kind.base_scale(true),
        is_3d: kind.is_3d(),
    })
}
