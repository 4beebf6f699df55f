//! Blockicon engine crate.
//!
//! Renders small item, block and skull icons with baked lighting and an
//! animated enchantment glint. A [`coordinator::Coordinator`] owns the GPU
//! contexts, drives the frame loop and lets plain pixel surfaces share an
//! existing context through pixel readback.

pub mod canvas;
pub mod coordinator;
pub mod device;
pub mod draw;
pub mod error;
pub mod logging;
pub mod model;
pub mod program;
pub mod texture;
pub mod time;

pub use canvas::{GpuCanvas, HeadlessCanvas, ImageSurface, PixelSurface, SurfaceCanvas};
pub use coordinator::{
    BlitRenderer, Coordinator, PrimaryRenderer, RenderRequest, Renderer, RendererConfig,
};
pub use device::{ContextOptions, Size};
pub use error::RenderError;
pub use model::ModelKind;
pub use texture::{Atlas, PixelRegion, TextureSource};
