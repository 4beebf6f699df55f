//! Render targets handed to the coordinator.
//!
//! A [`GpuCanvas`] can produce a real GPU context and backs a primary
//! renderer. A [`PixelSurface`] is a plain 2D pixel sink and backs a blit
//! renderer that borrows another renderer's context.

mod gpu;
mod pixel;

pub use gpu::{GpuCanvas, HeadlessCanvas, SurfaceCanvas};
pub use pixel::{ImageSurface, PixelSurface};
