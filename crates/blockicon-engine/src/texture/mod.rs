//! Texture sources, loading and upload.
//!
//! Sources resolve asynchronously (network, disk, decode) into RGBA8 images;
//! upload into a context is synchronous and picks sampling by size.

mod atlas;
mod glint;
mod loader;
mod source;

pub use atlas::{Atlas, PixelRegion};
pub use glint::default_glint_image;
pub use loader::{load_texture_auto, sampling_for, upload_texture, TextureLoader};
pub use source::TextureSource;
