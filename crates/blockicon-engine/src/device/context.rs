use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::{Pod, Zeroable};

use crate::error::RenderError;

/// Pixel size of a canvas or GPU context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height. A zero height yields 1.0 so projections stay finite.
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Byte length of a tightly packed RGBA8 image of this size.
    pub fn rgba_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Process-unique identity of a GPU context.
///
/// Prepared requests remember the context they were prepared on; resource
/// ids are meaningless on any other context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BufferId(pub(crate) u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ProgramId(pub(crate) u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureId(pub(crate) u32);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DepthFunc {
    LessEqual,
    Equal,
}

/// Depth test configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub func: DepthFunc,
    pub write: bool,
}

impl DepthState {
    /// Standard opaque configuration.
    pub const OPAQUE: Self = Self {
        func: DepthFunc::LessEqual,
        write: true,
    };

    /// Only touch pixels whose depth was already written by the opaque pass.
    pub const OVERLAY: Self = Self {
        func: DepthFunc::Equal,
        write: false,
    };
}

impl Default for DepthState {
    fn default() -> Self {
        Self::OPAQUE
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// `SRC_ALPHA, ONE_MINUS_SRC_ALPHA`.
    #[default]
    Alpha,
    /// `SRC_COLOR, ONE`.
    Additive,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Wrap {
    Repeat,
    ClampToEdge,
}

/// Texture sampling setup. Filtering is always nearest-neighbour.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Sampling {
    pub mipmaps: bool,
    pub wrap: Wrap,
}

/// Row order of [`GpuContext::read_pixels`] output.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RowOrder {
    /// First row is the top of the image.
    TopDown,
    /// First row is the bottom of the image (GL convention).
    BottomUp,
}

/// Borrowed RGBA8 pixels for upload.
#[derive(Debug, Copy, Clone)]
pub struct TextureImage<'a> {
    pub width: u32,
    pub height: u32,
    pub rgba: &'a [u8],
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AttributeFormat {
    Float2,
    Float3,
}

impl AttributeFormat {
    pub fn byte_stride(self) -> u64 {
        match self {
            AttributeFormat::Float2 => 8,
            AttributeFormat::Float3 => 12,
        }
    }
}

/// A vertex buffer bound to a shader attribute location.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct VertexBinding {
    pub location: u32,
    pub buffer: BufferId,
    pub format: AttributeFormat,
}

/// Uniform block shared by every draw of the icon program.
///
/// Layout matches the WGSL `Uniforms` struct: `mat3x3` columns are padded to
/// 16 bytes and the block is rounded up to a multiple of 16.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    pub projection: [[f32; 4]; 4],
    pub model_view: [[f32; 4]; 4],
    pub texture_matrix: [[f32; 4]; 3],
    pub lighting_active: u32,
    pub _pad: [u32; 3],
}

/// One indexed triangle-list draw.
#[derive(Debug, Clone)]
pub struct DrawCall<'a> {
    pub program: ProgramId,
    pub attributes: &'a [VertexBinding],
    pub indices: BufferId,
    pub index_count: u32,
    pub texture: TextureId,
    pub uniforms: DrawUniforms,
}

/// A real GPU context bound to one canvas.
///
/// Resources are addressed by ids owned by the context and live until
/// [`release`](GpuContext::release); textures can also be deleted one at a
/// time. Depth and blend state is sticky: it applies to every draw until
/// changed.
pub trait GpuContext {
    fn size(&self) -> Size;

    /// Row order produced by [`read_pixels`](GpuContext::read_pixels).
    fn readback_order(&self) -> RowOrder;

    fn create_buffer(&mut self, kind: BufferKind, contents: &[u8]) -> Result<BufferId, RenderError>;

    /// Compiles and links the WGSL module containing `vs_main` and `fs_main`.
    fn create_program(&mut self, label: &str, wgsl: &str) -> Result<ProgramId, RenderError>;

    fn attribute_location(&self, program: ProgramId, name: &str) -> Option<u32>;

    fn create_texture(
        &mut self,
        image: TextureImage<'_>,
        sampling: Sampling,
    ) -> Result<TextureId, RenderError>;

    /// Frees one texture. Unknown or already deleted ids are ignored.
    fn delete_texture(&mut self, texture: TextureId);

    fn set_depth(&mut self, depth: DepthState);

    fn set_blend(&mut self, blend: BlendMode);

    /// Starts a new frame by clearing color to `color` (RGBA, 0..=1) and
    /// depth to the far plane.
    fn clear(&mut self, color: [f32; 4]);

    fn draw(&mut self, call: &DrawCall<'_>);

    /// Finishes the frame and copies it into `out` (`width * height * 4`
    /// bytes, RGBA8).
    fn read_pixels(&mut self, out: &mut [u8]) -> Result<(), RenderError>;

    /// Finishes the frame and shows it on the canvas.
    fn present(&mut self) -> Result<(), RenderError>;

    /// Releases every GPU resource. The context is unusable afterwards.
    fn release(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 192);
        assert_eq!(std::mem::size_of::<DrawUniforms>() % 16, 0);
    }

    #[test]
    fn aspect_guards_zero_height() {
        assert_eq!(Size::new(64, 0).aspect(), 1.0);
        assert_eq!(Size::new(128, 64).aspect(), 2.0);
    }

    #[test]
    fn rgba_len_counts_four_bytes_per_pixel() {
        assert_eq!(Size::new(100, 60).rgba_len(), 24_000);
    }

    #[test]
    fn context_ids_are_unique() {
        assert_ne!(ContextId::next(), ContextId::next());
    }
}
