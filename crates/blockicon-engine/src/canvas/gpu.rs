use crate::device::{ContextOptions, GpuContext, Size, WgpuContext};
use crate::error::RenderError;

/// A canvas able to create a GPU context of its own pixel size.
pub trait GpuCanvas {
    fn size(&self) -> Size;

    /// Acquires the canvas' GPU context.
    fn create_context(
        &mut self,
        options: &ContextOptions,
    ) -> Result<Box<dyn GpuContext>, RenderError>;
}

/// Offscreen canvas. Its pixels are only reachable through readback, which
/// makes it a natural backend for blit renderers.
#[derive(Debug, Copy, Clone)]
pub struct HeadlessCanvas {
    size: Size,
}

impl HeadlessCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Size::new(width, height),
        }
    }
}

impl GpuCanvas for HeadlessCanvas {
    fn size(&self) -> Size {
        self.size
    }

    fn create_context(
        &mut self,
        options: &ContextOptions,
    ) -> Result<Box<dyn GpuContext>, RenderError> {
        let ctx = WgpuContext::headless(self.size, options)
            .map_err(|e| RenderError::ContextUnavailable(format!("{e:#}")))?;
        Ok(Box::new(ctx))
    }
}

/// Canvas over a window surface.
///
/// The surface can only back one context; a second `create_context` call
/// fails.
pub struct SurfaceCanvas {
    instance: wgpu::Instance,
    surface: Option<wgpu::Surface<'static>>,
    size: Size,
}

impl SurfaceCanvas {
    /// `surface` must have been created from `instance`. `size` is the
    /// drawable size in physical pixels.
    pub fn new(instance: wgpu::Instance, surface: wgpu::Surface<'static>, size: Size) -> Self {
        Self {
            instance,
            surface: Some(surface),
            size,
        }
    }
}

impl GpuCanvas for SurfaceCanvas {
    fn size(&self) -> Size {
        self.size
    }

    fn create_context(
        &mut self,
        options: &ContextOptions,
    ) -> Result<Box<dyn GpuContext>, RenderError> {
        let surface = self.surface.take().ok_or_else(|| {
            RenderError::ContextUnavailable("surface already backs a context".into())
        })?;
        let ctx = WgpuContext::with_surface(self.instance.clone(), surface, self.size, options)
            .map_err(|e| RenderError::ContextUnavailable(format!("{e:#}")))?;
        Ok(Box::new(ctx))
    }
}
