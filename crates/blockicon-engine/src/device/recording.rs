//! In-memory [`GpuContext`] that records every call, for ordering tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::canvas::GpuCanvas;
use crate::error::RenderError;

use super::context::{
    BlendMode, BufferId, BufferKind, DepthState, DrawCall, DrawUniforms, GpuContext, ProgramId,
    RowOrder, Sampling, Size, TextureId, TextureImage,
};
use super::options::ContextOptions;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum GpuCall {
    CreateBuffer(BufferKind, usize),
    CreateProgram,
    CreateTexture {
        width: u32,
        height: u32,
        sampling: Sampling,
    },
    DeleteTexture(TextureId),
    SetDepth(DepthState),
    SetBlend(BlendMode),
    Clear,
    Draw {
        texture: TextureId,
        index_count: u32,
        uniforms: DrawUniforms,
    },
    ReadPixels,
    Present,
    Release,
}

pub(crate) type CallLog = Rc<RefCell<Vec<GpuCall>>>;

pub(crate) struct RecordingContext {
    size: Size,
    order: RowOrder,
    log: CallLog,
    next_id: u32,
    /// Byte written into every pixel on readback, so copies are observable.
    fill: u8,
    fail_program: bool,
}

impl RecordingContext {
    fn new(size: Size) -> Self {
        Self {
            size,
            order: RowOrder::BottomUp,
            log: CallLog::default(),
            next_id: 0,
            fill: 7,
            fail_program: false,
        }
    }

    fn id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl GpuContext for RecordingContext {
    fn size(&self) -> Size {
        self.size
    }

    fn readback_order(&self) -> RowOrder {
        self.order
    }

    fn create_buffer(&mut self, kind: BufferKind, contents: &[u8]) -> Result<BufferId, RenderError> {
        self.log.borrow_mut().push(GpuCall::CreateBuffer(kind, contents.len()));
        Ok(BufferId(self.id()))
    }

    fn create_program(&mut self, _label: &str, _wgsl: &str) -> Result<ProgramId, RenderError> {
        if self.fail_program {
            return Err(RenderError::ShaderBuild {
                log: "0:1: syntax error".into(),
            });
        }
        self.log.borrow_mut().push(GpuCall::CreateProgram);
        Ok(ProgramId(self.id()))
    }

    fn attribute_location(&self, _program: ProgramId, name: &str) -> Option<u32> {
        match name {
            "a_position" => Some(0),
            "a_tex_coord" => Some(1),
            "a_lighting" => Some(2),
            _ => None,
        }
    }

    fn create_texture(
        &mut self,
        image: TextureImage<'_>,
        sampling: Sampling,
    ) -> Result<TextureId, RenderError> {
        self.log.borrow_mut().push(GpuCall::CreateTexture {
            width: image.width,
            height: image.height,
            sampling,
        });
        Ok(TextureId(self.id()))
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.log.borrow_mut().push(GpuCall::DeleteTexture(texture));
    }

    fn set_depth(&mut self, depth: DepthState) {
        self.log.borrow_mut().push(GpuCall::SetDepth(depth));
    }

    fn set_blend(&mut self, blend: BlendMode) {
        self.log.borrow_mut().push(GpuCall::SetBlend(blend));
    }

    fn clear(&mut self, _color: [f32; 4]) {
        self.log.borrow_mut().push(GpuCall::Clear);
    }

    fn draw(&mut self, call: &DrawCall<'_>) {
        self.log.borrow_mut().push(GpuCall::Draw {
            texture: call.texture,
            index_count: call.index_count,
            uniforms: call.uniforms,
        });
    }

    fn read_pixels(&mut self, out: &mut [u8]) -> Result<(), RenderError> {
        self.log.borrow_mut().push(GpuCall::ReadPixels);
        out.fill(self.fill);
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.log.borrow_mut().push(GpuCall::Present);
        Ok(())
    }

    fn release(&mut self) {
        self.log.borrow_mut().push(GpuCall::Release);
    }
}

/// Canvas handing out [`RecordingContext`]s that share one call log.
pub(crate) struct RecordingCanvas {
    pub size: Size,
    pub log: CallLog,
    pub available: bool,
    pub fail_program: bool,
    pub last_options: Option<ContextOptions>,
}

impl RecordingCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Size::new(width, height),
            log: CallLog::default(),
            available: true,
            fail_program: false,
            last_options: None,
        }
    }

    pub fn calls(&self) -> Vec<GpuCall> {
        self.log.borrow().clone()
    }

    pub fn reset_log(&self) {
        self.log.borrow_mut().clear();
    }
}

impl GpuCanvas for RecordingCanvas {
    fn size(&self) -> Size {
        self.size
    }

    fn create_context(
        &mut self,
        options: &ContextOptions,
    ) -> Result<Box<dyn GpuContext>, RenderError> {
        if !self.available {
            return Err(RenderError::ContextUnavailable("canvas is detached".into()));
        }
        self.last_options = Some(options.clone());
        let mut ctx = RecordingContext::new(self.size);
        ctx.log = self.log.clone();
        ctx.fail_program = self.fail_program;
        Ok(Box::new(ctx))
    }
}
