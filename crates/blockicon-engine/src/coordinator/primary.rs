use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;

use crate::canvas::{GpuCanvas, PixelSurface};
use crate::device::{ContextId, ContextOptions, GpuContext, RowOrder, Size, TextureId};
use crate::draw::{draw_frame, FrameParams};
use crate::error::RenderError;
use crate::model::{create_model, Model, ModelKind};
use crate::program::{setup_program, ProgramInfo};
use crate::texture::{default_glint_image, upload_texture};
use crate::time::{FrameClock, FrameTime};

use super::blit::{BlitInner, BlitRenderer};
use super::request::{PrepareJob, Prepared, RenderRequest, Step};
use super::scheduler::{CancelToken, FrameScheduler};
use super::Shared;

/// Per-context GPU state. Never borrowed across an await.
struct GpuState {
    ctx: Box<dyn GpuContext>,
    program: ProgramInfo,
    models: HashMap<ModelKind, Model>,
    glint: Option<TextureId>,
    /// Request textures uploaded into `ctx`. The glint is not among them.
    textures: HashSet<TextureId>,
    readback: Vec<u8>,
}

pub(crate) struct PrimaryInner {
    id: ContextId,
    size: Size,
    gpu: RefCell<GpuState>,
    models: RefCell<Vec<RenderRequest>>,
    dependents: RefCell<Vec<Rc<BlitInner>>>,
    cancel: CancelToken,
    destroyed: Cell<bool>,
    shared: Shared,
}

impl PrimaryInner {
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    fn ensure_alive(&self) -> Result<(), RenderError> {
        if self.destroyed.get() {
            Err(RenderError::ContextLost)
        } else {
            Ok(())
        }
    }

    pub fn remove_dependent(&self, blit: &Rc<BlitInner>) {
        let mut deps = self.dependents.borrow_mut();
        let before = deps.len();
        deps.retain(|d| !Rc::ptr_eq(d, blit));
        let removed = deps.len() != before;
        drop(deps);
        if removed {
            log::debug!("detached blit renderer from primary {}", self.size);
            self.collect_textures();
        }
    }

    /// Deletes request textures that no request of this renderer or its
    /// blits is prepared with anymore.
    ///
    /// Skipped while a request list is borrowed; the end of the next frame
    /// collects instead.
    fn collect_textures(&self) {
        if self.destroyed.get() {
            return;
        }

        let mut live = HashSet::new();
        let mut mark = |list: &RefCell<Vec<RenderRequest>>| match list.try_borrow() {
            Ok(list) => {
                live.extend(
                    list.iter()
                        .filter_map(RenderRequest::prepared)
                        .filter(|p| p.context == self.id)
                        .map(|p| p.texture),
                );
                true
            }
            Err(_) => false,
        };
        let mut complete = mark(&self.models);
        for blit in self.dependents.borrow().iter() {
            complete &= mark(&blit.models);
        }
        if !complete {
            return;
        }

        let Ok(mut gpu) = self.gpu.try_borrow_mut() else { return };
        let GpuState { ctx, textures, .. } = &mut *gpu;
        let before = textures.len();
        textures.retain(|texture| {
            let keep = live.contains(texture);
            if !keep {
                ctx.delete_texture(*texture);
            }
            keep
        });
        if textures.len() != before {
            log::debug!(
                "deleted {} unused textures on primary {}",
                before - textures.len(),
                self.size
            );
        }
    }

    async fn render_frame(self: &Rc<Self>, time: FrameTime) -> Result<(), RenderError> {
        self.ensure_alive()?;
        let flip = self.gpu.borrow().ctx.readback_order() == RowOrder::BottomUp;

        let dependents = self.dependents.borrow().clone();
        for blit in dependents {
            // A blit destroyed while an earlier one was preparing is skipped.
            if !blit.is_backed_by(self) {
                continue;
            }
            self.render_list(&blit.models, flip, time.now_ms).await?;
            // Destroyed while one of its requests was preparing.
            if !blit.is_backed_by(self) {
                continue;
            }

            let mut pixels = std::mem::take(&mut self.gpu.borrow_mut().readback);
            pixels.resize(self.size.rgba_len(), 0);
            let read = self.gpu.borrow_mut().ctx.read_pixels(&mut pixels);
            match read {
                Ok(()) => blit.copy(&pixels),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => log::error!("readback for blit renderer failed: {err}"),
            }
            self.gpu.borrow_mut().readback = pixels;

            if blit.is_one_shot() {
                self.remove_dependent(&blit);
                blit.clear_backend();
            }
        }

        self.render_list(&self.models, false, time.now_ms).await?;
        let presented = self.gpu.borrow_mut().ctx.present();
        self.collect_textures();
        presented
    }

    /// Clears the frame and draws `list` in order, preparing requests that
    /// have no resources on this context yet.
    async fn render_list(
        &self,
        list: &RefCell<Vec<RenderRequest>>,
        flip: bool,
        time_ms: f64,
    ) -> Result<(), RenderError> {
        self.gpu.borrow_mut().ctx.clear(self.shared.config.clear_color);

        let mut index = 0;
        loop {
            let step = match list.borrow().get(index) {
                Some(req) => (req.step(self.id), req.frame_params(flip, time_ms)),
                None => break,
            };

            let ready = match step {
                (Step::Draw(prepared), params) => Some((prepared, params)),
                (Step::Skip, _) => None,
                (Step::Prepare(job), _) => {
                    let outcome = match self.prepare(&job).await {
                        Err(err) if err.is_fatal() => return Err(err),
                        outcome => outcome,
                    };
                    self.ensure_alive()?;
                    let mut list = list.borrow_mut();
                    list.get_mut(index).and_then(|req| {
                        req.finish(&job, outcome)
                            .map(|prepared| (prepared, req.frame_params(flip, time_ms)))
                    })
                }
            };

            if let Some((prepared, params)) = ready {
                self.draw(&prepared, &params);
            }
            index += 1;
        }
        Ok(())
    }

    async fn prepare(&self, job: &PrepareJob) -> Result<Prepared, RenderError> {
        let image = self.shared.loader.resolve(&job.texture).await?;
        let glint = if job.enchanted {
            Some(self.glint_texture().await?)
        } else {
            None
        };
        self.ensure_alive()?;

        let mut gpu = self.gpu.borrow_mut();
        let GpuState {
            ctx,
            models,
            textures,
            ..
        } = &mut *gpu;
        if let Entry::Vacant(slot) = models.entry(job.kind) {
            slot.insert(create_model(ctx.as_mut(), job.kind)?);
        }
        let texture = upload_texture(ctx.as_mut(), &image)?;
        textures.insert(texture);

        Ok(Prepared {
            context: self.id,
            kind: job.kind,
            texture,
            glint,
        })
    }

    /// The glint texture of this context, loaded on first use.
    async fn glint_texture(&self) -> Result<TextureId, RenderError> {
        if let Some(id) = self.gpu.borrow().glint {
            return Ok(id);
        }
        let image = match &self.shared.config.glint {
            Some(source) => self.shared.loader.resolve(source).await?,
            None => Arc::new(default_glint_image()),
        };
        self.ensure_alive()?;

        let mut gpu = self.gpu.borrow_mut();
        if let Some(id) = gpu.glint {
            return Ok(id);
        }
        let id = upload_texture(gpu.ctx.as_mut(), &image)?;
        gpu.glint = Some(id);
        log::debug!("loaded glint texture for primary {}", self.size);
        Ok(id)
    }

    fn draw(&self, prepared: &Prepared, params: &FrameParams) {
        let mut gpu = self.gpu.borrow_mut();
        let GpuState {
            ctx,
            program,
            models,
            ..
        } = &mut *gpu;
        match models.get(&prepared.kind) {
            Some(model) => draw_frame(
                ctx.as_mut(),
                program,
                model,
                prepared.texture,
                prepared.glint,
                params,
            ),
            None => log::warn!("no {:?} model on primary {}", prepared.kind, self.size),
        }
    }

    fn destroy(self: &Rc<Self>) {
        if self.destroyed.replace(true) {
            return;
        }
        self.cancel.cancel();
        self.shared.registry.borrow_mut().remove(self.size, self);
        for blit in self.dependents.take() {
            blit.clear_backend();
        }
        self.gpu.borrow_mut().ctx.release();
        log::debug!("destroyed primary renderer {}", self.size);
    }
}

/// Frame loop of one primary renderer. Ends on cancellation or context loss.
async fn run_loop(inner: Rc<PrimaryInner>, scheduler: Rc<dyn FrameScheduler>) {
    let mut clock = FrameClock::new();
    loop {
        tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => break,
            _ = scheduler.next_frame() => {}
        }

        let time = clock.tick();
        match inner.render_frame(time).await {
            Ok(()) => {}
            Err(RenderError::ContextLost) => break,
            Err(err) => log::error!("frame {} on primary {} failed: {err}", time.frame_index, inner.size),
        }
        if inner.cancel.is_cancelled() {
            break;
        }
    }
    log::debug!("frame loop for primary {} stopped", inner.size);
}

/// Renderer that owns a GPU context and presents to its canvas.
///
/// Blit renderers attached to it are rendered into the same context first,
/// one after another, and receive the read-back pixels.
#[derive(Clone)]
pub struct PrimaryRenderer {
    pub(crate) inner: Rc<PrimaryInner>,
}

impl PrimaryRenderer {
    pub(crate) fn create(
        canvas: &mut dyn GpuCanvas,
        models: Vec<RenderRequest>,
        options: &ContextOptions,
        shared: Shared,
        scheduler: Rc<dyn FrameScheduler>,
    ) -> Result<Self, RenderError> {
        let mut ctx = canvas.create_context(options)?;
        let program = match setup_program(ctx.as_mut()) {
            Ok(program) => program,
            Err(err) => {
                ctx.release();
                return Err(err);
            }
        };

        let size = ctx.size();
        let inner = Rc::new(PrimaryInner {
            id: ContextId::next(),
            size,
            gpu: RefCell::new(GpuState {
                ctx,
                program,
                models: HashMap::new(),
                glint: None,
                textures: HashSet::new(),
                readback: Vec::new(),
            }),
            models: RefCell::new(models),
            dependents: RefCell::new(Vec::new()),
            cancel: CancelToken::new(),
            destroyed: Cell::new(false),
            shared,
        });
        inner.shared.registry.borrow_mut().insert(size, &inner);

        let task = run_loop(Rc::clone(&inner), Rc::clone(&scheduler));
        scheduler.spawn_local(Box::pin(task));

        log::debug!(
            "created primary renderer {size} (antialias: {})",
            options.antialias
        );
        Ok(Self { inner })
    }

    pub fn size(&self) -> Size {
        self.inner.size
    }

    pub fn context_id(&self) -> ContextId {
        self.inner.id
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }

    pub fn models(&self) -> Ref<'_, Vec<RenderRequest>> {
        self.inner.models.borrow()
    }

    pub fn models_mut(&self) -> RefMut<'_, Vec<RenderRequest>> {
        self.inner.models.borrow_mut()
    }

    pub fn set_models(&self, models: impl Into<Vec<RenderRequest>>) {
        *self.inner.models.borrow_mut() = models.into();
    }

    /// Number of attached blit renderers.
    pub fn dependent_count(&self) -> usize {
        self.inner.dependents.borrow().len()
    }

    /// Attaches a persistent blit renderer drawing `requests` into `surface`.
    ///
    /// The surface must have the same pixel size as this renderer.
    pub fn create_shared_renderer(
        &self,
        surface: impl PixelSurface + 'static,
        requests: impl Into<Vec<RenderRequest>>,
    ) -> Result<BlitRenderer, RenderError> {
        self.attach(Box::new(surface), requests.into(), false)
    }

    /// Like [`create_shared_renderer`](Self::create_shared_renderer), but the
    /// blit detaches itself after receiving one frame.
    pub fn render_shared(
        &self,
        surface: impl PixelSurface + 'static,
        requests: impl Into<Vec<RenderRequest>>,
    ) -> Result<BlitRenderer, RenderError> {
        self.attach(Box::new(surface), requests.into(), true)
    }

    fn attach(
        &self,
        surface: Box<dyn PixelSurface>,
        requests: Vec<RenderRequest>,
        one_shot: bool,
    ) -> Result<BlitRenderer, RenderError> {
        self.inner.ensure_alive()?;
        let surface_size = surface.size();
        if surface_size != self.inner.size {
            return Err(RenderError::SizeMismatch {
                surface: surface_size,
                backend: self.inner.size,
            });
        }

        let blit = Rc::new(BlitInner::new(surface, requests, &self.inner, one_shot));
        self.inner.dependents.borrow_mut().push(Rc::clone(&blit));
        log::debug!(
            "attached {} blit renderer to primary {}",
            if one_shot { "one-shot" } else { "persistent" },
            self.inner.size
        );
        Ok(BlitRenderer { inner: blit })
    }

    /// Renders one frame: every attached blit renderer, then this renderer's
    /// own requests.
    ///
    /// The frame loop calls this on every tick; hosts driving frames
    /// themselves may call it directly.
    pub async fn render_frame(&self, time: FrameTime) -> Result<(), RenderError> {
        self.inner.render_frame(time).await
    }

    /// Stops the frame loop, detaches all blit renderers, removes this
    /// renderer from the registry and releases the GPU context.
    pub fn destroy(&self) {
        self.inner.destroy();
    }
}
