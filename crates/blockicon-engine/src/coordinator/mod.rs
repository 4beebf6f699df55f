//! Rendering coordinator.
//!
//! A [`Coordinator`] creates renderers and owns what they share: the registry
//! of live primary renderers keyed by canvas size, the texture loader, the
//! frame scheduler and the [`RendererConfig`].
//!
//! A [`PrimaryRenderer`] owns one GPU context and runs a frame loop on it.
//! A [`BlitRenderer`] has no context; it is drawn inside a primary's frame
//! and receives the pixels through readback, so many small surfaces can be
//! served by one context.

mod blit;
mod primary;
mod registry;
mod request;
mod scheduler;

pub use blit::BlitRenderer;
pub use primary::PrimaryRenderer;
pub use request::RenderRequest;
pub use scheduler::{CancelToken, FrameScheduler, LocalFuture, TokioScheduler};

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use std::time::Duration;

use crate::canvas::{GpuCanvas, PixelSurface};
use crate::device::{ContextOptions, Size};
use crate::error::RenderError;
use crate::texture::{TextureLoader, TextureSource};

use registry::Registry;

/// Frame interval of the default scheduler (60 Hz).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// Settings shared by every renderer of a coordinator.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Tick interval of the default [`TokioScheduler`].
    pub frame_interval: Duration,
    /// Glint texture override; the built-in streak texture when `None`.
    pub glint: Option<TextureSource>,
    /// RGBA clear color, 0..=1 per channel.
    pub clear_color: [f32; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            frame_interval: DEFAULT_FRAME_INTERVAL,
            glint: None,
            clear_color: [0.0; 4],
        }
    }
}

/// State every primary renderer of one coordinator holds on to.
#[derive(Clone)]
pub(crate) struct Shared {
    pub registry: Rc<RefCell<Registry>>,
    pub loader: TextureLoader,
    pub config: Rc<RendererConfig>,
}

pub struct Coordinator {
    shared: Shared,
    scheduler: Rc<dyn FrameScheduler>,
}

impl Coordinator {
    /// Coordinator ticking on the tokio runtime. Renderers must be created
    /// inside a [`tokio::task::LocalSet`].
    pub fn new(config: RendererConfig) -> Self {
        let scheduler = Rc::new(TokioScheduler::new(config.frame_interval));
        Self::with_scheduler(config, scheduler)
    }

    pub fn with_scheduler(config: RendererConfig, scheduler: Rc<dyn FrameScheduler>) -> Self {
        Self {
            shared: Shared {
                registry: Rc::default(),
                loader: TextureLoader::new(),
                config: Rc::new(config),
            },
            scheduler,
        }
    }

    /// Replaces the texture loader, e.g. to share an HTTP client.
    pub fn with_loader(mut self, loader: TextureLoader) -> Self {
        self.shared.loader = loader;
        self
    }

    pub fn config(&self) -> &RendererConfig {
        &self.shared.config
    }

    /// Creates a primary renderer with its own GPU context on `canvas` and
    /// starts its frame loop.
    ///
    /// Fails when the canvas cannot provide a context or the shader program
    /// does not build.
    pub fn create_renderer(
        &self,
        canvas: &mut dyn GpuCanvas,
        requests: impl Into<Vec<RenderRequest>>,
        options: &ContextOptions,
    ) -> Result<PrimaryRenderer, RenderError> {
        PrimaryRenderer::create(
            canvas,
            requests.into(),
            options,
            self.shared.clone(),
            Rc::clone(&self.scheduler),
        )
    }

    /// Attaches a blit renderer for `surface` to the newest live primary of
    /// the same size.
    ///
    /// `None` means no such primary exists; callers usually fall back to
    /// [`create_renderer`](Self::create_renderer).
    pub fn create_shared_renderer(
        &self,
        surface: impl PixelSurface + 'static,
        requests: impl Into<Vec<RenderRequest>>,
    ) -> Option<BlitRenderer> {
        let backend = self.primary_for(surface.size())?;
        match backend.create_shared_renderer(surface, requests) {
            Ok(blit) => Some(blit),
            Err(err) => {
                log::debug!("no shared backend: {err}");
                None
            }
        }
    }

    /// The primary renderer new blits of `size` would attach to.
    pub fn primary_for(&self, size: Size) -> Option<PrimaryRenderer> {
        self.shared
            .registry
            .borrow()
            .lookup(size)
            .map(|inner| PrimaryRenderer { inner })
    }

    /// Number of live registered primary renderers.
    pub fn primary_count(&self) -> usize {
        self.shared.registry.borrow().len()
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

/// Either kind of renderer.
#[derive(Clone)]
pub enum Renderer {
    Primary(PrimaryRenderer),
    Blit(BlitRenderer),
}

impl Renderer {
    pub fn models(&self) -> Ref<'_, Vec<RenderRequest>> {
        match self {
            Renderer::Primary(r) => r.models(),
            Renderer::Blit(r) => r.models(),
        }
    }

    pub fn models_mut(&self) -> RefMut<'_, Vec<RenderRequest>> {
        match self {
            Renderer::Primary(r) => r.models_mut(),
            Renderer::Blit(r) => r.models_mut(),
        }
    }

    pub fn set_models(&self, models: impl Into<Vec<RenderRequest>>) {
        match self {
            Renderer::Primary(r) => r.set_models(models),
            Renderer::Blit(r) => r.set_models(models),
        }
    }

    pub fn as_primary(&self) -> Option<&PrimaryRenderer> {
        match self {
            Renderer::Primary(r) => Some(r),
            Renderer::Blit(_) => None,
        }
    }

    pub fn destroy(&self) {
        match self {
            Renderer::Primary(r) => r.destroy(),
            Renderer::Blit(r) => r.destroy(),
        }
    }
}

impl From<PrimaryRenderer> for Renderer {
    fn from(renderer: PrimaryRenderer) -> Self {
        Renderer::Primary(renderer)
    }
}

impl From<BlitRenderer> for Renderer {
    fn from(renderer: BlitRenderer) -> Self {
        Renderer::Blit(renderer)
    }
}
