use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use crate::canvas::PixelSurface;
use crate::device::Size;

use super::primary::{PrimaryInner, PrimaryRenderer};
use super::request::RenderRequest;

pub(crate) struct BlitInner {
    surface: RefCell<Box<dyn PixelSurface>>,
    size: Size,
    pub(crate) models: RefCell<Vec<RenderRequest>>,
    backend: RefCell<Option<Weak<PrimaryInner>>>,
    one_shot: bool,
}

impl BlitInner {
    pub fn new(
        surface: Box<dyn PixelSurface>,
        models: Vec<RenderRequest>,
        backend: &Rc<PrimaryInner>,
        one_shot: bool,
    ) -> Self {
        Self {
            size: surface.size(),
            surface: RefCell::new(surface),
            models: RefCell::new(models),
            backend: RefCell::new(Some(Rc::downgrade(backend))),
            one_shot,
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn is_one_shot(&self) -> bool {
        self.one_shot
    }

    /// Writes one backend frame into the surface.
    pub fn copy(&self, pixels: &[u8]) {
        self.surface.borrow_mut().put_image_data(pixels);
    }

    pub fn backend(&self) -> Option<Rc<PrimaryInner>> {
        self.backend.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub fn is_backed_by(&self, primary: &Rc<PrimaryInner>) -> bool {
        self.backend
            .borrow()
            .as_ref()
            .is_some_and(|w| std::ptr::eq(w.as_ptr(), Rc::as_ptr(primary)))
    }

    /// Forgets the backend without touching its dependent list.
    pub fn clear_backend(&self) {
        self.backend.replace(None);
    }
}

/// Renderer that borrows a primary renderer's GPU context and receives its
/// frames through pixel readback.
#[derive(Clone)]
pub struct BlitRenderer {
    pub(crate) inner: Rc<BlitInner>,
}

impl BlitRenderer {
    pub fn size(&self) -> Size {
        self.inner.size()
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

    /// The primary renderer this blit is attached to, if any.
    pub fn backend(&self) -> Option<PrimaryRenderer> {
        self.inner
            .backend()
            .map(|inner| PrimaryRenderer { inner })
    }

    pub fn is_attached(&self) -> bool {
        self.inner.backend().is_some()
    }

    /// Detaches from the backend. Calling it again is a no-op.
    pub fn destroy(&self) {
        if let Some(backend) = self.inner.backend() {
            backend.remove_dependent(&self.inner);
        }
        self.inner.clear_backend();
    }
}
