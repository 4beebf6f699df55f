use std::cell::{Ref, RefCell};
use std::rc::Rc;

use image::RgbaImage;

use crate::device::Size;

/// A 2D drawable surface that accepts whole RGBA8 frames.
pub trait PixelSurface {
    fn size(&self) -> Size;

    /// Replaces the surface contents.
    ///
    /// `pixels` is tightly packed RGBA8, top row first, exactly
    /// `width * height * 4` bytes. Any other length is a caller bug.
    fn put_image_data(&mut self, pixels: &[u8]);
}

/// In-memory [`PixelSurface`].
///
/// Clones share the same image, so a caller can keep one handle and inspect
/// what a blit renderer wrote through the other.
#[derive(Debug, Clone)]
pub struct ImageSurface {
    image: Rc<RefCell<RgbaImage>>,
}

impl ImageSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: Rc::new(RefCell::new(RgbaImage::new(width, height))),
        }
    }

    pub fn image(&self) -> Ref<'_, RgbaImage> {
        self.image.borrow()
    }

    pub fn to_image(&self) -> RgbaImage {
        self.image.borrow().clone()
    }
}

impl PixelSurface for ImageSurface {
    fn size(&self) -> Size {
        let img = self.image.borrow();
        Size::new(img.width(), img.height())
    }

    fn put_image_data(&mut self, pixels: &[u8]) {
        let mut img = self.image.borrow_mut();
        let expected = Size::new(img.width(), img.height()).rgba_len();
        assert_eq!(
            pixels.len(),
            expected,
            "pixel data does not match a {}x{} surface",
            img.width(),
            img.height()
        );
        img.copy_from_slice(pixels);
    }
}
