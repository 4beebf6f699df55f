use std::fmt;
use std::sync::Arc;

use image::{imageops, RgbaImage};

use crate::device::Size;
use crate::error::RenderError;

use super::loader::TextureLoader;
use super::source::TextureSource;

/// A decoded sprite sheet that hands out sub-image cutouts.
#[derive(Debug, Clone)]
pub struct Atlas {
    image: Arc<RgbaImage>,
}

impl Atlas {
    pub fn from_image(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
        }
    }

    /// Resolves `source` and wraps the result.
    pub async fn load(loader: &TextureLoader, source: &TextureSource) -> Result<Self, RenderError> {
        Ok(Self {
            image: loader.resolve(source).await?,
        })
    }

    pub fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }

    /// Cutout of the `width` x `height` rectangle whose top-left is `(x, y)`.
    ///
    /// The cutout shares the atlas pixels. Empty or out-of-bounds rectangles
    /// are rejected.
    pub fn get_cutout(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<PixelRegion, RenderError> {
        let size = self.size();
        let fits = width > 0
            && height > 0
            && x.checked_add(width).is_some_and(|r| r <= size.width)
            && y.checked_add(height).is_some_and(|b| b <= size.height);
        if !fits {
            return Err(RenderError::CutoutOutOfBounds {
                x,
                y,
                width,
                height,
                atlas: size,
            });
        }

        Ok(PixelRegion {
            image: Arc::clone(&self.image),
            x,
            y,
            width,
            height,
        })
    }
}

/// A read-only rectangle of an atlas image.
#[derive(Clone)]
pub struct PixelRegion {
    image: Arc<RgbaImage>,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl PixelRegion {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Copies the region out into its own image.
    pub fn to_image(&self) -> RgbaImage {
        imageops::crop_imm(&*self.image, self.x, self.y, self.width, self.height).to_image()
    }
}

impl fmt::Debug for PixelRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Region({}x{} at {},{})",
            self.width, self.height, self.x, self.y
        )
    }
}
