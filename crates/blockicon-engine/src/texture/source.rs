use std::fmt;
use std::sync::Arc;

use image::RgbaImage;

use crate::device::Size;
use crate::error::RenderError;

use super::atlas::PixelRegion;

/// Where a texture's pixels come from.
#[derive(Clone)]
pub enum TextureSource {
    /// `http(s)://` URL, `file://` URL or filesystem path of an encoded image.
    Url(String),
    /// Already decoded image.
    Image(Arc<RgbaImage>),
    /// Raw RGBA8 pixels, top row first.
    Pixels {
        width: u32,
        height: u32,
        data: Arc<[u8]>,
    },
    /// Read-only cutout of an [`Atlas`](super::Atlas).
    Region(PixelRegion),
}

impl TextureSource {
    pub fn url(url: impl Into<String>) -> Self {
        TextureSource::Url(url.into())
    }

    pub fn image(image: RgbaImage) -> Self {
        TextureSource::Image(Arc::new(image))
    }

    /// Raw pixels; `data` must hold exactly `width * height * 4` bytes.
    pub fn pixels(width: u32, height: u32, data: impl Into<Arc<[u8]>>) -> Result<Self, RenderError> {
        let data = data.into();
        let expected = Size::new(width, height).rgba_len();
        if data.len() != expected {
            return Err(RenderError::PixelBufferSize {
                width,
                height,
                len: data.len(),
                expected,
            });
        }
        Ok(TextureSource::Pixels {
            width,
            height,
            data,
        })
    }
}

impl fmt::Debug for TextureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureSource::Url(url) => write!(f, "Url({url})"),
            TextureSource::Image(img) => write!(f, "Image({}x{})", img.width(), img.height()),
            TextureSource::Pixels { width, height, .. } => write!(f, "Pixels({width}x{height})"),
            TextureSource::Region(region) => write!(f, "{region:?}"),
        }
    }
}

impl From<&str> for TextureSource {
    fn from(url: &str) -> Self {
        TextureSource::url(url)
    }
}

impl From<String> for TextureSource {
    fn from(url: String) -> Self {
        TextureSource::Url(url)
    }
}

impl From<RgbaImage> for TextureSource {
    fn from(image: RgbaImage) -> Self {
        TextureSource::image(image)
    }
}

impl From<PixelRegion> for TextureSource {
    fn from(region: PixelRegion) -> Self {
        TextureSource::Region(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixels_validates_length() {
        assert!(TextureSource::pixels(2, 2, vec![0u8; 16]).is_ok());
        let err = TextureSource::pixels(2, 2, vec![0u8; 15]).unwrap_err();
        assert!(matches!(err, RenderError::PixelBufferSize { expected: 16, len: 15, .. }));
    }

    #[test]
    fn debug_hides_pixel_data() {
        let src = TextureSource::pixels(1, 1, vec![1u8, 2, 3, 4]).unwrap();
        assert_eq!(format!("{src:?}"), "Pixels(1x1)");
    }
}
