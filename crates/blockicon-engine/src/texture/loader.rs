use std::sync::Arc;

use image::RgbaImage;

use crate::device::{GpuContext, Sampling, TextureId, TextureImage, Wrap};
use crate::error::RenderError;

use super::source::TextureSource;

/// Resolves [`TextureSource`]s into decoded RGBA8 images.
///
/// `http://` and `https://` URLs go through a shared HTTP client; `file://`
/// URLs and bare paths are read from disk.
#[derive(Debug, Clone, Default)]
pub struct TextureLoader {
    client: reqwest::Client,
}

impl TextureLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `source`. Only URL sources suspend.
    pub async fn resolve(&self, source: &TextureSource) -> Result<Arc<RgbaImage>, RenderError> {
        match source {
            TextureSource::Image(img) => Ok(Arc::clone(img)),
            TextureSource::Pixels {
                width,
                height,
                data,
            } => RgbaImage::from_raw(*width, *height, data.to_vec())
                .map(Arc::new)
                .ok_or(RenderError::PixelBufferSize {
                    width: *width,
                    height: *height,
                    len: data.len(),
                    expected: *width as usize * *height as usize * 4,
                }),
            TextureSource::Region(region) => Ok(Arc::new(region.to_image())),
            TextureSource::Url(url) => {
                let bytes = self.fetch(url).await?;
                let img = image::load_from_memory(&bytes).map_err(|e| {
                    RenderError::TextureDecode {
                        origin: url.clone(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(Arc::new(img.to_rgba8()))
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, RenderError> {
        let fetch_err = |reason: String| RenderError::TextureFetch {
            url: url.to_string(),
            reason,
        };

        if url.starts_with("http://") || url.starts_with("https://") {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| fetch_err(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(fetch_err(format!("HTTP {status}")));
            }
            let body = response.bytes().await.map_err(|e| fetch_err(e.to_string()))?;
            return Ok(body.to_vec());
        }

        let path = url.strip_prefix("file://").unwrap_or(url);
        tokio::fs::read(path)
            .await
            .map_err(|e| fetch_err(e.to_string()))
    }
}

/// Sampling for a texture of the given size.
///
/// Only power-of-two textures mipmap and repeat; anything else clamps to the
/// edge, which constrained GPU profiles require for non-power-of-two sizes.
pub fn sampling_for(width: u32, height: u32) -> Sampling {
    if width.is_power_of_two() && height.is_power_of_two() {
        Sampling {
            mipmaps: true,
            wrap: Wrap::Repeat,
        }
    } else {
        Sampling {
            mipmaps: false,
            wrap: Wrap::ClampToEdge,
        }
    }
}

/// Uploads a decoded image into `ctx`.
pub fn upload_texture(ctx: &mut dyn GpuContext, image: &RgbaImage) -> Result<TextureId, RenderError> {
    let (width, height) = image.dimensions();
    ctx.create_texture(
        TextureImage {
            width,
            height,
            rgba: image.as_raw(),
        },
        sampling_for(width, height),
    )
}

/// Resolves `source` and uploads it into `ctx`.
pub async fn load_texture_auto(
    ctx: &mut dyn GpuContext,
    loader: &TextureLoader,
    source: &TextureSource,
) -> Result<TextureId, RenderError> {
    let image = loader.resolve(source).await?;
    upload_texture(ctx, &image)
}
