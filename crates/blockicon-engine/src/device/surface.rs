/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; presentation may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); the context should be released.
    Fatal,
}

/// Surface bound to a window plus its active configuration.
pub(crate) struct PresentSurface {
    pub surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
}

/// Picks a linear (non-sRGB) surface format so blending matches the
/// offscreen target. Falls back to the first format when only sRGB ones exist.
pub(crate) fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
) -> Option<wgpu::TextureFormat> {
    [wgpu::TextureFormat::Bgra8Unorm, wgpu::TextureFormat::Rgba8Unorm]
        .into_iter()
        .find(|f| formats.contains(f))
        .or_else(|| formats.iter().copied().find(|f| !f.is_srgb()))
        .or_else(|| formats.first().copied())
}

pub(crate) fn choose_alpha_mode(caps: &wgpu::SurfaceCapabilities) -> wgpu::CompositeAlphaMode {
    // Icons are drawn on transparent backgrounds; prefer a compositing mode
    // that keeps that transparency.
    [
        wgpu::CompositeAlphaMode::PreMultiplied,
        wgpu::CompositeAlphaMode::PostMultiplied,
    ]
    .into_iter()
    .find(|m| caps.alpha_modes.contains(m))
    .or_else(|| caps.alpha_modes.first().copied())
    .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

pub(crate) fn parse_present_mode(value: Option<&str>) -> wgpu::PresentMode {
    match value {
        Some("mailbox") => wgpu::PresentMode::Mailbox,
        Some("immediate") => wgpu::PresentMode::Immediate,
        Some("fifo") | None => wgpu::PresentMode::Fifo,
        Some(other) => {
            log::debug!("unknown present_mode `{other}`; using fifo");
            wgpu::PresentMode::Fifo
        }
    }
}

pub(crate) fn map_surface_error(
    present: &PresentSurface,
    device: &wgpu::Device,
    err: wgpu::SurfaceError,
) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            if present.config.width > 0 && present.config.height > 0 {
                present.surface.configure(device, &present.config);
            }
            SurfaceErrorAction::Reconfigured
        }
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
        wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}
