use crate::backend::gpu::convert;
use crate::resource::ImageFormat;

use super::SurfaceErrorAction;

/// First preferred format the surface offers, else its first 8-bit color format.
///
/// The engine can only address formats it knows, so anything else is skipped.
pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    preferred: &[ImageFormat],
) -> Option<wgpu::TextureFormat> {
    preferred
        .iter()
        .map(|f| convert::texture_format(*f))
        .find(|f| caps.formats.contains(f))
        .or_else(|| {
            caps.formats.iter().copied().find(|f| {
                convert::image_format(*f).is_some_and(ImageFormat::is_rgba8_family)
            })
        })
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    match requested {
        Some(mode) if caps.alpha_modes.contains(&mode) => mode,
        _ => caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto),
    }
}

/// FIFO with vsync; otherwise mailbox, then immediate, then FIFO.
pub(crate) fn choose_present_mode(caps: &wgpu::SurfaceCapabilities, vsync: bool) -> wgpu::PresentMode {
    if vsync {
        return wgpu::PresentMode::Fifo;
    }
    [wgpu::PresentMode::Mailbox, wgpu::PresentMode::Immediate]
        .into_iter()
        .find(|m| caps.present_modes.contains(m))
        .unwrap_or(wgpu::PresentMode::Fifo)
}

/// Extra view formats that let blits bypass sRGB encoding.
pub(crate) fn raw_view_formats(format: wgpu::TextureFormat) -> Vec<wgpu::TextureFormat> {
    let raw = format.remove_srgb_suffix();
    if raw == format { vec![] } else { vec![raw] }
}

/// Reconfigures on lost or outdated surfaces. The drawable size never changes.
pub(crate) fn recover(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    err: wgpu::SurfaceError,
) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            log::warn!("surface {err}; reconfiguring");
            surface.configure(device, config);
            SurfaceErrorAction::Reconfigured
        }
        wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => {
            log::warn!("surface {err}; skipping the frame");
            SurfaceErrorAction::SkipFrame
        }
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
    }
}
