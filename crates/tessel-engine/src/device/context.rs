use anyhow::{Context, Result};
use wgpu::SurfaceError;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::{GpuInit, SurfaceErrorAction, SurfaceFrame};
use super::surface;

struct SurfaceState<'w> {
    surface: wgpu::Surface<'w>,
    config: wgpu::SurfaceConfiguration,
}

/// Owns wgpu core objects and, when bound to a window, the surface configuration.
///
/// The drawable size is fixed at creation; windows created by the runtime are
/// not resizable.
pub struct Gpu<'w> {
    /// Kept alive for the lifetime of the surface.
    instance: wgpu::Instance,

    /// `None` for headless devices.
    surface: Option<SurfaceState<'w>>,

    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,

    /// Drawable size in physical pixels (zero when headless).
    size: PhysicalSize<u32>,
}

fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    })
}

async fn request_device(
    adapter: &wgpu::Adapter,
    init: &GpuInit,
) -> Result<(wgpu::Device, wgpu::Queue)> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("tessel device"),
            required_features: init.features,
            required_limits: init.limits.clone(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create wgpu device/queue")
}

impl<'w> Gpu<'w> {
    /// Creates a GPU context bound to a window.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(size.width > 0 && size.height > 0, "window has zero size");

        let instance = create_instance();

        let surface = instance
            .create_surface(window)
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = request_device(&adapter, &init).await?;

        let caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&caps, &init.surface_formats)
            .context("the surface offers no 8-bit color format")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: surface::choose_present_mode(&caps, init.vsync),
            alpha_mode: surface::choose_alpha_mode(&caps, init.alpha_mode),
            view_formats: surface::raw_view_formats(format),
            desired_maximum_frame_latency: init.frame_latency,
        };

        surface.configure(&device, &config);
        log::info!(
            "surface configured: {}x{} {:?} {:?} ({})",
            config.width,
            config.height,
            config.format,
            config.present_mode,
            adapter.get_info().name
        );

        Ok(Self {
            instance,
            surface: Some(SurfaceState { surface, config }),
            adapter,
            device,
            queue,
            size,
        })
    }

    /// Returns the active surface format, if there is a surface.
    pub fn surface_format(&self) -> Option<wgpu::TextureFormat> {
        self.surface.as_ref().map(|s| s.config.format)
    }

    /// Returns the drawable size (physical pixels).
    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Acquires the next surface texture. `Ok(None)` when headless.
    pub fn acquire(&self) -> std::result::Result<Option<SurfaceFrame>, SurfaceError> {
        let Some(state) = &self.surface else {
            return Ok(None);
        };
        let surface_texture = state.surface.get_current_texture()?;
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let raw_view = surface_texture.texture.create_view(&wgpu::TextureViewDescriptor {
            format: Some(state.config.format.remove_srgb_suffix()),
            ..Default::default()
        });

        Ok(Some(SurfaceFrame {
            surface_texture,
            view,
            raw_view,
        }))
    }

    /// Converts a `SurfaceError` into a higher-level action.
    pub fn handle_surface_error(&mut self, err: SurfaceError) -> SurfaceErrorAction {
        match &self.surface {
            Some(state) => surface::recover(&state.surface, &self.device, &state.config, err),
            None => SurfaceErrorAction::Fatal,
        }
    }
}

impl Gpu<'static> {
    /// Creates a device without a surface, for offscreen rendering.
    pub async fn new_headless(init: GpuInit) -> Result<Self> {
        let instance = create_instance();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = request_device(&adapter, &init).await?;
        log::info!("headless device on {}", adapter.get_info().name);

        Ok(Self {
            instance,
            surface: None,
            adapter,
            device,
            queue,
            size: PhysicalSize::new(0, 0),
        })
    }
}
