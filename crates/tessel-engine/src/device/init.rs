use crate::resource::ImageFormat;

/// Device and surface options.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Surface formats to try, in order. When none is offered, the first 8-bit
    /// color format the surface reports is used.
    pub surface_formats: Vec<ImageFormat>,

    /// Wait for vertical blank at present.
    pub vsync: bool,

    /// Ignored when the surface does not offer it.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub power: wgpu::PowerPreference,
    pub features: wgpu::Features,
    pub limits: wgpu::Limits,

    /// Frames the presentation engine may queue. A hint only.
    pub frame_latency: u32,
}

impl GpuInit {
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn with_surface_formats(mut self, formats: &[ImageFormat]) -> Self {
        self.surface_formats = formats.to_vec();
        self
    }
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            surface_formats: vec![ImageFormat::Bgra8Unorm, ImageFormat::Rgba8Unorm],
            vsync: true,
            alpha_mode: None,
            power: wgpu::PowerPreference::HighPerformance,
            features: wgpu::Features::empty(),
            limits: wgpu::Limits::default(),
            frame_latency: 2,
        }
    }
}
