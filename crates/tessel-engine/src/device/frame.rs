/// The acquired surface texture for one frame.
///
/// Holding it prevents acquisition of the next one; it is presented and dropped
/// after the frame's commands are submitted.
pub struct SurfaceFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    /// View in the configured surface format.
    pub view: wgpu::TextureView,
    /// View without sRGB encoding, used for byte-exact blits.
    pub raw_view: wgpu::TextureView,
}

impl SurfaceFrame {
    pub fn present(self) {
        drop(self.view);
        drop(self.raw_view);
        self.surface_texture.present();
    }
}
