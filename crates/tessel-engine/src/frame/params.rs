use glam::Vec2;

/// Per-frame inputs handed to the caller's frame callback.
///
/// Everything a frame derives its uniforms from arrives here explicitly.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameParams {
    /// Seconds since the loop started.
    pub time: f32,
    /// Seconds since the previous frame.
    pub dt: f32,
    pub frame_index: u64,
    /// Pointer position in physical pixels, origin top-left.
    pub mouse: Vec2,
    /// Primary button held.
    pub mouse_down: bool,
    /// Window (or offscreen target) size in physical pixels.
    pub size: (u32, u32),
}

impl FrameParams {
    pub fn new(size: (u32, u32)) -> Self {
        Self {
            time: 0.0,
            dt: 0.0,
            frame_index: 0,
            mouse: Vec2::ZERO,
            mouse_down: false,
            size,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.size.0 as f32 / self.size.1.max(1) as f32
    }
}
