use winit::window::Window;

use crate::backend::WgpuBackend;
use crate::context::Context;
use crate::frame::{FrameParams, FrameStats};
use crate::input::{InputFrame, InputState, MouseButton};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

/// Context handed to [`App::setup`](super::App::setup).
pub struct SetupCtx<'a, 'w> {
    pub window: &'a Window,
    pub ctx: &'a mut Context<WgpuBackend<'w>>,
}

impl SetupCtx<'_, '_> {
    /// Drawable size in physical pixels.
    pub fn size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }
}

/// Per-frame context passed to [`App::on_frame`](super::App::on_frame).
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window borrow carried by the wgpu backend
pub struct FrameCtx<'a, 'w> {
    pub window: &'a Window,
    pub ctx: &'a mut Context<WgpuBackend<'w>>,
    pub input: &'a InputState,
    pub input_frame: &'a InputFrame,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Parameters for this frame, built from the clock and the input state.
    pub fn params(&self) -> FrameParams {
        let size = self.window.inner_size();
        FrameParams {
            time: self.time.elapsed,
            dt: self.time.dt,
            frame_index: self.time.frame_index,
            mouse: self.input.pointer(),
            mouse_down: self.input.button_down(MouseButton::Left),
            size: (size.width, size.height),
        }
    }

    /// Opens a frame, runs `draw`, and closes the frame.
    ///
    /// An error from `draw` leaves the frame open, which the runtime treats as
    /// fatal.
    pub fn frame<F>(&mut self, draw: F) -> crate::Result<FrameStats>
    where
        F: FnOnce(&mut Context<WgpuBackend<'w>>) -> crate::Result<()>,
    {
        self.ctx.begin_frame()?;
        draw(&mut *self.ctx)?;
        self.ctx.end_frame()
    }
}
