use anyhow::Result;
use winit::event::WindowEvent;

use super::ctx::{FrameCtx, SetupCtx};

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by [`Runtime`](crate::window::Runtime).
pub trait App {
    /// Called once, after the window and the GPU context exist and before the
    /// first frame. Resources and pipelines are created here.
    fn setup(&mut self, ctx: &mut SetupCtx<'_, '_>) -> Result<()>;

    /// Called for every window event, before the input state is updated.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Called once per redraw. Must open and close exactly one frame; the
    /// runtime presents afterwards.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl>;
}
