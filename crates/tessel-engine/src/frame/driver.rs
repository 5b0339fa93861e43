use anyhow::{bail, Result};
use glam::Vec2;

use crate::backend::Backend;
use crate::context::Context;

use super::FrameParams;

/// Result of polling the windowing collaborator.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Poll {
    Continue,
    Quit,
}

/// The event and timing side of the loop.
pub trait FrameSource {
    /// Drains pending events. Called at the top of every iteration.
    fn poll(&mut self) -> Poll;

    /// Parameters for the frame about to run.
    fn params(&mut self) -> FrameParams;

    /// Called after present; the only suspension point of the loop.
    fn yield_now(&mut self) {}
}

/// Cooperative single-threaded frame loop.
///
/// One iteration: poll -> params -> frame callback -> present -> yield. A quit
/// is only observed at the top of an iteration, so a frame that has started
/// always reaches present.
pub struct FrameLoop;

impl FrameLoop {
    /// Runs until `source` reports [`Poll::Quit`] and returns the frame count.
    ///
    /// The callback is expected to open and close exactly one frame.
    pub fn run<B, S, F>(ctx: &mut Context<B>, source: &mut S, mut frame: F) -> Result<u64>
    where
        B: Backend,
        S: FrameSource,
        F: FnMut(&mut Context<B>, &FrameParams) -> Result<()>,
    {
        let mut frames = 0;
        while source.poll() == Poll::Continue {
            let params = source.params();
            frame(ctx, &params)?;
            if ctx.frame_open() {
                bail!("frame {} was left open by the frame callback", params.frame_index);
            }
            ctx.present()?;
            frames += 1;
            source.yield_now();
        }
        log::debug!("frame loop finished after {frames} frames");
        Ok(frames)
    }
}

/// Fixed-timestep source that quits after a set number of frames.
///
/// Drives offscreen rendering and tests without a window.
#[derive(Debug, Clone)]
pub struct HeadlessSource {
    size: (u32, u32),
    dt: f32,
    frames: u64,
    index: u64,
    mouse: Vec2,
    mouse_down: bool,
}

impl HeadlessSource {
    pub fn new(size: (u32, u32), frames: u64) -> Self {
        Self {
            size,
            dt: 1.0 / 60.0,
            frames,
            index: 0,
            mouse: Vec2::ZERO,
            mouse_down: false,
        }
    }

    pub fn with_dt(mut self, dt: f32) -> Self {
        self.dt = dt;
        self
    }

    /// Holds the pointer at `pos` for the whole run.
    pub fn with_pointer(mut self, pos: Vec2, down: bool) -> Self {
        self.mouse = pos;
        self.mouse_down = down;
        self
    }
}

impl FrameSource for HeadlessSource {
    fn poll(&mut self) -> Poll {
        if self.index >= self.frames {
            Poll::Quit
        } else {
            Poll::Continue
        }
    }

    fn params(&mut self) -> FrameParams {
        let index = self.index;
        self.index += 1;
        FrameParams {
            time: index as f32 * self.dt,
            dt: self.dt,
            frame_index: index,
            mouse: self.mouse,
            mouse_down: self.mouse_down,
            size: self.size,
        }
    }
}
