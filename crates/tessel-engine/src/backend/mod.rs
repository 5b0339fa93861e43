//! GPU backend abstraction.
//!
//! [`Context`](crate::Context) validates every request against the resource
//! pool and frame state before it reaches a backend, so implementations can
//! assume in-bounds regions, matching lengths and legal frame ordering.

mod capture;
pub(crate) mod gpu;

pub use capture::{CaptureBackend, Command};
pub use gpu::WgpuBackend;

use crate::error::Result;
use crate::pipeline::{Filter, PipelineId, ResolvedPipeline, Topology};
use crate::resource::{
    BlitPlan, BufferDesc, BufferId, ImageDesc, ImageFormat, ImageId, PoolLimits, Region,
};

/// One `render()` call as the backend sees it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DrawCall {
    pub pipeline: PipelineId,
    pub topology: Topology,
    /// Vertices, or indices for indexed draws.
    pub count: u32,
    pub instances: u32,
    pub indexed: bool,
}

/// Device-side operations behind the frame orchestrator.
pub trait Backend {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Limits the resource pool enforces.
    fn limits(&self) -> PoolLimits;

    /// Format and size a presentable image must use, if there is a display surface.
    fn surface_format(&self) -> Option<ImageFormat>;
    fn surface_size(&self) -> Option<(u32, u32)>;

    /// Whether images of `format` with `samples` samples can be created.
    fn supports(&self, format: ImageFormat, samples: u32) -> bool;

    fn create_image(&mut self, id: ImageId, desc: &ImageDesc, data: Option<&[u8]>) -> Result<()>;
    fn create_buffer(&mut self, id: BufferId, desc: &BufferDesc, data: Option<&[u8]>)
        -> Result<()>;
    fn create_pipeline(&mut self, id: PipelineId, pipeline: &ResolvedPipeline) -> Result<()>;

    /// Starts recording a frame's commands.
    fn begin_frame(&mut self) -> Result<()>;
    /// Submits the commands recorded since `begin_frame`.
    fn end_frame(&mut self) -> Result<()>;
    /// Shows the presentable image. Called outside frames.
    fn present(&mut self) -> Result<()>;

    /// Color to zero, depth to 1.0.
    fn clear_image(&mut self, id: ImageId) -> Result<()>;
    fn write_image(&mut self, id: ImageId, region: Region, bytes: &[u8]) -> Result<()>;
    /// Reads back pixels. Only called while no frame is open.
    fn read_image(&mut self, id: ImageId, region: Region) -> Result<Vec<u8>>;
    fn write_buffer(&mut self, id: BufferId, offset: u64, bytes: &[u8]) -> Result<()>;
    fn blit(&mut self, plan: &BlitPlan, filter: Filter) -> Result<()>;
    fn draw(&mut self, call: &DrawCall) -> Result<()>;
}
