//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue, windowed or headless
//! - creating & configuring the Surface (swapchain) when there is a window
//! - acquiring surface frames and mapping surface errors to actions

mod context;
mod error;
mod frame;
mod init;
mod surface;

pub use context::Gpu;
pub use error::SurfaceErrorAction;
pub use frame::SurfaceFrame;
pub use init::GpuInit;
