//! Tessel engine crate.
//!
//! A frame orchestrator for real-time rendering: a resource pool of GPU images
//! and buffers, immutable pipelines validated at construction, std140 uniform
//! packing and a frame scheduler, all driven through a [`Context`] over a
//! [`Backend`](backend::Backend).
//!
//! The windowed runtime (`window`, `core`, `input`) sits on winit; the wgpu
//! backend lives in `backend` and `device`.

pub mod backend;
mod context;
pub mod core;
pub mod device;
mod error;
pub mod frame;
pub mod input;
pub mod logging;
pub mod pipeline;
pub mod resource;
pub mod time;
pub mod uniform;
pub mod window;

pub use context::Context;
pub use error::{Error, Result};
