//! Window + runtime loop.
//!
//! Owns the `winit` event loop and the single fixed-size window, and wires
//! them to a wgpu-backed [`Context`](crate::Context).

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
