//! Uniform stream: std140 packing of per-frame parameters.
//!
//! Member order and padding are the caller's contract with the shader; the
//! packer only applies the alignment rules.

mod camera;
mod std140;
mod stream;

pub use camera::Camera;
pub use std140::{pack, std140_offsets, UniformKind, UniformValue, UniformWriter, BLOCK_ALIGN};
pub use stream::UniformStream;
