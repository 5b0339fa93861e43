//! Resource pool.
//!
//! Images and buffers are referenced by plain handles ([`ImageId`], [`BufferId`]).
//! The pool keeps their metadata and validates every request; device memory is
//! owned by the active backend.

mod buffer;
mod format;
mod image;
mod pool;
mod region;

pub use buffer::{BufferDesc, BufferId, BufferInfo, BufferUsage};
pub use format::ImageFormat;
pub use image::{ContentState, ImageDesc, ImageId, ImageInfo};
pub use pool::{BlitPlan, PoolLimits, ResourcePool};
pub use region::Region;
