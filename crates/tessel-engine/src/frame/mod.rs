//! Frame scheduling.
//!
//! The scheduler enforces the `Idle -> Open -> Idle` protocol; the loop types
//! drive it once per display refresh.

mod driver;
mod params;
mod scheduler;

pub use driver::{FrameLoop, FrameSource, HeadlessSource, Poll};
pub use params::FrameParams;
pub use scheduler::{FrameScheduler, FrameState, FrameStats};
