use thiserror::Error;

use crate::resource::Region;

/// Errors produced by the resource pool, pipelines and the frame scheduler.
///
/// Construction-time variants (`InvalidFormat`, `BindingError`) indicate a static
/// configuration mistake. Per-frame variants indicate a caller logic bug. Neither
/// is retried anywhere in the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("region {region:?} is out of bounds for a {width}x{height} image")]
    OutOfBounds {
        region: Region,
        width: u32,
        height: u32,
    },

    #[error("binding error: {0}")]
    BindingError(String),

    #[error("a frame is already open")]
    FrameAlreadyOpen,

    #[error("no frame is open")]
    NoFrameOpen,

    #[error("unknown resource: {0}")]
    UnknownResource(String),

    #[error("invalid blit: {0}")]
    InvalidBlit(String),

    #[error("backend failure: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, Error>;
