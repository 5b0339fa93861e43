use super::ImageFormat;

/// Handle to an image owned by a [`Context`](crate::Context).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ImageId(pub(crate) u32);

impl ImageId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Creation parameters for an image.
///
/// Format and sample count are fixed for the lifetime of the image.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// 1 for single-sampled images, >1 for multisampled render targets.
    pub samples: u32,
    /// Whether pipelines may bind the image as a sampled texture.
    pub texture: bool,
    /// Backed by the display surface rather than offscreen memory.
    pub presentable: bool,
}

impl ImageDesc {
    /// Single-sampled, texture-sampleable offscreen image.
    pub fn new(width: u32, height: u32, format: ImageFormat) -> Self {
        Self {
            width,
            height,
            format,
            samples: 1,
            texture: true,
            presentable: false,
        }
    }

    /// The display surface image. Not sampleable.
    pub fn presentable(width: u32, height: u32, format: ImageFormat) -> Self {
        Self {
            texture: false,
            presentable: true,
            ..Self::new(width, height, format)
        }
    }

    pub fn samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    pub fn texture(mut self, texture: bool) -> Self {
        self.texture = texture;
        self
    }

    /// Bytes of one full-image `write`.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// Device memory footprint used for capacity accounting.
    pub fn footprint(&self) -> u64 {
        self.byte_len() as u64 * self.samples.max(1) as u64
    }

    pub fn is_multisampled(&self) -> bool {
        self.samples > 1
    }
}

/// What an image currently holds.
///
/// Clearing is opt-in, so an image that is never cleared keeps whatever the
/// previous frame left in it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ContentState {
    /// Never cleared or written.
    Undefined,
    /// Reset by `clear`, nothing drawn since.
    Cleared,
    /// Holds data from a write, render or blit.
    Written,
}

/// Pool bookkeeping for one image.
#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub desc: ImageDesc,
    pub content: ContentState,
}
