use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Pixel format of an [`Image`](super::ImageDesc).
///
/// Names follow the WebGPU spelling (`"rgba8unorm"`, `"depth24plus"`, ...).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ImageFormat {
    R8Unorm,
    Rg8Unorm,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgba16Float,
    Rgba32Float,
    R32Float,
    Depth24Plus,
    Depth24PlusStencil8,
    Depth32Float,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 12] = [
        ImageFormat::R8Unorm,
        ImageFormat::Rg8Unorm,
        ImageFormat::Rgba8Unorm,
        ImageFormat::Rgba8UnormSrgb,
        ImageFormat::Bgra8Unorm,
        ImageFormat::Bgra8UnormSrgb,
        ImageFormat::Rgba16Float,
        ImageFormat::Rgba32Float,
        ImageFormat::R32Float,
        ImageFormat::Depth24Plus,
        ImageFormat::Depth24PlusStencil8,
        ImageFormat::Depth32Float,
    ];

    /// Size of one pixel as seen by `write`/`read`.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            ImageFormat::R8Unorm => 1,
            ImageFormat::Rg8Unorm => 2,
            ImageFormat::Rgba8Unorm
            | ImageFormat::Rgba8UnormSrgb
            | ImageFormat::Bgra8Unorm
            | ImageFormat::Bgra8UnormSrgb => 4,
            ImageFormat::Rgba16Float => 8,
            ImageFormat::Rgba32Float => 16,
            ImageFormat::R32Float => 4,
            ImageFormat::Depth24Plus
            | ImageFormat::Depth24PlusStencil8
            | ImageFormat::Depth32Float => 4,
        }
    }

    pub fn is_depth(self) -> bool {
        matches!(
            self,
            ImageFormat::Depth24Plus | ImageFormat::Depth24PlusStencil8 | ImageFormat::Depth32Float
        )
    }

    pub fn is_color(self) -> bool {
        !self.is_depth()
    }

    pub fn has_stencil(self) -> bool {
        self == ImageFormat::Depth24PlusStencil8
    }

    /// Whether a sampler may use linear filtering on this format.
    pub fn is_filterable(self) -> bool {
        !matches!(self, ImageFormat::Rgba32Float | ImageFormat::R32Float) && !self.is_depth()
    }

    /// True for the four-channel 8-bit formats (RGBA or BGRA order, linear or sRGB).
    pub fn is_rgba8_family(self) -> bool {
        matches!(
            self,
            ImageFormat::Rgba8Unorm
                | ImageFormat::Rgba8UnormSrgb
                | ImageFormat::Bgra8Unorm
                | ImageFormat::Bgra8UnormSrgb
        )
    }

    pub fn is_bgra(self) -> bool {
        matches!(self, ImageFormat::Bgra8Unorm | ImageFormat::Bgra8UnormSrgb)
    }

    /// Whether pixel data can be blitted from `self` into `dst`.
    pub fn blit_compatible(self, dst: ImageFormat) -> bool {
        self == dst || (self.is_rgba8_family() && dst.is_rgba8_family())
    }

    pub fn name(self) -> &'static str {
        match self {
            ImageFormat::R8Unorm => "r8unorm",
            ImageFormat::Rg8Unorm => "rg8unorm",
            ImageFormat::Rgba8Unorm => "rgba8unorm",
            ImageFormat::Rgba8UnormSrgb => "rgba8unorm-srgb",
            ImageFormat::Bgra8Unorm => "bgra8unorm",
            ImageFormat::Bgra8UnormSrgb => "bgra8unorm-srgb",
            ImageFormat::Rgba16Float => "rgba16float",
            ImageFormat::Rgba32Float => "rgba32float",
            ImageFormat::R32Float => "r32float",
            ImageFormat::Depth24Plus => "depth24plus",
            ImageFormat::Depth24PlusStencil8 => "depth24plus-stencil8",
            ImageFormat::Depth32Float => "depth32float",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImageFormat::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| Error::InvalidFormat(format!("unknown image format {s:?}")))
    }
}
