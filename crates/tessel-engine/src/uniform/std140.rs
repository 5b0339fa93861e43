//! std140 layout rules.
//!
//! | kind          | align | size |
//! |---------------|-------|------|
//! | f32, i32, u32 | 4     | 4    |
//! | vec2, ivec2   | 8     | 8    |
//! | vec3          | 16    | 12   |
//! | vec4, ivec4   | 16    | 16   |
//! | mat3          | 16    | 48 (3 columns of 16 bytes) |
//! | mat4          | 16    | 64   |
//!
//! A trailing member may pack into the tail of a `vec3` (offset 12 of its
//! 16-byte slot). Blocks are padded to a multiple of 16 bytes.

use glam::{IVec2, IVec4, Mat3, Mat4, Vec2, Vec3, Vec4};

pub const BLOCK_ALIGN: usize = 16;

/// Layout class of one uniform member.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformKind {
    F32,
    I32,
    U32,
    Vec2,
    Vec3,
    Vec4,
    IVec2,
    IVec4,
    Mat3,
    Mat4,
    /// Caller-packed bytes with an explicit alignment.
    Raw { size: usize, align: usize },
}

impl UniformKind {
    pub fn align(self) -> usize {
        match self {
            UniformKind::F32 | UniformKind::I32 | UniformKind::U32 => 4,
            UniformKind::Vec2 | UniformKind::IVec2 => 8,
            UniformKind::Vec3
            | UniformKind::Vec4
            | UniformKind::IVec4
            | UniformKind::Mat3
            | UniformKind::Mat4 => 16,
            UniformKind::Raw { align, .. } => align.max(1).next_power_of_two(),
        }
    }

    pub fn size(self) -> usize {
        match self {
            UniformKind::F32 | UniformKind::I32 | UniformKind::U32 => 4,
            UniformKind::Vec2 | UniformKind::IVec2 => 8,
            UniformKind::Vec3 => 12,
            UniformKind::Vec4 | UniformKind::IVec4 => 16,
            UniformKind::Mat3 => 48,
            UniformKind::Mat4 => 64,
            UniformKind::Raw { size, .. } => size,
        }
    }
}

/// One member of a uniform block.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    F32(f32),
    I32(i32),
    U32(u32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    IVec2(IVec2),
    IVec4(IVec4),
    Mat3(Mat3),
    Mat4(Mat4),
    Raw { bytes: Vec<u8>, align: usize },
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::F32(_) => UniformKind::F32,
            UniformValue::I32(_) => UniformKind::I32,
            UniformValue::U32(_) => UniformKind::U32,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::IVec2(_) => UniformKind::IVec2,
            UniformValue::IVec4(_) => UniformKind::IVec4,
            UniformValue::Mat3(_) => UniformKind::Mat3,
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Raw { bytes, align } => UniformKind::Raw {
                size: bytes.len(),
                align: *align,
            },
        }
    }

    fn write_to(&self, out: &mut [u8]) {
        match self {
            UniformValue::F32(v) => out.copy_from_slice(&v.to_ne_bytes()),
            UniformValue::I32(v) => out.copy_from_slice(&v.to_ne_bytes()),
            UniformValue::U32(v) => out.copy_from_slice(&v.to_ne_bytes()),
            UniformValue::Vec2(v) => out.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::Vec3(v) => out.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::Vec4(v) => out.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::IVec2(v) => out.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::IVec4(v) => out.copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            UniformValue::Mat3(m) => {
                for (i, col) in m.to_cols_array_2d().iter().enumerate() {
                    out[i * 16..i * 16 + 12].copy_from_slice(bytemuck::cast_slice(col));
                }
            }
            UniformValue::Mat4(m) => out.copy_from_slice(bytemuck::cast_slice(&m.to_cols_array())),
            UniformValue::Raw { bytes, .. } => out.copy_from_slice(bytes),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for UniformValue {
            fn from(v: $ty) -> Self {
                UniformValue::$variant(v)
            }
        })*
    };
}

impl_from!(
    f32 => F32,
    i32 => I32,
    u32 => U32,
    Vec2 => Vec2,
    Vec3 => Vec3,
    Vec4 => Vec4,
    IVec2 => IVec2,
    IVec4 => IVec4,
    Mat3 => Mat3,
    Mat4 => Mat4,
);

#[inline]
fn align_to(offset: usize, align: usize) -> usize {
    offset.div_ceil(align) * align
}

/// Member offsets of a block with the given member kinds, plus the padded block size.
pub fn std140_offsets(kinds: &[UniformKind]) -> (Vec<usize>, usize) {
    let mut offsets = Vec::with_capacity(kinds.len());
    let mut end = 0;
    for kind in kinds {
        let offset = align_to(end, kind.align());
        offsets.push(offset);
        end = offset + kind.size();
    }
    (offsets, align_to(end, BLOCK_ALIGN))
}

/// Incremental std140 packer.
///
/// The writer keeps its allocation between frames; call [`reset`](Self::reset)
/// before packing the next block.
#[derive(Debug, Default, Clone)]
pub struct UniformWriter {
    bytes: Vec<u8>,
    offsets: Vec<usize>,
}

impl UniformWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.bytes.clear();
        self.offsets.clear();
    }

    /// Appends `value` at its aligned offset and returns that offset.
    pub fn push(&mut self, value: impl Into<UniformValue>) -> usize {
        let value = value.into();
        let kind = value.kind();
        let offset = align_to(self.bytes.len(), kind.align());
        self.bytes.resize(offset + kind.size(), 0);
        value.write_to(&mut self.bytes[offset..]);
        self.offsets.push(offset);
        offset
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Pads to the block alignment and returns the packed bytes.
    pub fn finish(&mut self) -> &[u8] {
        let len = align_to(self.bytes.len(), BLOCK_ALIGN);
        self.bytes.resize(len, 0);
        &self.bytes
    }
}

/// Packs `values` in order into a std140 block.
pub fn pack(values: &[UniformValue]) -> Vec<u8> {
    let mut writer = UniformWriter::new();
    for value in values {
        writer.push(value.clone());
    }
    writer.finish().to_vec()
}
