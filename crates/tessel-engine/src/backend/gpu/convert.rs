//! Engine enums to wgpu enums.

use crate::pipeline::{
    BlendMode, CullFace, Filter, IndexFormat, ScalarKind, StepMode, Topology, VertexAttribute,
    Wrap,
};
use crate::resource::ImageFormat;

pub(crate) fn texture_format(format: ImageFormat) -> wgpu::TextureFormat {
    use wgpu::TextureFormat as T;
    match format {
        ImageFormat::R8Unorm => T::R8Unorm,
        ImageFormat::Rg8Unorm => T::Rg8Unorm,
        ImageFormat::Rgba8Unorm => T::Rgba8Unorm,
        ImageFormat::Rgba8UnormSrgb => T::Rgba8UnormSrgb,
        ImageFormat::Bgra8Unorm => T::Bgra8Unorm,
        ImageFormat::Bgra8UnormSrgb => T::Bgra8UnormSrgb,
        ImageFormat::Rgba16Float => T::Rgba16Float,
        ImageFormat::Rgba32Float => T::Rgba32Float,
        ImageFormat::R32Float => T::R32Float,
        ImageFormat::Depth24Plus => T::Depth24Plus,
        ImageFormat::Depth24PlusStencil8 => T::Depth24PlusStencil8,
        ImageFormat::Depth32Float => T::Depth32Float,
    }
}

pub(crate) fn image_format(format: wgpu::TextureFormat) -> Option<ImageFormat> {
    ImageFormat::ALL
        .into_iter()
        .find(|f| texture_format(*f) == format)
}

pub(crate) fn topology(t: Topology) -> wgpu::PrimitiveTopology {
    match t {
        Topology::Points => wgpu::PrimitiveTopology::PointList,
        Topology::Lines => wgpu::PrimitiveTopology::LineList,
        Topology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
        Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

pub(crate) fn cull_mode(cull: Option<CullFace>) -> Option<wgpu::Face> {
    cull.map(|c| match c {
        CullFace::Front => wgpu::Face::Front,
        CullFace::Back => wgpu::Face::Back,
    })
}

pub(crate) fn blend_state(blend: Option<BlendMode>) -> Option<wgpu::BlendState> {
    use wgpu::{BlendComponent, BlendFactor, BlendOperation};
    blend.map(|b| match b {
        BlendMode::Alpha => wgpu::BlendState::ALPHA_BLENDING,
        BlendMode::Premultiplied => wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
        BlendMode::Additive => {
            let add = BlendComponent {
                src_factor: BlendFactor::One,
                dst_factor: BlendFactor::One,
                operation: BlendOperation::Add,
            };
            wgpu::BlendState {
                color: add,
                alpha: add,
            }
        }
    })
}

pub(crate) fn index_format(f: IndexFormat) -> wgpu::IndexFormat {
    match f {
        IndexFormat::U16 => wgpu::IndexFormat::Uint16,
        IndexFormat::U32 => wgpu::IndexFormat::Uint32,
    }
}

pub(crate) fn step_mode(step: StepMode) -> wgpu::VertexStepMode {
    match step {
        StepMode::Vertex => wgpu::VertexStepMode::Vertex,
        StepMode::Instance => wgpu::VertexStepMode::Instance,
    }
}

pub(crate) fn vertex_attribute(attr: &VertexAttribute) -> wgpu::VertexAttribute {
    use wgpu::VertexFormat as V;
    let format = match (attr.kind, attr.components) {
        (ScalarKind::F32, 1) => V::Float32,
        (ScalarKind::F32, 2) => V::Float32x2,
        (ScalarKind::F32, 3) => V::Float32x3,
        (ScalarKind::F32, _) => V::Float32x4,
        (ScalarKind::I32, 1) => V::Sint32,
        (ScalarKind::I32, 2) => V::Sint32x2,
        (ScalarKind::I32, 3) => V::Sint32x3,
        (ScalarKind::I32, _) => V::Sint32x4,
        (ScalarKind::U32, 1) => V::Uint32,
        (ScalarKind::U32, 2) => V::Uint32x2,
        (ScalarKind::U32, 3) => V::Uint32x3,
        (ScalarKind::U32, _) => V::Uint32x4,
        (ScalarKind::Unorm8, 2) => V::Unorm8x2,
        (ScalarKind::Unorm8, _) => V::Unorm8x4,
    };
    wgpu::VertexAttribute {
        format,
        offset: attr.offset,
        shader_location: attr.location,
    }
}

pub(crate) fn filter_mode(f: Filter) -> wgpu::FilterMode {
    match f {
        Filter::Nearest => wgpu::FilterMode::Nearest,
        Filter::Linear => wgpu::FilterMode::Linear,
    }
}

pub(crate) fn address_mode(w: Wrap) -> wgpu::AddressMode {
    match w {
        Wrap::Repeat => wgpu::AddressMode::Repeat,
        Wrap::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        Wrap::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_format_maps_back() {
        for f in ImageFormat::ALL {
            assert_eq!(image_format(texture_format(f)), Some(f));
        }
        assert_eq!(image_format(wgpu::TextureFormat::Rgba16Uint), None);
    }

    #[test]
    fn byte_sizes_agree_with_wgpu() {
        for f in ImageFormat::ALL.into_iter().filter(|f| f.is_color()) {
            assert_eq!(
                texture_format(f).block_copy_size(None),
                Some(f.bytes_per_pixel() as u32),
                "{f}"
            );
        }
    }
}
