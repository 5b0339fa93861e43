use std::collections::BTreeMap;

use crate::resource::{BufferId, ImageId, Region};

use super::stage::{ResourceKind, ShaderStage};
use super::topology::{BlendMode, CullFace, Topology};
use super::vertex::VertexBinding;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Filter {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Wrap {
    #[default]
    Repeat,
    ClampToEdge,
    MirrorRepeat,
}

/// Sampler state attached to a sampled-image binding.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct SamplerDesc {
    pub filter: Filter,
    pub wrap: Wrap,
}

impl SamplerDesc {
    pub fn nearest() -> Self {
        Self {
            filter: Filter::Nearest,
            ..Self::default()
        }
    }

    pub fn wrap(mut self, wrap: Wrap) -> Self {
        self.wrap = wrap;
        self
    }
}

/// The resource behind a binding.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BoundResource {
    UniformBuffer(BufferId),
    SampledImage { image: ImageId, sampler: SamplerDesc },
}

impl BoundResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            BoundResource::UniformBuffer(_) => ResourceKind::UniformBuffer,
            BoundResource::SampledImage { .. } => ResourceKind::SampledImage,
        }
    }
}

/// One entry of a pipeline's binding list: a named resource at a slot.
///
/// Uniform buffers and sampled images use separate slot namespaces.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Binding {
    pub name: String,
    pub slot: u32,
    pub resource: BoundResource,
}

impl Binding {
    pub fn uniform_buffer(name: impl Into<String>, slot: u32, buffer: BufferId) -> Self {
        Self {
            name: name.into(),
            slot,
            resource: BoundResource::UniformBuffer(buffer),
        }
    }

    pub fn sampled_image(name: impl Into<String>, slot: u32, image: ImageId) -> Self {
        Self {
            name: name.into(),
            slot,
            resource: BoundResource::SampledImage {
                image,
                sampler: SamplerDesc::default(),
            },
        }
    }

    /// Replaces the sampler of a sampled-image binding. No effect on uniform buffers.
    pub fn with_sampler(mut self, desc: SamplerDesc) -> Self {
        if let BoundResource::SampledImage { sampler, .. } = &mut self.resource {
            *sampler = desc;
        }
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.resource.kind()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    pub fn size(self) -> u64 {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct IndexBinding {
    pub buffer: BufferId,
    pub format: IndexFormat,
}

/// Everything needed to build a [`Pipeline`](super::Pipeline).
#[derive(Debug, Clone)]
pub struct PipelineDesc {
    pub label: String,
    pub vertex: ShaderStage,
    pub fragment: ShaderStage,
    /// Text substituted for `#include "name"` lines in both stages.
    pub includes: BTreeMap<String, String>,
    pub bindings: Vec<Binding>,
    pub vertex_buffers: Vec<VertexBinding>,
    pub index_buffer: Option<IndexBinding>,
    /// One color image, optionally followed by one depth image.
    pub framebuffer: Vec<ImageId>,
    pub topology: Topology,
    pub cull_face: Option<CullFace>,
    pub blend: Option<BlendMode>,
    /// Defaults to the whole framebuffer.
    pub viewport: Option<Region>,
    /// Vertices per draw, or indices when an index buffer is bound.
    /// Derived from the bound buffers when `None`.
    pub vertex_count: Option<u32>,
    pub instance_count: u32,
}

impl PipelineDesc {
    pub fn new(
        label: impl Into<String>,
        vertex: ShaderStage,
        fragment: ShaderStage,
        framebuffer: impl Into<Vec<ImageId>>,
    ) -> Self {
        Self {
            label: label.into(),
            vertex,
            fragment,
            includes: BTreeMap::new(),
            bindings: Vec::new(),
            vertex_buffers: Vec::new(),
            index_buffer: None,
            framebuffer: framebuffer.into(),
            topology: Topology::Triangles,
            cull_face: None,
            blend: None,
            viewport: None,
            vertex_count: None,
            instance_count: 1,
        }
    }

    pub fn include(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.includes.insert(name.into(), text.into());
        self
    }

    pub fn binding(mut self, binding: Binding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn vertex_buffer(mut self, binding: VertexBinding) -> Self {
        self.vertex_buffers.push(binding);
        self
    }

    pub fn index_buffer(mut self, buffer: BufferId, format: IndexFormat) -> Self {
        self.index_buffer = Some(IndexBinding { buffer, format });
        self
    }

    pub fn topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn cull_face(mut self, cull: CullFace) -> Self {
        self.cull_face = Some(cull);
        self
    }

    pub fn blend(mut self, blend: BlendMode) -> Self {
        self.blend = Some(blend);
        self
    }

    pub fn viewport(mut self, viewport: Region) -> Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn vertex_count(mut self, count: u32) -> Self {
        self.vertex_count = Some(count);
        self
    }

    pub fn instance_count(mut self, count: u32) -> Self {
        self.instance_count = count;
        self
    }
}
