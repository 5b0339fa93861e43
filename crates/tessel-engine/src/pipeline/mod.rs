//! Pipelines.
//!
//! A pipeline is built once from a [`PipelineDesc`] and never mutated: changing a
//! binding means building a new pipeline. All binding checks happen in
//! [`Context::create_pipeline`](crate::Context::create_pipeline), so
//! [`Context::render`](crate::Context::render) cannot fail on layout.
//!
//! Slot convention for WGSL shaders on the wgpu backend:
//! - uniform block at slot `n`: `@group(0) @binding(n)`
//! - sampled image at slot `n`: texture at `@group(1) @binding(2n)`, its sampler
//!   at `@group(1) @binding(2n + 1)`

mod desc;
mod stage;
mod topology;
mod validate;
mod vertex;

pub use desc::{
    Binding, BoundResource, Filter, IndexBinding, IndexFormat, PipelineDesc, SamplerDesc, Wrap,
};
pub use stage::{ResourceKind, ShaderStage, StageRef};
pub use topology::{BlendMode, CullFace, Topology};
pub use validate::{resolve, ResolvedPipeline, SampledBinding};
pub use vertex::{
    format_size, ScalarKind, StepMode, VertexAttribute, VertexBinding, VertexLayout,
};

use crate::resource::ImageId;

/// Handle to a pipeline owned by a [`Context`](crate::Context).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PipelineId(pub(crate) u32);

impl PipelineId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A constructed pipeline.
///
/// Holds the fixed draw parameters; the GPU objects live in the backend.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub(crate) id: PipelineId,
    pub(crate) label: String,
    pub(crate) topology: Topology,
    pub(crate) count: u32,
    pub(crate) instance_count: u32,
    pub(crate) indexed: bool,
    pub(crate) framebuffer: Vec<ImageId>,
}

impl Pipeline {
    pub(crate) fn from_resolved(id: PipelineId, resolved: &ResolvedPipeline) -> Self {
        Self {
            id,
            label: resolved.label.clone(),
            topology: resolved.topology,
            count: resolved.count,
            instance_count: resolved.instance_count,
            indexed: resolved.is_indexed(),
            framebuffer: resolved.framebuffer().collect(),
        }
    }

    pub fn id(&self) -> PipelineId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Vertices (or indices, when indexed) per instance.
    pub fn vertex_count(&self) -> u32 {
        self.count
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn framebuffer(&self) -> &[ImageId] {
        &self.framebuffer
    }

    /// Primitives assembled by one `render()` call.
    pub fn primitives_per_draw(&self) -> u64 {
        self.topology.primitive_count(self.count) as u64 * self.instance_count as u64
    }

    /// Issues this pipeline's draw on `ctx`. Same as `ctx.render(self)`.
    pub fn render<B: crate::backend::Backend>(
        &self,
        ctx: &mut crate::Context<B>,
    ) -> crate::Result<()> {
        ctx.render(self)
    }
}
