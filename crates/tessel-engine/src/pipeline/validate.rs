use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};
use crate::resource::{BufferId, BufferUsage, ImageFormat, ImageId, Region, ResourcePool};

use super::desc::{BoundResource, IndexBinding, PipelineDesc, SamplerDesc};
use super::stage::StageRef;
use super::topology::{BlendMode, CullFace, Topology};
use super::vertex::{StepMode, VertexBinding};

/// A sampled image as the backend receives it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SampledBinding {
    pub slot: u32,
    pub image: ImageId,
    pub format: ImageFormat,
    pub sampler: SamplerDesc,
}

/// A pipeline description after validation.
///
/// Include directives are expanded, defaults are filled in and image formats
/// are attached, so a backend can build its native pipeline from this alone.
#[derive(Debug, Clone)]
pub struct ResolvedPipeline {
    pub label: String,
    pub vertex_source: String,
    pub vertex_entry: String,
    pub fragment_source: String,
    pub fragment_entry: String,
    /// `(slot, buffer)`, sorted by slot.
    pub uniforms: Vec<(u32, BufferId)>,
    /// Sorted by slot.
    pub sampled: Vec<SampledBinding>,
    pub vertex_buffers: Vec<VertexBinding>,
    pub index_buffer: Option<IndexBinding>,
    pub color: ImageId,
    pub color_format: ImageFormat,
    pub depth: Option<(ImageId, ImageFormat)>,
    pub samples: u32,
    pub topology: Topology,
    pub cull_face: Option<CullFace>,
    pub blend: Option<BlendMode>,
    pub viewport: Region,
    pub count: u32,
    pub instance_count: u32,
}

impl ResolvedPipeline {
    pub fn is_indexed(&self) -> bool {
        self.index_buffer.is_some()
    }

    pub fn framebuffer(&self) -> impl Iterator<Item = ImageId> + '_ {
        std::iter::once(self.color).chain(self.depth.map(|(id, _)| id))
    }
}

fn binding_error(msg: impl Into<String>) -> Error {
    Error::BindingError(msg.into())
}

/// Validates `desc` against the resources registered in `pool`.
pub fn resolve(pool: &ResourcePool, desc: &PipelineDesc) -> Result<ResolvedPipeline> {
    let label = &desc.label;

    // Framebuffer: one color image, optionally one depth image.
    let (color, depth) = match desc.framebuffer.as_slice() {
        [color] => (*color, None),
        [color, depth] => (*color, Some(*depth)),
        other => {
            return Err(binding_error(format!(
                "pipeline {label:?}: framebuffer needs 1 or 2 images, got {}",
                other.len()
            )));
        }
    };

    let color_desc = pool.image(color)?.desc;
    if !color_desc.format.is_color() {
        return Err(binding_error(format!(
            "pipeline {label:?}: first framebuffer image must be a color image, got {}",
            color_desc.format
        )));
    }

    let depth = match depth {
        None => None,
        Some(id) => {
            let d = pool.image(id)?.desc;
            if !d.format.is_depth() {
                return Err(binding_error(format!(
                    "pipeline {label:?}: second framebuffer image must be a depth image, got {}",
                    d.format
                )));
            }
            if (d.width, d.height) != (color_desc.width, color_desc.height)
                || d.samples != color_desc.samples
            {
                return Err(binding_error(format!(
                    "pipeline {label:?}: color and depth attachments differ in size or sample count"
                )));
            }
            Some((id, d.format))
        }
    };

    // Stage interface: each name once, consistent across stages.
    let mut referenced: BTreeMap<&str, &StageRef> = BTreeMap::new();
    for r in desc.vertex.refs.iter().chain(desc.fragment.refs.iter()) {
        match referenced.get(r.name.as_str()) {
            Some(prev) if prev.kind != r.kind || prev.slot != r.slot => {
                return Err(binding_error(format!(
                    "pipeline {label:?}: stages address {:?} inconsistently",
                    r.name
                )));
            }
            Some(_) => {}
            None => {
                referenced.insert(r.name.as_str(), r);
            }
        }
    }

    // Binding list: unique names, unique (kind, slot).
    let mut names = HashSet::new();
    let mut slots = HashSet::new();
    for b in &desc.bindings {
        if !names.insert(b.name.as_str()) {
            return Err(binding_error(format!(
                "pipeline {label:?}: {:?} appears more than once in the bindings",
                b.name
            )));
        }
        if !slots.insert((b.kind(), b.slot)) {
            return Err(binding_error(format!(
                "pipeline {label:?}: slot {} is bound twice for {:?}",
                b.slot,
                b.kind()
            )));
        }
    }

    for (name, r) in &referenced {
        let Some(b) = desc.bindings.iter().find(|b| b.name == *name) else {
            return Err(binding_error(format!(
                "pipeline {label:?}: stage references {name:?} which is not in the bindings"
            )));
        };
        if b.kind() != r.kind {
            return Err(binding_error(format!(
                "pipeline {label:?}: {name:?} is bound as {:?} but the stage reads it as {:?}",
                b.kind(),
                r.kind
            )));
        }
        if b.slot != r.slot {
            return Err(binding_error(format!(
                "pipeline {label:?}: {name:?} is bound at slot {} but the stage addresses slot {}",
                b.slot, r.slot
            )));
        }
    }

    let mut uniforms = Vec::new();
    let mut sampled = Vec::new();
    for b in &desc.bindings {
        if !referenced.contains_key(b.name.as_str()) {
            log::warn!("pipeline {label:?}: binding {:?} is not used by either stage", b.name);
        }
        match b.resource {
            BoundResource::UniformBuffer(buffer) => {
                let info = pool.buffer(buffer)?;
                if info.desc.usage != BufferUsage::Uniform || info.desc.capacity == 0 {
                    return Err(binding_error(format!(
                        "pipeline {label:?}: {:?} must be a non-empty uniform buffer",
                        b.name
                    )));
                }
                uniforms.push((b.slot, buffer));
            }
            BoundResource::SampledImage { image, sampler } => {
                let d = pool.image(image)?.desc;
                if !d.texture || d.is_multisampled() || d.presentable || d.format.is_depth() {
                    return Err(binding_error(format!(
                        "pipeline {label:?}: {:?} is not a texture-sampleable image",
                        b.name
                    )));
                }
                if desc.framebuffer.contains(&image) {
                    return Err(binding_error(format!(
                        "pipeline {label:?}: {:?} is both sampled and rendered to",
                        b.name
                    )));
                }
                sampled.push(SampledBinding {
                    slot: b.slot,
                    image,
                    format: d.format,
                    sampler,
                });
            }
        }
    }
    uniforms.sort_by_key(|(slot, _)| *slot);
    sampled.sort_by_key(|s| s.slot);

    // Vertex input.
    let mut locations = HashSet::new();
    for vb in &desc.vertex_buffers {
        let info = pool.buffer(vb.buffer)?;
        if info.desc.usage != BufferUsage::Vertex {
            return Err(binding_error(format!(
                "pipeline {label:?}: vertex buffer #{} was not created for vertex data",
                vb.buffer.index()
            )));
        }
        if vb.layout.stride == 0 {
            return Err(binding_error(format!(
                "pipeline {label:?}: vertex buffer #{} has a zero stride",
                vb.buffer.index()
            )));
        }
        for attr in &vb.layout.attributes {
            if !locations.insert(attr.location) {
                return Err(binding_error(format!(
                    "pipeline {label:?}: vertex location {} is used twice",
                    attr.location
                )));
            }
        }
    }
    if let Some(ib) = desc.index_buffer {
        if pool.buffer(ib.buffer)?.desc.usage != BufferUsage::Index {
            return Err(binding_error(format!(
                "pipeline {label:?}: index buffer #{} was not created for index data",
                ib.buffer.index()
            )));
        }
    }

    let count = match desc.vertex_count {
        Some(count) => count,
        None => derive_count(pool, desc)?,
    };

    let viewport = desc
        .viewport
        .unwrap_or(Region::full(color_desc.width, color_desc.height));
    if !viewport.fits_within(color_desc.width, color_desc.height) {
        return Err(Error::OutOfBounds {
            region: viewport,
            width: color_desc.width,
            height: color_desc.height,
        });
    }

    Ok(ResolvedPipeline {
        label: label.clone(),
        vertex_source: desc.vertex.resolve_source(&desc.includes)?,
        vertex_entry: desc.vertex.entry_point.clone(),
        fragment_source: desc.fragment.resolve_source(&desc.includes)?,
        fragment_entry: desc.fragment.entry_point.clone(),
        uniforms,
        sampled,
        vertex_buffers: desc.vertex_buffers.clone(),
        index_buffer: desc.index_buffer,
        color,
        color_format: color_desc.format,
        depth,
        samples: color_desc.samples,
        topology: desc.topology,
        cull_face: desc.cull_face,
        blend: desc.blend,
        viewport,
        count,
        instance_count: desc.instance_count,
    })
}

fn derive_count(pool: &ResourcePool, desc: &PipelineDesc) -> Result<u32> {
    let label = &desc.label;

    let (capacity, unit) = if let Some(ib) = desc.index_buffer {
        (pool.buffer(ib.buffer)?.desc.capacity, ib.format.size())
    } else {
        let Some(vb) = desc
            .vertex_buffers
            .iter()
            .find(|vb| vb.layout.step == StepMode::Vertex)
        else {
            return Err(binding_error(format!(
                "pipeline {label:?}: vertex_count is required without a per-vertex buffer"
            )));
        };
        (pool.buffer(vb.buffer)?.desc.capacity, vb.layout.stride)
    };

    if unit == 0 {
        return Err(binding_error(format!(
            "pipeline {label:?}: cannot derive a vertex count from a zero stride"
        )));
    }
    if capacity % unit != 0 {
        return Err(binding_error(format!(
            "pipeline {label:?}: buffer size {capacity} is not a multiple of the {unit} byte stride"
        )));
    }
    u32::try_from(capacity / unit).map_err(|_| {
        binding_error(format!("pipeline {label:?}: derived vertex count does not fit in u32"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Binding, ShaderStage, VertexLayout};
    use crate::resource::{BufferDesc, ImageDesc};

    struct Fixture {
        pool: ResourcePool,
        target: ImageId,
        texture: ImageId,
        ubo: BufferId,
    }

    fn fixture() -> Fixture {
        let mut pool = ResourcePool::default();
        let target = pool
            .insert_image(ImageDesc::new(64, 64, ImageFormat::Rgba8Unorm).texture(false))
            .unwrap();
        let texture = pool
            .insert_image(ImageDesc::new(16, 16, ImageFormat::Rgba8Unorm))
            .unwrap();
        let ubo = pool.insert_buffer(BufferDesc::uniform(80)).unwrap();
        Fixture {
            pool,
            target,
            texture,
            ubo,
        }
    }

    fn fullscreen(fragment: ShaderStage, framebuffer: Vec<ImageId>) -> PipelineDesc {
        PipelineDesc::new("test", ShaderStage::new("vs", "vs_main"), fragment, framebuffer)
            .vertex_count(3)
    }

    #[test]
    fn matching_bindings_resolve() {
        let f = fixture();
        let desc = fullscreen(
            ShaderStage::new("fs", "fs_main")
                .uniform_block("Common", 0)
                .sampled("Texture", 0),
            vec![f.target],
        )
        .binding(Binding::uniform_buffer("Common", 0, f.ubo))
        .binding(Binding::sampled_image("Texture", 0, f.texture));

        let resolved = resolve(&f.pool, &desc).unwrap();
        assert_eq!(resolved.uniforms, vec![(0, f.ubo)]);
        assert_eq!(resolved.sampled[0].image, f.texture);
        assert_eq!(resolved.viewport, Region::full(64, 64));
        assert_eq!(resolved.count, 3);
    }

    #[test]
    fn missing_sampled_name_is_a_binding_error() {
        let f = fixture();
        let desc = fullscreen(
            ShaderStage::new("fs", "fs_main").sampled("Texture", 0),
            vec![f.target],
        );
        assert!(matches!(resolve(&f.pool, &desc), Err(Error::BindingError(_))));
    }

    #[test]
    fn slot_mismatch_is_a_binding_error() {
        let f = fixture();
        let desc = fullscreen(
            ShaderStage::new("fs", "fs_main").sampled("Texture", 1),
            vec![f.target],
        )
        .binding(Binding::sampled_image("Texture", 0, f.texture));
        assert!(matches!(resolve(&f.pool, &desc), Err(Error::BindingError(_))));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let f = fixture();
        let desc = fullscreen(
            ShaderStage::new("fs", "fs_main").sampled("Texture", 0),
            vec![f.target],
        )
        .binding(Binding::sampled_image("Texture", 0, f.texture))
        .binding(Binding::sampled_image("Texture", 1, f.texture));
        assert!(matches!(resolve(&f.pool, &desc), Err(Error::BindingError(_))));
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let f = fixture();
        let desc = fullscreen(
            ShaderStage::new("fs", "fs_main").uniform_block("Texture", 0),
            vec![f.target],
        )
        .binding(Binding::sampled_image("Texture", 0, f.texture));
        assert!(matches!(resolve(&f.pool, &desc), Err(Error::BindingError(_))));
    }

    #[test]
    fn sampling_the_render_target_is_rejected() {
        let mut f = fixture();
        let both = f
            .pool
            .insert_image(ImageDesc::new(64, 64, ImageFormat::Rgba8Unorm))
            .unwrap();
        let desc = fullscreen(ShaderStage::new("fs", "fs_main").sampled("Texture", 0), vec![both])
            .binding(Binding::sampled_image("Texture", 0, both));
        assert!(matches!(resolve(&f.pool, &desc), Err(Error::BindingError(_))));
    }

    #[test]
    fn framebuffer_shape_is_checked() {
        let mut f = fixture();
        let depth_small = f
            .pool
            .insert_image(ImageDesc::new(32, 32, ImageFormat::Depth24Plus).texture(false))
            .unwrap();
        let no_targets = fullscreen(ShaderStage::new("fs", "fs_main"), vec![]);
        assert!(resolve(&f.pool, &no_targets).is_err());

        let mismatched = fullscreen(ShaderStage::new("fs", "fs_main"), vec![f.target, depth_small]);
        assert!(matches!(resolve(&f.pool, &mismatched), Err(Error::BindingError(_))));

        let swapped = fullscreen(ShaderStage::new("fs", "fs_main"), vec![depth_small]);
        assert!(matches!(resolve(&f.pool, &swapped), Err(Error::BindingError(_))));
    }

    #[test]
    fn vertex_count_is_derived_from_the_vertex_buffer() {
        let mut f = fixture();
        let vbo = f
            .pool
            .insert_buffer(BufferDesc::vertex(32 * 30))
            .unwrap();
        let mut desc = PipelineDesc::new(
            "model",
            ShaderStage::new("vs", "vs_main"),
            ShaderStage::new("fs", "fs_main"),
            vec![f.target],
        )
        .vertex_buffer(VertexBinding::new(vbo, "3f 3f 2f", &[0, 1, 2]).unwrap());
        assert_eq!(resolve(&f.pool, &desc).unwrap().count, 30);

        let odd = f.pool.insert_buffer(BufferDesc::vertex(33)).unwrap();
        desc.vertex_buffers = vec![VertexBinding::new(odd, "3f 3f 2f", &[0, 1, 2]).unwrap()];
        assert!(matches!(resolve(&f.pool, &desc), Err(Error::BindingError(_))));
    }

    #[test]
    fn zero_stride_layout_is_a_binding_error() {
        let mut f = fixture();
        let vbo = f.pool.insert_buffer(BufferDesc::vertex(64)).unwrap();
        let layout = VertexLayout {
            stride: 0,
            attributes: Vec::new(),
            step: StepMode::Vertex,
        };
        let desc = PipelineDesc::new(
            "zero stride",
            ShaderStage::new("vs", "vs_main"),
            ShaderStage::new("fs", "fs_main"),
            vec![f.target],
        )
        .vertex_buffer(VertexBinding { buffer: vbo, layout });

        assert!(matches!(resolve(&f.pool, &desc), Err(Error::BindingError(_))));
        assert!(matches!(
            resolve(&f.pool, &desc.clone().vertex_count(3)),
            Err(Error::BindingError(_))
        ));
    }

    #[test]
    fn uniform_binding_needs_a_uniform_buffer() {
        let mut f = fixture();
        let vbo = f.pool.insert_buffer(BufferDesc::vertex(64)).unwrap();
        let desc = fullscreen(
            ShaderStage::new("fs", "fs_main").uniform_block("Common", 0),
            vec![f.target],
        )
        .binding(Binding::uniform_buffer("Common", 0, vbo));
        assert!(matches!(resolve(&f.pool, &desc), Err(Error::BindingError(_))));
    }
}
