use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::pipeline::{Filter, ResolvedPipeline, SamplerDesc};
use crate::resource::{BufferId, ImageId, Region};

use super::convert;
use super::GpuImage;

/// Samplers shared between pipelines.
#[derive(Default)]
pub(crate) struct SamplerCache {
    samplers: HashMap<(SamplerDesc, bool), wgpu::Sampler>,
}

impl SamplerCache {
    /// Non-filterable formats always get a nearest sampler.
    pub fn get(&mut self, device: &wgpu::Device, desc: SamplerDesc, filterable: bool) -> wgpu::Sampler {
        let filter = if filterable { desc.filter } else { Filter::Nearest };
        self.samplers
            .entry((desc, filterable))
            .or_insert_with(|| {
                let address = convert::address_mode(desc.wrap);
                let mode = convert::filter_mode(filter);
                device.create_sampler(&wgpu::SamplerDescriptor {
                    label: Some("tessel sampler"),
                    address_mode_u: address,
                    address_mode_v: address,
                    address_mode_w: address,
                    mag_filter: mode,
                    min_filter: mode,
                    mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                    ..Default::default()
                })
            })
            .clone()
    }
}

/// GPU objects and fixed draw state of one pipeline.
pub(crate) struct GpuPipeline {
    pub pipeline: wgpu::RenderPipeline,
    /// Group 0. Present whenever `sampled` is.
    pub uniforms: Option<wgpu::BindGroup>,
    /// Group 1.
    pub sampled: Option<wgpu::BindGroup>,
    pub vertex_buffers: Vec<BufferId>,
    pub index: Option<(BufferId, wgpu::IndexFormat)>,
    pub color: ImageId,
    pub depth: Option<ImageId>,
    pub viewport: Region,
}

const STAGES: wgpu::ShaderStages = wgpu::ShaderStages::VERTEX_FRAGMENT;

fn shader_module(device: &wgpu::Device, label: &str, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

fn missing(what: &str) -> Error {
    Error::Backend(format!("wgpu backend has no {what}"))
}

pub(crate) fn build(
    device: &wgpu::Device,
    resolved: &ResolvedPipeline,
    images: &HashMap<ImageId, GpuImage>,
    buffers: &HashMap<BufferId, wgpu::Buffer>,
    samplers: &mut SamplerCache,
) -> Result<GpuPipeline> {
    let label = resolved.label.as_str();

    // Group 0: uniform buffers at their slot.
    let uniform_layout_entries: Vec<_> = resolved
        .uniforms
        .iter()
        .map(|(slot, _)| wgpu::BindGroupLayoutEntry {
            binding: *slot,
            visibility: STAGES,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        })
        .collect();
    let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("tessel uniform bind group layout"),
        entries: &uniform_layout_entries,
    });

    // Group 1: texture at 2n, sampler at 2n + 1.
    let mut sampled_layout_entries = Vec::new();
    for s in &resolved.sampled {
        let filterable = s.format.is_filterable();
        sampled_layout_entries.push(wgpu::BindGroupLayoutEntry {
            binding: 2 * s.slot,
            visibility: STAGES,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        sampled_layout_entries.push(wgpu::BindGroupLayoutEntry {
            binding: 2 * s.slot + 1,
            visibility: STAGES,
            ty: wgpu::BindingType::Sampler(if filterable {
                wgpu::SamplerBindingType::Filtering
            } else {
                wgpu::SamplerBindingType::NonFiltering
            }),
            count: None,
        });
    }
    let sampled_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("tessel sampled bind group layout"),
        entries: &sampled_layout_entries,
    });

    // Group 0 is bound (possibly empty) whenever group 1 is used.
    let uniforms = if resolved.uniforms.is_empty() && resolved.sampled.is_empty() {
        None
    } else {
        let mut entries = Vec::with_capacity(resolved.uniforms.len());
        for (slot, id) in &resolved.uniforms {
            let buffer = buffers.get(id).ok_or_else(|| missing("uniform buffer"))?;
            entries.push(wgpu::BindGroupEntry {
                binding: *slot,
                resource: buffer.as_entire_binding(),
            });
        }
        Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessel uniform bind group"),
            layout: &uniform_layout,
            entries: &entries,
        }))
    };

    let sampled = if resolved.sampled.is_empty() {
        None
    } else {
        let mut views = Vec::with_capacity(resolved.sampled.len());
        for s in &resolved.sampled {
            let view = images
                .get(&s.image)
                .and_then(GpuImage::view)
                .ok_or_else(|| missing("sampled image"))?;
            let sampler = samplers.get(device, s.sampler, s.format.is_filterable());
            views.push((s.slot, view, sampler));
        }
        let mut entries = Vec::with_capacity(views.len() * 2);
        for (slot, view, sampler) in &views {
            entries.push(wgpu::BindGroupEntry {
                binding: 2 * slot,
                resource: wgpu::BindingResource::TextureView(view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: 2 * slot + 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }
        Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessel sampled bind group"),
            layout: &sampled_layout,
            entries: &entries,
        }))
    };

    let layouts: Vec<&wgpu::BindGroupLayout> = if sampled.is_some() {
        vec![&uniform_layout, &sampled_layout]
    } else if uniforms.is_some() {
        vec![&uniform_layout]
    } else {
        vec![]
    };
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("tessel pipeline layout"),
        bind_group_layouts: &layouts,
        immediate_size: 0,
    });

    let vertex_attributes: Vec<Vec<wgpu::VertexAttribute>> = resolved
        .vertex_buffers
        .iter()
        .map(|vb| vb.layout.attributes.iter().map(convert::vertex_attribute).collect())
        .collect();
    let vertex_layouts: Vec<wgpu::VertexBufferLayout<'_>> = resolved
        .vertex_buffers
        .iter()
        .zip(&vertex_attributes)
        .map(|(vb, attributes)| wgpu::VertexBufferLayout {
            array_stride: vb.layout.stride,
            step_mode: convert::step_mode(vb.layout.step),
            attributes,
        })
        .collect();

    let vs = shader_module(device, label, &resolved.vertex_source);
    let fs = shader_module(device, label, &resolved.fragment_source);

    let strip_index_format = match (resolved.topology.is_strip(), resolved.index_buffer) {
        (true, Some(ib)) => Some(convert::index_format(ib.format)),
        _ => None,
    };

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &vs,
            entry_point: Some(resolved.vertex_entry.as_str()),
            compilation_options: Default::default(),
            buffers: &vertex_layouts,
        },
        fragment: Some(wgpu::FragmentState {
            module: &fs,
            entry_point: Some(resolved.fragment_entry.as_str()),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: convert::texture_format(resolved.color_format),
                blend: convert::blend_state(resolved.blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: convert::topology(resolved.topology),
            strip_index_format,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: convert::cull_mode(resolved.cull_face),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: resolved.depth.map(|(_, format)| wgpu::DepthStencilState {
            format: convert::texture_format(format),
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: resolved.samples,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
        cache: None,
    });

    Ok(GpuPipeline {
        pipeline,
        uniforms,
        sampled,
        vertex_buffers: resolved.vertex_buffers.iter().map(|vb| vb.buffer).collect(),
        index: resolved
            .index_buffer
            .map(|ib| (ib.buffer, convert::index_format(ib.format))),
        color: resolved.color,
        depth: resolved.depth.map(|(id, _)| id),
        viewport: resolved.viewport,
    })
}
