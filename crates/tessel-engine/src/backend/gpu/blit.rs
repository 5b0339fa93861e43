use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::pipeline::Filter;
use crate::resource::Region;

/// Source side of a shader blit.
pub(crate) struct BlitSource<'a> {
    pub view: &'a wgpu::TextureView,
    pub size: (u32, u32),
    pub region: Region,
    pub filterable: bool,
}

/// Destination side of a shader blit.
pub(crate) struct BlitTarget<'a> {
    pub view: &'a wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub region: Region,
}

/// Resampling blits through a fullscreen-triangle pipeline.
///
/// One render pipeline per (destination format, filterable source) pair, built
/// on first use.
pub(crate) struct Blitter {
    shader: wgpu::ShaderModule,
    layouts: [wgpu::BindGroupLayout; 2],
    pipeline_layouts: [wgpu::PipelineLayout; 2],
    pipelines: HashMap<(wgpu::TextureFormat, bool), wgpu::RenderPipeline>,
    nearest: wgpu::Sampler,
    linear: wgpu::Sampler,
}

fn bind_group_layout(device: &wgpu::Device, filterable: bool) -> wgpu::BindGroupLayout {
    let sampler_ty = if filterable {
        wgpu::SamplerBindingType::Filtering
    } else {
        wgpu::SamplerBindingType::NonFiltering
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("tessel blit bind group layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(sampler_ty),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    })
}

fn sampler(device: &wgpu::Device, filter: wgpu::FilterMode) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("tessel blit sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}

impl Blitter {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tessel blit shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("blit.wgsl").into()),
        });
        let layouts = [bind_group_layout(device, false), bind_group_layout(device, true)];
        let pipeline_layouts = [0usize, 1].map(|i| {
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("tessel blit pipeline layout"),
                bind_group_layouts: &[&layouts[i]],
                immediate_size: 0,
            })
        });

        Self {
            shader,
            layouts,
            pipeline_layouts,
            pipelines: HashMap::new(),
            nearest: sampler(device, wgpu::FilterMode::Nearest),
            linear: sampler(device, wgpu::FilterMode::Linear),
        }
    }

    fn pipeline(
        &mut self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        filterable: bool,
    ) -> &wgpu::RenderPipeline {
        let layout = &self.pipeline_layouts[filterable as usize];
        let shader = &self.shader;
        self.pipelines.entry((format, filterable)).or_insert_with(|| {
            log::debug!("building blit pipeline for {format:?} (filterable={filterable})");
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("tessel blit pipeline"),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[],
                },
                fragment: Some(wgpu::FragmentState {
                    module: shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        })
    }

    /// Records a resampling copy of `src.region` into `dst.region`.
    pub fn blit(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        src: BlitSource<'_>,
        dst: BlitTarget<'_>,
        filter: Filter,
    ) {
        let (w, h) = (src.size.0 as f32, src.size.1 as f32);
        let r = src.region;
        let rect = [
            r.x as f32 / w,
            r.y as f32 / h,
            r.width as f32 / w,
            r.height as f32 / h,
        ];
        let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tessel blit params"),
            contents: bytemuck::cast_slice(&rect),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let sampler = if filter == Filter::Linear && src.filterable {
            &self.linear
        } else {
            &self.nearest
        };
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessel blit bind group"),
            layout: &self.layouts[src.filterable as usize],
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(src.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params.as_entire_binding(),
                },
            ],
        });

        let pipeline = self.pipeline(device, dst.format, src.filterable);

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tessel blit"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: dst.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        let d = dst.region;
        pass.set_viewport(d.x as f32, d.y as f32, d.width as f32, d.height as f32, 0.0, 1.0);
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
