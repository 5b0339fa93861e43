//! wgpu implementation of [`Backend`].
//!
//! Commands issued inside a frame are recorded into one command encoder and
//! submitted at `end_frame`, so their GPU order matches issue order. Uploads
//! inside a frame go through staging buffers for the same reason; outside a
//! frame they use the queue directly. The presentable image is the window
//! surface, acquired on first use in a frame and presented by `present`.

mod blit;
pub(crate) mod convert;
mod pipeline;

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::device::{Gpu, SurfaceErrorAction, SurfaceFrame};
use crate::error::{Error, Result};
use crate::pipeline::{Filter, PipelineId, ResolvedPipeline};
use crate::resource::{
    BlitPlan, BufferDesc, BufferId, BufferUsage, ImageDesc, ImageFormat, ImageId, PoolLimits,
    Region,
};

use self::blit::{BlitSource, BlitTarget, Blitter};
use self::pipeline::{GpuPipeline, SamplerCache};
use super::{Backend, DrawCall};

enum Storage {
    /// Backed by the window surface of the current frame.
    Surface,
    Texture {
        texture: wgpu::Texture,
        view: wgpu::TextureView,
        /// Same texture viewed without sRGB encoding.
        raw_view: wgpu::TextureView,
    },
}

pub(crate) struct GpuImage {
    desc: ImageDesc,
    storage: Storage,
}

impl GpuImage {
    pub(crate) fn view(&self) -> Option<&wgpu::TextureView> {
        match &self.storage {
            Storage::Texture { view, .. } => Some(view),
            Storage::Surface => None,
        }
    }

    fn texture(&self) -> Option<&wgpu::Texture> {
        match &self.storage {
            Storage::Texture { texture, .. } => Some(texture),
            Storage::Surface => None,
        }
    }
}

enum SurfaceSlot {
    Idle,
    Acquired(SurfaceFrame),
    /// Acquisition failed transiently; surface commands are dropped this frame.
    Skipped,
}

/// Views of an attachment: encoded and raw.
type Views = (wgpu::TextureView, wgpu::TextureView);

/// Rendering backend over a wgpu device, with or without a window surface.
pub struct WgpuBackend<'w> {
    gpu: Gpu<'w>,
    images: HashMap<ImageId, GpuImage>,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    pipelines: HashMap<PipelineId, GpuPipeline>,
    samplers: SamplerCache,
    blitter: Blitter,
    encoder: Option<wgpu::CommandEncoder>,
    surface: SurfaceSlot,
}

fn unknown_image(id: ImageId) -> Error {
    Error::UnknownResource(format!("wgpu image #{}", id.index()))
}

fn unknown_buffer(id: BufferId) -> Error {
    Error::UnknownResource(format!("wgpu buffer #{}", id.index()))
}

fn extent(region: Region) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: region.width,
        height: region.height,
        depth_or_array_layers: 1,
    }
}

fn copy_info(texture: &wgpu::Texture, region: Region) -> wgpu::TexelCopyTextureInfo<'_> {
    wgpu::TexelCopyTextureInfo {
        texture,
        mip_level: 0,
        origin: wgpu::Origin3d {
            x: region.x,
            y: region.y,
            z: 0,
        },
        aspect: wgpu::TextureAspect::All,
    }
}

/// Row pitch rounded up for buffer-texture copies.
fn padded_row(row: u32) -> u32 {
    row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT
}

fn check_buffer_alignment(offset: u64, len: usize) -> Result<()> {
    let align = wgpu::COPY_BUFFER_ALIGNMENT;
    if offset % align != 0 || len as u64 % align != 0 {
        return Err(Error::Backend(format!(
            "buffer writes must be {align}-byte aligned (offset {offset}, {len} bytes)"
        )));
    }
    Ok(())
}

impl<'w> WgpuBackend<'w> {
    pub fn new(gpu: Gpu<'w>) -> Self {
        let blitter = Blitter::new(gpu.device());
        Self {
            gpu,
            images: HashMap::new(),
            buffers: HashMap::new(),
            pipelines: HashMap::new(),
            samplers: SamplerCache::default(),
            blitter,
            encoder: None,
            surface: SurfaceSlot::Idle,
        }
    }

    pub fn gpu(&self) -> &Gpu<'w> {
        &self.gpu
    }

    fn image(&self, id: ImageId) -> Result<&GpuImage> {
        self.images.get(&id).ok_or_else(|| unknown_image(id))
    }

    fn acquire_surface(&mut self) -> Result<SurfaceSlot> {
        for _ in 0..2 {
            let err = match self.gpu.acquire() {
                Ok(Some(frame)) => return Ok(SurfaceSlot::Acquired(frame)),
                Ok(None) => return Err(Error::Backend("no surface to render to".into())),
                Err(err) => err,
            };
            let msg = err.to_string();
            match self.gpu.handle_surface_error(err) {
                SurfaceErrorAction::Reconfigured => {
                    log::warn!("surface reconfigured after {msg}; retrying");
                }
                SurfaceErrorAction::SkipFrame => {
                    log::warn!("surface unavailable ({msg}); skipping surface commands");
                    return Ok(SurfaceSlot::Skipped);
                }
                SurfaceErrorAction::Fatal => {
                    return Err(Error::Backend(format!("surface acquisition failed: {msg}")));
                }
            }
        }
        log::warn!("surface still unavailable after reconfiguring; skipping surface commands");
        Ok(SurfaceSlot::Skipped)
    }

    /// Views of `id`, acquiring the surface if needed. `None` when the surface was skipped.
    fn attachment(&mut self, id: ImageId) -> Result<Option<Views>> {
        if let Storage::Texture { view, raw_view, .. } = &self.image(id)?.storage {
            return Ok(Some((view.clone(), raw_view.clone())));
        }
        if matches!(self.surface, SurfaceSlot::Idle) {
            self.surface = self.acquire_surface()?;
        }
        Ok(match &self.surface {
            SurfaceSlot::Acquired(f) => Some((f.view.clone(), f.raw_view.clone())),
            _ => None,
        })
    }

    fn encoder(&mut self) -> Result<&mut wgpu::CommandEncoder> {
        self.encoder.as_mut().ok_or(Error::NoFrameOpen)
    }

    fn staging(&self, label: &str, contents: &[u8]) -> wgpu::Buffer {
        self.gpu
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::COPY_SRC,
            })
    }

    fn texture_usages(desc: &ImageDesc) -> wgpu::TextureUsages {
        use wgpu::TextureUsages as U;
        if desc.format.is_depth() || desc.is_multisampled() {
            U::RENDER_ATTACHMENT
        } else {
            U::RENDER_ATTACHMENT | U::TEXTURE_BINDING | U::COPY_SRC | U::COPY_DST
        }
    }
}

impl Backend for WgpuBackend<'_> {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn limits(&self) -> PoolLimits {
        let limits = self.gpu.device().limits();
        PoolLimits {
            max_image_dimension: limits.max_texture_dimension_2d,
            max_buffer_size: limits.max_buffer_size,
            memory_budget: None,
        }
    }

    fn surface_format(&self) -> Option<ImageFormat> {
        self.gpu.surface_format().and_then(convert::image_format)
    }

    fn surface_size(&self) -> Option<(u32, u32)> {
        let size = self.gpu.size();
        self.gpu.surface_format().map(|_| (size.width, size.height))
    }

    fn supports(&self, format: ImageFormat, samples: u32) -> bool {
        let device = self.gpu.device();
        let texture_format = convert::texture_format(format);
        let features = if device
            .features()
            .contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES)
        {
            self.gpu.adapter().get_texture_format_features(texture_format)
        } else {
            texture_format.guaranteed_format_features(device.features())
        };
        let desc = ImageDesc::new(1, 1, format).samples(samples);
        features.allowed_usages.contains(Self::texture_usages(&desc))
            && features.flags.sample_count_supported(samples)
    }

    fn create_image(&mut self, id: ImageId, desc: &ImageDesc, data: Option<&[u8]>) -> Result<()> {
        let storage = if desc.presentable {
            Storage::Surface
        } else {
            let format = convert::texture_format(desc.format);
            let raw = format.remove_srgb_suffix();
            let view_formats: &[wgpu::TextureFormat] = if raw == format { &[] } else { &[raw] };
            let texture = self.gpu.device().create_texture(&wgpu::TextureDescriptor {
                label: Some("tessel image"),
                size: extent(Region::full(desc.width, desc.height)),
                mip_level_count: 1,
                sample_count: desc.samples,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: Self::texture_usages(desc),
                view_formats,
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let raw_view = texture.create_view(&wgpu::TextureViewDescriptor {
                format: Some(raw),
                ..Default::default()
            });
            if let Some(bytes) = data {
                let bpp = desc.format.bytes_per_pixel() as u32;
                self.gpu.queue().write_texture(
                    copy_info(&texture, Region::full(desc.width, desc.height)),
                    bytes,
                    wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(desc.width * bpp),
                        rows_per_image: Some(desc.height),
                    },
                    extent(Region::full(desc.width, desc.height)),
                );
            }
            Storage::Texture {
                texture,
                view,
                raw_view,
            }
        };
        self.images.insert(id, GpuImage { desc: *desc, storage });
        Ok(())
    }

    fn create_buffer(&mut self, id: BufferId, desc: &BufferDesc, data: Option<&[u8]>) -> Result<()> {
        let usage = wgpu::BufferUsages::COPY_DST
            | match desc.usage {
                BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
                BufferUsage::Index => wgpu::BufferUsages::INDEX,
                BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM,
            };
        let device = self.gpu.device();
        let buffer = match data {
            Some(contents) => device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("tessel buffer"),
                contents,
                usage,
            }),
            None => device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("tessel buffer"),
                size: desc.capacity.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT),
                usage,
                mapped_at_creation: false,
            }),
        };
        self.buffers.insert(id, buffer);
        Ok(())
    }

    fn create_pipeline(&mut self, id: PipelineId, resolved: &ResolvedPipeline) -> Result<()> {
        // Shader compilation and layout errors are reported through the scope
        // instead of the uncaptured-error handler.
        let scope = self
            .gpu
            .device()
            .push_error_scope(wgpu::ErrorFilter::Validation);
        let built = pipeline::build(
            self.gpu.device(),
            resolved,
            &self.images,
            &self.buffers,
            &mut self.samplers,
        );
        if let Some(err) = pollster::block_on(scope.pop()) {
            return Err(Error::Backend(format!(
                "pipeline {:?}: {err}",
                resolved.label
            )));
        }
        self.pipelines.insert(id, built?);
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<()> {
        if matches!(self.surface, SurfaceSlot::Skipped) {
            self.surface = SurfaceSlot::Idle;
        }
        let encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tessel frame encoder"),
            });
        self.encoder = Some(encoder);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        let encoder = self.encoder.take().ok_or(Error::NoFrameOpen)?;
        self.gpu.queue().submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        if let SurfaceSlot::Acquired(frame) = std::mem::replace(&mut self.surface, SurfaceSlot::Idle) {
            frame.present();
        }
        Ok(())
    }

    fn clear_image(&mut self, id: ImageId) -> Result<()> {
        let format = self.image(id)?.desc.format;
        let Some((view, _)) = self.attachment(id)? else {
            return Ok(());
        };
        let encoder = self.encoder()?;

        if format.is_depth() {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tessel clear depth"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: format.has_stencil().then_some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        } else {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tessel clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        Ok(())
    }

    fn write_image(&mut self, id: ImageId, region: Region, bytes: &[u8]) -> Result<()> {
        let img = self.image(id)?;
        let texture = img.texture().ok_or_else(|| unknown_image(id))?;
        let row = region.width * img.desc.format.bytes_per_pixel() as u32;

        if self.encoder.is_none() {
            self.gpu.queue().write_texture(
                copy_info(texture, region),
                bytes,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(row),
                    rows_per_image: Some(region.height),
                },
                extent(region),
            );
            return Ok(());
        }

        // In-frame: stage with padded rows so the copy is ordered with the rest of the frame.
        let pitch = padded_row(row);
        let mut staged = vec![0u8; pitch as usize * region.height as usize];
        for (dst, src) in staged
            .chunks_exact_mut(pitch as usize)
            .zip(bytes.chunks_exact(row as usize))
        {
            dst[..row as usize].copy_from_slice(src);
        }
        let staging = self.staging("tessel image upload", &staged);
        let texture = texture.clone();
        self.encoder()?.copy_buffer_to_texture(
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(pitch),
                    rows_per_image: Some(region.height),
                },
            },
            copy_info(&texture, region),
            extent(region),
        );
        Ok(())
    }

    fn read_image(&mut self, id: ImageId, region: Region) -> Result<Vec<u8>> {
        let img = self.image(id)?;
        let texture = img.texture().ok_or_else(|| unknown_image(id))?;
        let row = region.width * img.desc.format.bytes_per_pixel() as u32;
        let pitch = padded_row(row);

        let device = self.gpu.device();
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tessel readback"),
            size: pitch as u64 * region.height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("tessel readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            copy_info(texture, region),
            wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(pitch),
                    rows_per_image: Some(region.height),
                },
            },
            extent(region),
        );
        self.gpu.queue().submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            sender.send(result).ok();
        });
        device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map_err(|e| Error::Backend(format!("device poll failed: {e}")))?;

        match receiver.recv() {
            Ok(Ok(())) => {
                let data = slice.get_mapped_range();
                let mut out = Vec::with_capacity(row as usize * region.height as usize);
                for line in data.chunks_exact(pitch as usize) {
                    out.extend_from_slice(&line[..row as usize]);
                }
                drop(data);
                readback.unmap();
                Ok(out)
            }
            Ok(Err(e)) => Err(Error::Backend(format!("readback mapping failed: {e}"))),
            Err(_) => Err(Error::Backend("readback callback was dropped".into())),
        }
    }

    fn write_buffer(&mut self, id: BufferId, offset: u64, bytes: &[u8]) -> Result<()> {
        check_buffer_alignment(offset, bytes.len())?;
        let buffer = self.buffers.get(&id).ok_or_else(|| unknown_buffer(id))?;

        if self.encoder.is_none() {
            self.gpu.queue().write_buffer(buffer, offset, bytes);
            return Ok(());
        }

        let buffer = buffer.clone();
        let staging = self.staging("tessel buffer upload", bytes);
        self.encoder()?
            .copy_buffer_to_buffer(&staging, 0, &buffer, offset, bytes.len() as u64);
        Ok(())
    }

    fn blit(&mut self, plan: &BlitPlan, filter: Filter) -> Result<()> {
        let src_desc = self.image(plan.src)?.desc;
        let dst_desc = self.image(plan.dst)?.desc;
        let Some((src_view, src_raw)) = self.attachment(plan.src)? else {
            return Ok(());
        };
        let Some((dst_view, dst_raw)) = self.attachment(plan.dst)? else {
            return Ok(());
        };

        if plan.resolve {
            let _pass = self.encoder()?.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tessel resolve"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &src_view,
                    resolve_target: Some(&dst_view),
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
            return Ok(());
        }

        let src_texture = self.image(plan.src)?.texture().cloned();
        let dst_texture = self.image(plan.dst)?.texture().cloned();
        if let (Some(src), Some(dst), true) = (
            &src_texture,
            &dst_texture,
            plan.is_copy() && src_desc.format == dst_desc.format,
        ) {
            self.encoder()?.copy_texture_to_texture(
                copy_info(src, plan.src_region),
                copy_info(dst, plan.dst_region),
                extent(plan.src_region),
            );
            return Ok(());
        }

        let encoder = self.encoder.as_mut().ok_or(Error::NoFrameOpen)?;
        self.blitter.blit(
            self.gpu.device(),
            encoder,
            BlitSource {
                view: &src_raw,
                size: (src_desc.width, src_desc.height),
                region: plan.src_region,
                filterable: src_desc.format.is_filterable(),
            },
            BlitTarget {
                view: &dst_raw,
                format: convert::texture_format(dst_desc.format).remove_srgb_suffix(),
                region: plan.dst_region,
            },
            filter,
        );
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall) -> Result<()> {
        let (color, depth) = {
            let p = self
                .pipelines
                .get(&call.pipeline)
                .ok_or_else(|| Error::UnknownResource(format!("wgpu pipeline #{}", call.pipeline.index())))?;
            (p.color, p.depth)
        };
        let Some((color_view, _)) = self.attachment(color)? else {
            return Ok(());
        };
        let depth_view = match depth {
            Some(id) => self.attachment(id)?.map(|(view, _)| view),
            None => None,
        };
        let depth_format = match depth {
            Some(id) => Some(self.image(id)?.desc.format),
            None => None,
        };

        let p = self
            .pipelines
            .get(&call.pipeline)
            .ok_or_else(|| Error::UnknownResource(format!("wgpu pipeline #{}", call.pipeline.index())))?;
        let encoder = self.encoder.as_mut().ok_or(Error::NoFrameOpen)?;

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("tessel draw"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: depth_view.as_ref().map(|view| {
                wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: depth_format
                        .filter(|f| f.has_stencil())
                        .map(|_| wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        }),
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        let v = p.viewport;
        pass.set_viewport(v.x as f32, v.y as f32, v.width as f32, v.height as f32, 0.0, 1.0);
        pass.set_pipeline(&p.pipeline);
        if let Some(group) = &p.uniforms {
            pass.set_bind_group(0, group, &[]);
        }
        if let Some(group) = &p.sampled {
            pass.set_bind_group(1, group, &[]);
        }
        for (slot, id) in p.vertex_buffers.iter().enumerate() {
            let buffer = self.buffers.get(id).ok_or_else(|| unknown_buffer(*id))?;
            pass.set_vertex_buffer(slot as u32, buffer.slice(..));
        }
        match p.index {
            Some((id, format)) => {
                let buffer = self.buffers.get(&id).ok_or_else(|| unknown_buffer(id))?;
                pass.set_index_buffer(buffer.slice(..), format);
                pass.draw_indexed(0..call.count, 0, 0..call.instances);
            }
            None => pass.draw(0..call.count, 0..call.instances),
        }
        Ok(())
    }
}
