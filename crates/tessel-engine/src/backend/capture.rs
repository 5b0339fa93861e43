use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::pipeline::{Filter, PipelineId, ResolvedPipeline};
use crate::resource::{
    BlitPlan, BufferDesc, BufferId, ImageDesc, ImageFormat, ImageId, PoolLimits, Region,
};

use super::{Backend, DrawCall};

/// A command recorded by [`CaptureBackend`], in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateImage { id: ImageId, desc: ImageDesc },
    CreateBuffer { id: BufferId, desc: BufferDesc },
    CreatePipeline { id: PipelineId, label: String },
    BeginFrame,
    Clear(ImageId),
    WriteImage { id: ImageId, region: Region },
    WriteBuffer { id: BufferId, offset: u64, len: usize },
    Blit { plan: BlitPlan, filter: Filter },
    Draw { call: DrawCall, primitives: u64 },
    EndFrame,
    Present,
}

struct ShadowImage {
    desc: ImageDesc,
    /// One sample per pixel; multisampled images keep their resolved value.
    pixels: Vec<u8>,
}

/// CPU backend that records commands and keeps shadow copies of resource contents.
///
/// Clears, writes and blits are applied to the shadow pixels, so tests can check
/// content as well as ordering. Draws are recorded but not rasterized. Linear
/// blit filtering interpolates 8-bit channels; other formats fall back to
/// nearest sampling. Blits copy bytes without color-space conversion.
pub struct CaptureBackend {
    limits: PoolLimits,
    surface: Option<(ImageFormat, u32, u32)>,
    sample_counts: Vec<u32>,
    unsupported: Vec<ImageFormat>,
    images: HashMap<ImageId, ShadowImage>,
    buffers: HashMap<BufferId, Vec<u8>>,
    pipelines: HashMap<PipelineId, ResolvedPipeline>,
    commands: Vec<Command>,
    presented: Option<Vec<u8>>,
    recording: bool,
}

impl Default for CaptureBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend {
    pub fn new() -> Self {
        Self {
            limits: PoolLimits::default(),
            surface: None,
            sample_counts: vec![1, 4],
            unsupported: Vec::new(),
            images: HashMap::new(),
            buffers: HashMap::new(),
            pipelines: HashMap::new(),
            commands: Vec::new(),
            presented: None,
            recording: false,
        }
    }

    /// Adds a display surface presentable images must match.
    pub fn with_surface(mut self, format: ImageFormat, width: u32, height: u32) -> Self {
        self.surface = Some((format, width, height));
        self
    }

    pub fn with_limits(mut self, limits: PoolLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Sample counts accepted by `supports`. Defaults to `[1, 4]`.
    pub fn with_sample_counts(mut self, counts: &[u32]) -> Self {
        self.sample_counts = counts.to_vec();
        self
    }

    pub fn without_format(mut self, format: ImageFormat) -> Self {
        self.unsupported.push(format);
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Recorded draws, in order.
    pub fn draws(&self) -> impl Iterator<Item = (&DrawCall, u64)> + '_ {
        self.commands.iter().filter_map(|c| match c {
            Command::Draw { call, primitives } => Some((call, *primitives)),
            _ => None,
        })
    }

    pub fn image_bytes(&self, id: ImageId) -> Option<&[u8]> {
        self.images.get(&id).map(|img| img.pixels.as_slice())
    }

    pub fn buffer_bytes(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(&id).map(Vec::as_slice)
    }

    pub fn pipeline(&self, id: PipelineId) -> Option<&ResolvedPipeline> {
        self.pipelines.get(&id)
    }

    /// Contents of the presentable image at the last `present`.
    pub fn presented(&self) -> Option<&[u8]> {
        self.presented.as_deref()
    }

    fn image(&self, id: ImageId) -> Result<&ShadowImage> {
        self.images
            .get(&id)
            .ok_or_else(|| Error::UnknownResource(format!("capture image #{}", id.index())))
    }

    fn image_mut(&mut self, id: ImageId) -> Result<&mut ShadowImage> {
        self.images
            .get_mut(&id)
            .ok_or_else(|| Error::UnknownResource(format!("capture image #{}", id.index())))
    }
}

fn clear_value(format: ImageFormat) -> Vec<u8> {
    if format.is_depth() {
        1.0f32.to_ne_bytes().to_vec()
    } else {
        vec![0; format.bytes_per_pixel()]
    }
}

fn copy_rows(src: &[u8], src_width: u32, region: Region, bpp: usize) -> Vec<u8> {
    let row = region.width as usize * bpp;
    let mut out = Vec::with_capacity(row * region.height as usize);
    for y in region.y..region.y + region.height {
        let start = (y as usize * src_width as usize + region.x as usize) * bpp;
        out.extend_from_slice(&src[start..start + row]);
    }
    out
}

/// Source texel coordinate and weight for destination index `d` along one axis.
fn linear_axis(d: u32, src_len: u32, dst_len: u32) -> (u32, u32, f32) {
    let f = ((d as f32 + 0.5) * src_len as f32 / dst_len as f32 - 0.5).max(0.0);
    let i0 = (f.floor() as u32).min(src_len - 1);
    let i1 = (i0 + 1).min(src_len - 1);
    (i0, i1, f - i0 as f32)
}

fn nearest_axis(d: u32, src_len: u32, dst_len: u32) -> u32 {
    let f = (d as f32 + 0.5) * src_len as f32 / dst_len as f32;
    (f as u32).min(src_len - 1)
}

impl Backend for CaptureBackend {
    fn name(&self) -> &str {
        "capture"
    }

    fn limits(&self) -> PoolLimits {
        self.limits
    }

    fn surface_format(&self) -> Option<ImageFormat> {
        self.surface.map(|(f, _, _)| f)
    }

    fn surface_size(&self) -> Option<(u32, u32)> {
        self.surface.map(|(_, w, h)| (w, h))
    }

    fn supports(&self, format: ImageFormat, samples: u32) -> bool {
        !self.unsupported.contains(&format) && self.sample_counts.contains(&samples)
    }

    fn create_image(&mut self, id: ImageId, desc: &ImageDesc, data: Option<&[u8]>) -> Result<()> {
        let pixels = match data {
            Some(bytes) => bytes.to_vec(),
            None => vec![0; desc.byte_len()],
        };
        self.images.insert(id, ShadowImage { desc: *desc, pixels });
        self.commands.push(Command::CreateImage { id, desc: *desc });
        Ok(())
    }

    fn create_buffer(&mut self, id: BufferId, desc: &BufferDesc, data: Option<&[u8]>) -> Result<()> {
        let mut bytes = vec![0; desc.capacity as usize];
        if let Some(data) = data {
            bytes[..data.len()].copy_from_slice(data);
        }
        self.buffers.insert(id, bytes);
        self.commands.push(Command::CreateBuffer { id, desc: *desc });
        Ok(())
    }

    fn create_pipeline(&mut self, id: PipelineId, pipeline: &ResolvedPipeline) -> Result<()> {
        self.pipelines.insert(id, pipeline.clone());
        self.commands.push(Command::CreatePipeline {
            id,
            label: pipeline.label.clone(),
        });
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<()> {
        self.recording = true;
        self.commands.push(Command::BeginFrame);
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        self.recording = false;
        self.commands.push(Command::EndFrame);
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        if let Some(img) = self.images.values().find(|img| img.desc.presentable) {
            self.presented = Some(img.pixels.clone());
        }
        self.commands.push(Command::Present);
        Ok(())
    }

    fn clear_image(&mut self, id: ImageId) -> Result<()> {
        let img = self.image_mut(id)?;
        let value = clear_value(img.desc.format);
        for px in img.pixels.chunks_exact_mut(value.len()) {
            px.copy_from_slice(&value);
        }
        self.commands.push(Command::Clear(id));
        Ok(())
    }

    fn write_image(&mut self, id: ImageId, region: Region, bytes: &[u8]) -> Result<()> {
        let img = self.image_mut(id)?;
        let bpp = img.desc.format.bytes_per_pixel();
        let width = img.desc.width as usize;
        let row = region.width as usize * bpp;
        for (i, src) in bytes.chunks_exact(row).enumerate() {
            let start = ((region.y as usize + i) * width + region.x as usize) * bpp;
            img.pixels[start..start + row].copy_from_slice(src);
        }
        self.commands.push(Command::WriteImage { id, region });
        Ok(())
    }

    fn read_image(&mut self, id: ImageId, region: Region) -> Result<Vec<u8>> {
        let img = self.image(id)?;
        let bpp = img.desc.format.bytes_per_pixel();
        Ok(copy_rows(&img.pixels, img.desc.width, region, bpp))
    }

    fn write_buffer(&mut self, id: BufferId, offset: u64, bytes: &[u8]) -> Result<()> {
        let buf = self
            .buffers
            .get_mut(&id)
            .ok_or_else(|| Error::UnknownResource(format!("capture buffer #{}", id.index())))?;
        let start = offset as usize;
        buf[start..start + bytes.len()].copy_from_slice(bytes);
        self.commands.push(Command::WriteBuffer {
            id,
            offset,
            len: bytes.len(),
        });
        Ok(())
    }

    fn blit(&mut self, plan: &BlitPlan, filter: Filter) -> Result<()> {
        let src = self.image(plan.src)?;
        let src_desc = src.desc;
        let dst_desc = self.image(plan.dst)?.desc;
        let bpp = src_desc.format.bytes_per_pixel();
        let swap = src_desc.format.is_bgra() != dst_desc.format.is_bgra();
        let linear = filter == Filter::Linear
            && !plan.is_copy()
            && (src_desc.format.is_rgba8_family()
                || matches!(src_desc.format, ImageFormat::R8Unorm | ImageFormat::Rg8Unorm));

        let (sr, dr) = (plan.src_region, plan.dst_region);
        let texel = |x: u32, y: u32| {
            let at = ((sr.y + y) as usize * src_desc.width as usize + (sr.x + x) as usize) * bpp;
            &src.pixels[at..at + bpp]
        };

        let mut out = Vec::with_capacity(dr.area() * bpp);
        for dy in 0..dr.height {
            for dx in 0..dr.width {
                if linear {
                    let (x0, x1, tx) = linear_axis(dx, sr.width, dr.width);
                    let (y0, y1, ty) = linear_axis(dy, sr.height, dr.height);
                    let (a, b, c, d) = (texel(x0, y0), texel(x1, y0), texel(x0, y1), texel(x1, y1));
                    for ch in 0..bpp {
                        let top = a[ch] as f32 * (1.0 - tx) + b[ch] as f32 * tx;
                        let bottom = c[ch] as f32 * (1.0 - tx) + d[ch] as f32 * tx;
                        out.push((top * (1.0 - ty) + bottom * ty).round() as u8);
                    }
                } else {
                    let sx = nearest_axis(dx, sr.width, dr.width);
                    let sy = nearest_axis(dy, sr.height, dr.height);
                    out.extend_from_slice(texel(sx, sy));
                }
                if swap {
                    let n = out.len();
                    out.swap(n - 4, n - 2);
                }
            }
        }

        let dst = self.image_mut(plan.dst)?;
        let width = dst.desc.width as usize;
        let row = dr.width as usize * bpp;
        for (i, src_row) in out.chunks_exact(row).enumerate() {
            let start = ((dr.y as usize + i) * width + dr.x as usize) * bpp;
            dst.pixels[start..start + row].copy_from_slice(src_row);
        }

        self.commands.push(Command::Blit {
            plan: *plan,
            filter,
        });
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall) -> Result<()> {
        let primitives = call.topology.primitive_count(call.count) as u64 * call.instances as u64;
        self.commands.push(Command::Draw {
            call: *call,
            primitives,
        });
        Ok(())
    }
}
