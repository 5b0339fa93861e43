use crate::backend::{Backend, DrawCall};
use crate::error::{Error, Result};
use crate::frame::{FrameScheduler, FrameState, FrameStats};
use crate::pipeline::{self, Filter, Pipeline, PipelineDesc, PipelineId};
use crate::resource::{
    BufferDesc, BufferId, BufferInfo, BufferUsage, ContentState, ImageDesc, ImageId, ImageInfo,
    Region, ResourcePool,
};

/// The frame orchestrator.
///
/// Owns a backend, the resource pool and the frame scheduler. Every operation is
/// validated here before the backend sees it, and is forwarded in call order.
///
/// | operation                        | frame state          |
/// |----------------------------------|----------------------|
/// | create_*                         | any                  |
/// | write, write_region, write_buffer| any                  |
/// | clear, blit, render              | open                 |
/// | read, read_region, present       | idle                 |
pub struct Context<B: Backend> {
    backend: B,
    pool: ResourcePool,
    frames: FrameScheduler,
    pipeline_count: u32,
}

impl<B: Backend> Context<B> {
    pub fn new(backend: B) -> Self {
        let limits = backend.limits();
        log::debug!("context on {} backend, limits {limits:?}", backend.name());
        Self {
            backend,
            pool: ResourcePool::new(limits),
            frames: FrameScheduler::new(),
            pipeline_count: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    pub fn image_info(&self, id: ImageId) -> Result<&ImageInfo> {
        self.pool.image(id)
    }

    pub fn buffer_info(&self, id: BufferId) -> Result<&BufferInfo> {
        self.pool.buffer(id)
    }

    pub fn frame_state(&self) -> FrameState {
        self.frames.state()
    }

    pub fn frame_open(&self) -> bool {
        self.frames.is_open()
    }

    /// Counters of the open frame, or of the last finished one.
    pub fn frame_stats(&self) -> FrameStats {
        self.frames.stats()
    }

    pub fn presentable(&self) -> Option<ImageId> {
        self.pool.presentable()
    }

    fn check_backend_image(&self, desc: &ImageDesc) -> Result<()> {
        self.pool.check_image_desc(desc)?;

        if !self.backend.supports(desc.format, desc.samples) {
            return Err(Error::InvalidFormat(format!(
                "{} backend does not support {} with {} samples",
                self.backend.name(),
                desc.format,
                desc.samples
            )));
        }
        if !desc.presentable {
            return Ok(());
        }

        if self.pool.presentable().is_some() {
            return Err(Error::InvalidFormat(
                "a presentable image already exists".into(),
            ));
        }
        let (Some(format), Some(size)) = (self.backend.surface_format(), self.backend.surface_size())
        else {
            return Err(Error::InvalidFormat(
                "presentable image requested without a display surface".into(),
            ));
        };
        if desc.format != format || (desc.width, desc.height) != size {
            return Err(Error::InvalidFormat(format!(
                "presentable image must be {}x{} {format}, got {}x{} {}",
                size.0, size.1, desc.width, desc.height, desc.format
            )));
        }
        Ok(())
    }

    fn next_image_id(&self) -> ImageId {
        ImageId(self.pool.image_count() as u32)
    }

    fn next_buffer_id(&self) -> BufferId {
        BufferId(self.pool.buffer_count() as u32)
    }

    /// Creates an image. Its content is undefined until cleared or written.
    pub fn create_image(&mut self, desc: ImageDesc) -> Result<ImageId> {
        self.check_backend_image(&desc)?;
        let id = self.next_image_id();
        self.backend.create_image(id, &desc, None)?;
        let id = self.pool.insert_image(desc)?;
        log::debug!(
            "image #{}: {}x{} {} samples={} texture={} presentable={}",
            id.index(),
            desc.width,
            desc.height,
            desc.format,
            desc.samples,
            desc.texture,
            desc.presentable
        );
        Ok(id)
    }

    /// Creates an image holding `data`, which must cover the whole image.
    pub fn create_image_with_data(&mut self, desc: ImageDesc, data: &[u8]) -> Result<ImageId> {
        self.check_backend_image(&desc)?;
        if desc.format.is_depth() || desc.is_multisampled() || desc.presentable {
            return Err(Error::InvalidFormat(format!(
                "cannot upload initial pixels into a {} image (samples={}, presentable={})",
                desc.format, desc.samples, desc.presentable
            )));
        }
        if data.len() != desc.byte_len() {
            return Err(Error::SizeMismatch {
                expected: desc.byte_len(),
                actual: data.len(),
            });
        }

        let id = self.next_image_id();
        self.backend.create_image(id, &desc, Some(data))?;
        let id = self.pool.insert_image(desc)?;
        self.pool.set_content(id, ContentState::Written);
        log::debug!(
            "image #{}: {}x{} {} with initial data",
            id.index(),
            desc.width,
            desc.height,
            desc.format
        );
        Ok(id)
    }

    pub fn create_buffer(&mut self, desc: BufferDesc) -> Result<BufferId> {
        self.insert_buffer(desc, None)
    }

    /// Creates a buffer sized and filled from `data`.
    pub fn create_buffer_with_data(&mut self, usage: BufferUsage, data: &[u8]) -> Result<BufferId> {
        self.insert_buffer(BufferDesc::new(data.len() as u64, usage), Some(data))
    }

    fn insert_buffer(&mut self, desc: BufferDesc, data: Option<&[u8]>) -> Result<BufferId> {
        self.pool.check_buffer_desc(&desc)?;
        let id = self.next_buffer_id();
        self.backend.create_buffer(id, &desc, data)?;
        let id = self.pool.insert_buffer(desc)?;
        log::debug!(
            "buffer #{}: {} bytes, {:?}",
            id.index(),
            desc.capacity,
            desc.usage
        );
        Ok(id)
    }

    /// Validates `desc` and builds the pipeline. All binding errors surface here.
    pub fn create_pipeline(&mut self, desc: &PipelineDesc) -> Result<Pipeline> {
        let resolved = pipeline::resolve(&self.pool, desc)?;
        let id = PipelineId(self.pipeline_count);
        self.backend.create_pipeline(id, &resolved)?;
        self.pipeline_count += 1;
        log::debug!(
            "pipeline #{} {:?}: {:?} x{} instances={} uniforms={} sampled={}",
            id.index(),
            resolved.label,
            resolved.topology,
            resolved.count,
            resolved.instance_count,
            resolved.uniforms.len(),
            resolved.sampled.len()
        );
        Ok(Pipeline::from_resolved(id, &resolved))
    }

    /// `Idle -> Open`. Returns the frame index.
    pub fn begin_frame(&mut self) -> Result<u64> {
        self.frames.require_idle()?;
        self.backend.begin_frame()?;
        self.frames.begin()
    }

    /// `Open -> Idle`, submitting the frame's commands.
    pub fn end_frame(&mut self) -> Result<FrameStats> {
        self.frames.require_open()?;
        self.backend.end_frame()?;
        self.frames.end()
    }

    /// Shows the presentable image. Must be called outside a frame.
    pub fn present(&mut self) -> Result<()> {
        self.frames.require_idle()?;
        self.backend.present()?;
        if let Some(id) = self.pool.presentable() {
            self.pool.set_content(id, ContentState::Undefined);
        }
        Ok(())
    }

    /// Resets every pixel: color to zero, depth to 1.0.
    pub fn clear(&mut self, image: ImageId) -> Result<()> {
        self.frames.require_open()?;
        self.pool.image(image)?;
        self.backend.clear_image(image)?;
        self.pool.set_content(image, ContentState::Cleared);
        self.frames.record_clear();
        Ok(())
    }

    /// Replaces the whole image.
    pub fn write(&mut self, image: ImageId, bytes: &[u8]) -> Result<()> {
        let region = self.pool.check_write(image, bytes.len(), None)?;
        self.upload(image, region, bytes)
    }

    /// Replaces the pixels inside `region`.
    pub fn write_region(&mut self, image: ImageId, bytes: &[u8], region: Region) -> Result<()> {
        let region = self.pool.check_write(image, bytes.len(), Some(region))?;
        self.upload(image, region, bytes)
    }

    fn upload(&mut self, image: ImageId, region: Region, bytes: &[u8]) -> Result<()> {
        self.backend.write_image(image, region, bytes)?;
        self.pool.set_content(image, ContentState::Written);
        self.frames.record_image_write();
        Ok(())
    }

    /// Reads the whole image back. Must be called outside a frame.
    pub fn read(&mut self, image: ImageId) -> Result<Vec<u8>> {
        self.frames.require_idle()?;
        let region = self.pool.check_read(image, None)?;
        self.backend.read_image(image, region)
    }

    pub fn read_region(&mut self, image: ImageId, region: Region) -> Result<Vec<u8>> {
        self.frames.require_idle()?;
        let region = self.pool.check_read(image, Some(region))?;
        self.backend.read_image(image, region)
    }

    /// Copies all of `src` into all of `dst` with linear filtering.
    /// `dst = None` targets the presentable image.
    pub fn blit(&mut self, src: ImageId, dst: Option<ImageId>) -> Result<()> {
        self.blit_region(src, dst, None, None, Filter::Linear)
    }

    /// Copies `src_region` of `src` into `dst_region` of `dst`, resampling
    /// when the sizes differ. Missing regions mean the whole image.
    pub fn blit_region(
        &mut self,
        src: ImageId,
        dst: Option<ImageId>,
        src_region: Option<Region>,
        dst_region: Option<Region>,
        filter: Filter,
    ) -> Result<()> {
        self.frames.require_open()?;
        let plan = self.pool.check_blit(src, dst, src_region, dst_region)?;
        self.backend.blit(&plan, filter)?;
        self.pool.set_content(plan.dst, ContentState::Written);
        self.frames.record_blit();
        Ok(())
    }

    /// Writes `bytes` at `offset`. Legal inside and outside frames.
    pub fn write_buffer(&mut self, buffer: BufferId, offset: u64, bytes: &[u8]) -> Result<()> {
        self.pool.check_buffer_write(buffer, offset, bytes.len())?;
        self.backend.write_buffer(buffer, offset, bytes)?;
        self.pool.note_buffer_write(buffer);
        self.frames.record_buffer_write();
        Ok(())
    }

    /// Issues the pipeline's draw with the resources as they are now.
    pub fn render(&mut self, pipeline: &Pipeline) -> Result<()> {
        self.frames.require_open()?;
        if pipeline.id().0 >= self.pipeline_count {
            return Err(Error::UnknownResource(format!(
                "pipeline #{} ({:?})",
                pipeline.id().index(),
                pipeline.label()
            )));
        }

        self.backend.draw(&DrawCall {
            pipeline: pipeline.id(),
            topology: pipeline.topology(),
            count: pipeline.vertex_count(),
            instances: pipeline.instance_count(),
            indexed: pipeline.is_indexed(),
        })?;
        for &image in pipeline.framebuffer() {
            self.pool.set_content(image, ContentState::Written);
        }
        self.frames.record_draw(pipeline.primitives_per_draw());
        Ok(())
    }
}
