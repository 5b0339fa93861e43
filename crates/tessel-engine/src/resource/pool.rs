use crate::error::{Error, Result};

use super::{
    BufferDesc, BufferId, BufferInfo, ContentState, ImageDesc, ImageId, ImageInfo, Region,
};

const SUPPORTED_SAMPLE_COUNTS: [u32; 5] = [1, 2, 4, 8, 16];

/// Allocation limits enforced before anything reaches the backend.
///
/// Backends report their own limits (see [`Backend::limits`](crate::backend::Backend::limits)).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PoolLimits {
    /// Largest width or height accepted for an image.
    pub max_image_dimension: u32,
    /// Largest buffer capacity in bytes.
    pub max_buffer_size: u64,
    /// Total bytes of images and buffers the pool may hold. `None` means unbounded.
    pub memory_budget: Option<u64>,
}

impl Default for PoolLimits {
    fn default() -> Self {
        Self {
            max_image_dimension: 8192,
            max_buffer_size: 256 << 20,
            memory_budget: None,
        }
    }
}

/// A validated blit, with defaults filled in.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BlitPlan {
    pub src: ImageId,
    pub dst: ImageId,
    pub src_region: Region,
    pub dst_region: Region,
    /// The source is multisampled and is resolved into `dst`.
    pub resolve: bool,
}

impl BlitPlan {
    /// True when no resampling is needed.
    pub fn is_copy(&self) -> bool {
        self.src_region.size() == self.dst_region.size()
    }
}

/// Registry of images and buffers.
///
/// The pool owns metadata only (size, format, samples, content state). Device
/// memory lives in the backend; every operation is validated here first so the
/// backend can assume well-formed requests.
#[derive(Debug, Default)]
pub struct ResourcePool {
    limits: PoolLimits,
    images: Vec<ImageInfo>,
    buffers: Vec<BufferInfo>,
    allocated: u64,
    presentable: Option<ImageId>,
}

impl ResourcePool {
    pub fn new(limits: PoolLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    pub fn limits(&self) -> PoolLimits {
        self.limits
    }

    /// Bytes currently accounted against the memory budget.
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// The presentable image, if one was created.
    pub fn presentable(&self) -> Option<ImageId> {
        self.presentable
    }

    pub fn image(&self, id: ImageId) -> Result<&ImageInfo> {
        self.images
            .get(id.index())
            .ok_or_else(|| Error::UnknownResource(format!("image #{}", id.0)))
    }

    pub fn buffer(&self, id: BufferId) -> Result<&BufferInfo> {
        self.buffers
            .get(id.index())
            .ok_or_else(|| Error::UnknownResource(format!("buffer #{}", id.0)))
    }

    /// Checks the static rules of an image description without registering it.
    pub fn check_image_desc(&self, desc: &ImageDesc) -> Result<()> {
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::InvalidFormat(format!(
                "image size {}x{} is empty",
                desc.width, desc.height
            )));
        }
        if !SUPPORTED_SAMPLE_COUNTS.contains(&desc.samples) {
            return Err(Error::InvalidFormat(format!(
                "sample count {} is not one of {SUPPORTED_SAMPLE_COUNTS:?}",
                desc.samples
            )));
        }
        if desc.is_multisampled() && desc.texture {
            return Err(Error::InvalidFormat(
                "multisampled images cannot be texture-sampleable".into(),
            ));
        }
        if desc.presentable {
            if desc.format.is_depth() || desc.is_multisampled() || desc.texture {
                return Err(Error::InvalidFormat(format!(
                    "presentable image must be a single-sampled, non-texture color image \
                     (got {}, samples={}, texture={})",
                    desc.format, desc.samples, desc.texture
                )));
            }
        }

        let max = self.limits.max_image_dimension;
        if desc.width > max || desc.height > max {
            return Err(Error::CapacityExceeded(format!(
                "image size {}x{} exceeds the {max}px limit",
                desc.width, desc.height
            )));
        }
        self.check_budget(desc.footprint())
    }

    pub(crate) fn insert_image(&mut self, desc: ImageDesc) -> Result<ImageId> {
        self.check_image_desc(&desc)?;

        let id = ImageId(self.images.len() as u32);
        self.allocated += desc.footprint();
        self.images.push(ImageInfo {
            desc,
            content: ContentState::Undefined,
        });
        if desc.presentable {
            self.presentable = Some(id);
        }
        Ok(id)
    }

    /// Checks a buffer description without registering it.
    pub fn check_buffer_desc(&self, desc: &BufferDesc) -> Result<()> {
        if desc.capacity == 0 {
            return Err(Error::InvalidFormat("buffer capacity must be non-zero".into()));
        }
        if desc.capacity > self.limits.max_buffer_size {
            return Err(Error::CapacityExceeded(format!(
                "buffer of {} bytes exceeds the {} byte limit",
                desc.capacity, self.limits.max_buffer_size
            )));
        }
        self.check_budget(desc.capacity)
    }

    pub(crate) fn insert_buffer(&mut self, desc: BufferDesc) -> Result<BufferId> {
        self.check_buffer_desc(&desc)?;

        let id = BufferId(self.buffers.len() as u32);
        self.allocated += desc.capacity;
        self.buffers.push(BufferInfo { desc, writes: 0 });
        Ok(id)
    }

    fn check_budget(&self, extra: u64) -> Result<()> {
        let Some(budget) = self.limits.memory_budget else {
            return Ok(());
        };
        let total = self.allocated.saturating_add(extra);
        if total > budget {
            return Err(Error::CapacityExceeded(format!(
                "allocating {extra} bytes would use {total} of a {budget} byte budget"
            )));
        }
        Ok(())
    }

    /// Validates a pixel upload and returns the target region.
    ///
    /// `region = None` means the whole image.
    pub fn check_write(&self, id: ImageId, len: usize, region: Option<Region>) -> Result<Region> {
        let desc = self.image(id)?.desc;
        if desc.format.is_depth() || desc.is_multisampled() || desc.presentable {
            return Err(Error::InvalidFormat(format!(
                "cannot write pixels into a {} image (samples={}, presentable={})",
                desc.format, desc.samples, desc.presentable
            )));
        }

        let region = self.check_region(&desc, region)?;
        let expected = region.area() * desc.format.bytes_per_pixel();
        if len != expected {
            return Err(Error::SizeMismatch {
                expected,
                actual: len,
            });
        }
        Ok(region)
    }

    /// Validates a pixel readback and returns the source region.
    pub fn check_read(&self, id: ImageId, region: Option<Region>) -> Result<Region> {
        let desc = self.image(id)?.desc;
        if desc.format.is_depth() || desc.is_multisampled() || desc.presentable {
            return Err(Error::InvalidFormat(format!(
                "cannot read pixels from a {} image (samples={}, presentable={})",
                desc.format, desc.samples, desc.presentable
            )));
        }
        self.check_region(&desc, region)
    }

    /// Validates a blit. `dst = None` targets the presentable image.
    pub fn check_blit(
        &self,
        src: ImageId,
        dst: Option<ImageId>,
        src_region: Option<Region>,
        dst_region: Option<Region>,
    ) -> Result<BlitPlan> {
        let dst = match dst.or(self.presentable) {
            Some(id) => id,
            None => {
                return Err(Error::InvalidBlit(
                    "no destination given and no presentable image exists".into(),
                ));
            }
        };
        if src == dst {
            return Err(Error::InvalidBlit(
                "source and destination are the same image".into(),
            ));
        }

        let s = self.image(src)?.desc;
        let d = self.image(dst)?.desc;

        if s.presentable {
            return Err(Error::InvalidBlit(
                "the presentable image cannot be a blit source".into(),
            ));
        }
        if s.format.is_depth() || d.format.is_depth() {
            return Err(Error::InvalidBlit("depth images cannot be blitted".into()));
        }
        if d.is_multisampled() {
            return Err(Error::InvalidBlit(
                "cannot blit into a multisampled image".into(),
            ));
        }
        if !s.format.blit_compatible(d.format) {
            return Err(Error::InvalidBlit(format!(
                "cannot blit {} into {}",
                s.format, d.format
            )));
        }

        let src_region = self.check_region(&s, src_region)?;
        let dst_region = self.check_region(&d, dst_region)?;

        let resolve = s.is_multisampled();
        if resolve {
            let full = src_region.is_full(s.width, s.height)
                && dst_region.is_full(d.width, d.height)
                && src_region.size() == dst_region.size();
            if !full || s.format != d.format {
                return Err(Error::InvalidBlit(
                    "resolving a multisampled image needs a same-size, same-format destination \
                     and full regions"
                        .into(),
                ));
            }
        }

        Ok(BlitPlan {
            src,
            dst,
            src_region,
            dst_region,
            resolve,
        })
    }

    /// Validates a buffer write of `len` bytes at `offset`.
    pub fn check_buffer_write(&self, id: BufferId, offset: u64, len: usize) -> Result<()> {
        let capacity = self.buffer(id)?.desc.capacity;
        let end = offset.checked_add(len as u64);
        match end {
            Some(end) if end <= capacity => Ok(()),
            _ => Err(Error::SizeMismatch {
                expected: capacity.saturating_sub(offset) as usize,
                actual: len,
            }),
        }
    }

    fn check_region(&self, desc: &ImageDesc, region: Option<Region>) -> Result<Region> {
        let region = region.unwrap_or(Region::full(desc.width, desc.height));
        if !region.fits_within(desc.width, desc.height) {
            return Err(Error::OutOfBounds {
                region,
                width: desc.width,
                height: desc.height,
            });
        }
        Ok(region)
    }

    pub(crate) fn set_content(&mut self, id: ImageId, content: ContentState) {
        if let Some(info) = self.images.get_mut(id.index()) {
            info.content = content;
        }
    }

    pub(crate) fn note_buffer_write(&mut self, id: BufferId) {
        if let Some(info) = self.buffers.get_mut(id.index()) {
            info.writes += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{BufferUsage, ImageFormat};

    fn rgba(w: u32, h: u32) -> ImageDesc {
        ImageDesc::new(w, h, ImageFormat::Rgba8Unorm)
    }

    #[test]
    fn full_write_requires_exact_length() {
        let mut pool = ResourcePool::default();
        let img = pool.insert_image(rgba(4, 4)).unwrap();
        assert_eq!(pool.check_write(img, 64, None), Ok(Region::full(4, 4)));
        assert_eq!(
            pool.check_write(img, 63, None),
            Err(Error::SizeMismatch {
                expected: 64,
                actual: 63
            })
        );
    }

    #[test]
    fn crop_write_outside_image_is_out_of_bounds() {
        let mut pool = ResourcePool::default();
        let img = pool.insert_image(rgba(8, 8)).unwrap();
        let outside = Region::new(6, 6, 4, 4);
        assert!(matches!(
            pool.check_write(img, 64, Some(outside)),
            Err(Error::OutOfBounds { .. })
        ));
        let inside = Region::new(2, 2, 4, 4);
        assert_eq!(pool.check_write(img, 64, Some(inside)), Ok(inside));
    }

    #[test]
    fn depth_and_multisampled_images_reject_writes() {
        let mut pool = ResourcePool::default();
        let depth = pool
            .insert_image(ImageDesc::new(4, 4, ImageFormat::Depth24Plus).texture(false))
            .unwrap();
        let msaa = pool
            .insert_image(rgba(4, 4).samples(4).texture(false))
            .unwrap();
        assert!(matches!(pool.check_write(depth, 64, None), Err(Error::InvalidFormat(_))));
        assert!(matches!(pool.check_write(msaa, 64, None), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn unsupported_sample_count_is_invalid_format() {
        let pool = ResourcePool::default();
        let desc = rgba(4, 4).samples(3).texture(false);
        assert!(matches!(pool.check_image_desc(&desc), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn memory_budget_is_enforced() {
        let mut pool = ResourcePool::new(PoolLimits {
            memory_budget: Some(100),
            ..PoolLimits::default()
        });
        pool.insert_image(rgba(4, 4)).unwrap();
        assert_eq!(pool.allocated_bytes(), 64);
        assert!(matches!(
            pool.insert_buffer(BufferDesc::new(64, BufferUsage::Uniform)),
            Err(Error::CapacityExceeded(_))
        ));
        assert!(pool.insert_buffer(BufferDesc::uniform(36)).is_ok());
    }

    #[test]
    fn oversized_image_exceeds_capacity() {
        let pool = ResourcePool::new(PoolLimits {
            max_image_dimension: 1024,
            ..PoolLimits::default()
        });
        assert!(matches!(
            pool.check_image_desc(&rgba(2048, 16)),
            Err(Error::CapacityExceeded(_))
        ));
    }

    #[test]
    fn buffer_write_past_capacity_is_size_mismatch() {
        let mut pool = ResourcePool::default();
        let buf = pool.insert_buffer(BufferDesc::uniform(80)).unwrap();
        assert!(pool.check_buffer_write(buf, 0, 80).is_ok());
        assert_eq!(
            pool.check_buffer_write(buf, 16, 80),
            Err(Error::SizeMismatch {
                expected: 64,
                actual: 80
            })
        );
    }

    #[test]
    fn blit_defaults_to_presentable_image() {
        let mut pool = ResourcePool::default();
        let src = pool.insert_image(rgba(32, 32)).unwrap();
        assert!(matches!(
            pool.check_blit(src, None, None, None),
            Err(Error::InvalidBlit(_))
        ));
        let screen = pool
            .insert_image(ImageDesc::presentable(32, 32, ImageFormat::Bgra8UnormSrgb))
            .unwrap();
        let plan = pool.check_blit(src, None, None, None).unwrap();
        assert_eq!(plan.dst, screen);
        assert!(plan.is_copy());
        assert!(!plan.resolve);
    }

    #[test]
    fn multisampled_blit_must_be_a_full_resolve() {
        let mut pool = ResourcePool::default();
        let msaa = pool
            .insert_image(rgba(16, 16).samples(4).texture(false))
            .unwrap();
        let out = pool.insert_image(rgba(16, 16)).unwrap();
        let small = pool.insert_image(rgba(8, 8)).unwrap();

        assert!(pool.check_blit(msaa, Some(out), None, None).unwrap().resolve);
        assert!(matches!(
            pool.check_blit(msaa, Some(small), None, None),
            Err(Error::InvalidBlit(_))
        ));
        assert!(matches!(
            pool.check_blit(out, Some(msaa), None, None),
            Err(Error::InvalidBlit(_))
        ));
    }
}
