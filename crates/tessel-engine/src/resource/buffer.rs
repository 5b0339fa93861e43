/// Handle to a buffer owned by a [`Context`](crate::Context).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct BufferId(pub(crate) u32);

impl BufferId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// How a pipeline is allowed to consume a buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferUsage {
    /// Interleaved per-vertex or per-instance attributes.
    Vertex,
    /// `u16`/`u32` indices.
    Index,
    /// Uniform block contents, rewritten every frame.
    Uniform,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BufferDesc {
    pub capacity: u64,
    pub usage: BufferUsage,
}

impl BufferDesc {
    pub fn new(capacity: u64, usage: BufferUsage) -> Self {
        Self { capacity, usage }
    }

    pub fn uniform(capacity: u64) -> Self {
        Self::new(capacity, BufferUsage::Uniform)
    }

    pub fn vertex(capacity: u64) -> Self {
        Self::new(capacity, BufferUsage::Vertex)
    }
}

#[derive(Debug, Clone)]
pub struct BufferInfo {
    pub desc: BufferDesc,
    /// Number of writes since creation.
    pub writes: u64,
}
