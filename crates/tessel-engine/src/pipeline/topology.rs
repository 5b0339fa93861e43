/// Primitive assembly mode.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Topology {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
}

impl Topology {
    /// Number of primitives assembled from `count` vertices (or indices).
    ///
    /// Trailing vertices that do not complete a primitive are dropped.
    pub fn primitive_count(self, count: u32) -> u32 {
        match self {
            Topology::Points => count,
            Topology::Lines => count / 2,
            Topology::LineStrip => count.saturating_sub(1),
            Topology::Triangles => count / 3,
            Topology::TriangleStrip => count.saturating_sub(2),
        }
    }

    pub fn is_strip(self) -> bool {
        matches!(self, Topology::LineStrip | Topology::TriangleStrip)
    }
}

/// Which faces are discarded before rasterization. Front faces wind counter-clockwise.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CullFace {
    Front,
    Back,
}

/// Color blending applied when writing to the color attachment.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendMode {
    /// `src * a + dst * (1 - a)`
    Alpha,
    /// `src + dst * (1 - a)`, for premultiplied colors.
    Premultiplied,
    /// `src + dst`
    Additive,
}
