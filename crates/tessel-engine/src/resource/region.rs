/// Axis-aligned pixel rectangle (top-left origin).
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Region covering a whole `width x height` image.
    #[inline]
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn area(self) -> usize {
        self.width as usize * self.height as usize
    }

    #[inline]
    pub fn size(self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns true if the region is non-empty and lies entirely inside a
    /// `width x height` image.
    pub fn fits_within(self, width: u32, height: u32) -> bool {
        if self.is_empty() {
            return false;
        }
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);
        matches!((right, bottom), (Some(r), Some(b)) if r <= width && b <= height)
    }

    /// Returns true if the pixel `(px, py)` is inside the region.
    #[inline]
    pub fn contains(self, px: u32, py: u32) -> bool {
        px >= self.x
            && py >= self.y
            && (px - self.x) < self.width
            && (py - self.y) < self.height
    }

    #[inline]
    pub fn is_full(self, width: u32, height: u32) -> bool {
        self == Self::full(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inside_region_fits() {
        assert!(Region::new(10, 10, 20, 20).fits_within(64, 64));
        assert!(Region::full(64, 64).fits_within(64, 64));
    }

    #[test]
    fn edge_overflow_does_not_fit() {
        assert!(!Region::new(50, 0, 20, 10).fits_within(64, 64));
        assert!(!Region::new(0, 0, 0, 10).fits_within(64, 64));
        assert!(!Region::new(u32::MAX, 0, 2, 2).fits_within(64, 64));
    }

    #[test]
    fn contains_checks_half_open_bounds() {
        let r = Region::new(2, 3, 4, 5);
        assert!(r.contains(2, 3));
        assert!(r.contains(5, 7));
        assert!(!r.contains(6, 7));
        assert!(!r.contains(1, 3));
    }
}
