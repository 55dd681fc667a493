/// Normalized rectangle `(u1, v1) .. (u2, v2)` in atlas texture space.
///
/// `(0, 0)` is the top-left texel corner of the atlas image.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct UvRect {
    pub u1: f32,
    pub v1: f32,
    pub u2: f32,
    pub v2: f32,
}

impl UvRect {
    /// The whole texture; used when particles sample a single-image texture.
    pub const FULL: Self = Self { u1: 0.0, v1: 0.0, u2: 1.0, v2: 1.0 };

    #[inline]
    pub const fn new(u1: f32, v1: f32, u2: f32, v2: f32) -> Self {
        Self { u1, v1, u2, v2 }
    }

    /// Rectangle of a pixel region inside a square atlas of `atlas_size` pixels.
    pub fn from_pixels(x: u32, y: u32, size: u32, atlas_size: u32) -> Self {
        let s = atlas_size as f32;
        Self::new(
            x as f32 / s,
            y as f32 / s,
            (x + size) as f32 / s,
            (y + size) as f32 / s,
        )
    }

    /// Packed as the `uv_bounds` vertex attribute.
    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.u1, self.v1, self.u2, self.v2]
    }

    pub fn is_within_unit(self) -> bool {
        let r = 0.0..=1.0;
        r.contains(&self.u1)
            && r.contains(&self.v1)
            && r.contains(&self.u2)
            && r.contains(&self.v2)
            && self.u1 <= self.u2
            && self.v1 <= self.v2
    }

    /// True when the interiors intersect. Shared edges do not count.
    pub fn overlaps(self, other: UvRect) -> bool {
        self.u1 < other.u2 && other.u1 < self.u2 && self.v1 < other.v2 && other.v1 < self.v2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_rect_is_normalized() {
        let r = UvRect::from_pixels(10, 10, 492, 512);
        assert!((r.u1 - 0.0195).abs() < 1e-3);
        assert!((r.v2 - 0.9805).abs() < 1e-3);
        assert!(r.is_within_unit());
    }

    #[test]
    fn touching_rects_do_not_overlap() {
        let a = UvRect::new(0.0, 0.0, 0.5, 0.5);
        let b = UvRect::new(0.5, 0.0, 1.0, 0.5);
        assert!(!a.overlaps(b));
        assert!(a.overlaps(UvRect::new(0.25, 0.25, 0.75, 0.75)));
    }

    #[test]
    fn full_rect_is_unit() {
        assert!(UvRect::FULL.is_within_unit());
        assert!(!UvRect::new(0.0, 0.0, 1.2, 1.0).is_within_unit());
    }
}
