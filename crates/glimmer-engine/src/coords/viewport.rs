use glam::Vec2;

/// Drawable size of the host in physical pixels.
///
/// The particle shader sizes point sprites in pixels, so it receives this
/// viewport to convert a pixel extent into an NDC offset. Pointer positions
/// reported by the host use the same basis.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Width over height, or `1.0` for a degenerate viewport.
    #[inline]
    pub fn aspect(self) -> f32 {
        if self.is_valid() { self.width / self.height } else { 1.0 }
    }

    /// Maps a pixel position (top-left origin, +Y down) to normalized device
    /// coordinates (center origin, +Y up, corners at ±1).
    ///
    /// A degenerate viewport maps every position to the origin.
    pub fn to_ndc(self, x: f32, y: f32) -> Vec2 {
        if !self.is_valid() {
            return Vec2::ZERO;
        }
        Vec2::new(
            (x / self.width) * 2.0 - 1.0,
            -((y / self.height) * 2.0 - 1.0),
        )
    }
}
