use glam::{Mat4, Vec3};

/// Perspective camera looking at the origin down -Z.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    aspect: f32,
}

impl Camera {
    pub const FOV: f32 = 15.0;
    pub const NEAR: f32 = 0.1;
    pub const FAR: f32 = 100.0;

    pub fn new(distance: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, distance),
            fov: Self::FOV,
            near: Self::NEAR,
            far: Self::FAR,
            aspect: 1.0,
        }
    }

    #[inline]
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Ignores non-positive or non-finite ratios (a minimized window).
    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, Vec3::ZERO, Vec3::Y)
    }

    /// Right-handed projection with a `[0, 1]` depth range.
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far)
    }
}
