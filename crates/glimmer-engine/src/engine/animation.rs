use glam::{Vec2, Vec3};

use crate::render::MeshTransform;

use super::FrameRequest;

/// Whether the frame loop has a callback outstanding.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoopState {
    Running(FrameRequest),
    Stopped,
}

impl LoopState {
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, LoopState::Running(_))
    }
}

/// Per-frame motion inputs taken from the configuration.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MotionParams {
    pub speed: f32,
    /// `Some(factor)` when the field follows the pointer.
    pub hover_factor: Option<f32>,
    pub rotate: bool,
}

/// Animation clock and mesh placement advanced once per frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Motion {
    /// Scaled milliseconds since the loop started.
    pub elapsed: f64,
    pub transform: MeshTransform,
}

impl Motion {
    /// Seconds fed to the shader's time uniform.
    #[inline]
    pub fn time(&self) -> f32 {
        (self.elapsed * 0.001) as f32
    }

    /// Advances by `dt_ms` real milliseconds. `pointer` is in NDC.
    pub fn advance(&mut self, dt_ms: f32, pointer: Vec2, params: MotionParams) {
        self.elapsed += dt_ms as f64 * params.speed as f64;

        // The field recedes from the cursor.
        self.transform.offset = match params.hover_factor {
            Some(factor) => (-pointer * factor).extend(0.0),
            None => Vec3::ZERO,
        };

        if params.rotate {
            let e = self.elapsed;
            let r = &mut self.transform.rotation;
            r.x = ((e * 0.0002).sin() * 0.1) as f32;
            r.y = ((e * 0.0005).cos() * 0.15) as f32;
            r.z += 0.01 * params.speed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPIN: MotionParams = MotionParams { speed: 0.5, hover_factor: None, rotate: true };

    #[test]
    fn elapsed_scales_with_speed() {
        let mut m = Motion::default();
        m.advance(100.0, Vec2::ZERO, SPIN);
        m.advance(100.0, Vec2::ZERO, SPIN);
        assert!((m.elapsed - 100.0).abs() < 1e-9);
        assert!((m.time() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn spin_accumulates_per_frame() {
        let mut m = Motion::default();
        for _ in 0..10 {
            m.advance(16.0, Vec2::ZERO, SPIN);
        }
        assert!((m.transform.rotation.z - 0.05).abs() < 1e-5);
        assert!((m.transform.rotation.y - (m.elapsed * 0.0005).cos() as f32 * 0.15).abs() < 1e-6);
    }

    #[test]
    fn rotation_can_be_disabled() {
        let mut m = Motion::default();
        m.advance(16.0, Vec2::ZERO, MotionParams { rotate: false, ..SPIN });
        assert_eq!(m.transform.rotation, Vec3::ZERO);
    }

    #[test]
    fn hover_offset_inverts_pointer() {
        let mut m = Motion::default();
        let hover = MotionParams { hover_factor: Some(2.0), ..SPIN };
        m.advance(16.0, Vec2::new(-1.0, 1.0), hover);
        assert_eq!(m.transform.offset, Vec3::new(2.0, -2.0, 0.0));

        // Without hover the mesh snaps back to the origin.
        m.advance(16.0, Vec2::new(-1.0, 1.0), SPIN);
        assert_eq!(m.transform.offset, Vec3::ZERO);
    }
}
