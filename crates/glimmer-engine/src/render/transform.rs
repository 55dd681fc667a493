use bytemuck::{Pod, Zeroable};
use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::coords::Viewport;

use super::{Camera, TextureHandle};

/// Placement of the particle mesh in world space.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct MeshTransform {
    pub offset: Vec3,
    /// Euler angles in radians, applied in Y, X, Z order.
    pub rotation: Vec3,
}

impl MeshTransform {
    pub fn model_matrix(&self) -> Mat4 {
        let r = self.rotation;
        let rotation = Quat::from_euler(EulerRot::YXZ, r.y, r.x, r.z);
        Mat4::from_rotation_translation(rotation, self.offset)
    }
}

/// Per-draw shader inputs owned by the engine.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ParticleUniforms {
    /// Seconds of scaled animation time.
    pub time: f32,
    pub spread: f32,
    pub base_size: f32,
    pub size_randomness: f32,
    /// Soft-edged circles instead of hard discs.
    pub alpha_particles: bool,
    pub texture: Option<TextureHandle>,
}

impl Default for ParticleUniforms {
    fn default() -> Self {
        Self {
            time: 0.0,
            spread: 10.0,
            base_size: 100.0,
            size_randomness: 1.0,
            alpha_particles: false,
            texture: None,
        }
    }
}

/// GPU layout of the uniform buffer (224 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct UniformBlock {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub viewport: [f32; 2],
    pub time: f32,
    pub spread: f32,
    pub base_size: f32,
    pub size_randomness: f32,
    pub alpha_particles: f32,
    pub _pad: f32,
}

impl UniformBlock {
    pub fn new(
        uniforms: &ParticleUniforms,
        camera: &Camera,
        transform: &MeshTransform,
        viewport: Viewport,
    ) -> Self {
        Self {
            model: transform.model_matrix().to_cols_array_2d(),
            view: camera.view().to_cols_array_2d(),
            projection: camera.projection().to_cols_array_2d(),
            viewport: [viewport.width.max(1.0), viewport.height.max(1.0)],
            time: uniforms.time,
            spread: uniforms.spread,
            base_size: uniforms.base_size,
            size_randomness: uniforms.size_randomness,
            alpha_particles: if uniforms.alpha_particles { 1.0 } else { 0.0 },
            _pad: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_block_matches_shader_layout() {
        assert_eq!(std::mem::size_of::<UniformBlock>(), 224);
    }

    #[test]
    fn model_matrix_translates_by_offset() {
        let t = MeshTransform {
            offset: Vec3::new(1.0, -2.0, 0.0),
            rotation: Vec3::ZERO,
        };
        let p = t.model_matrix().transform_point3(Vec3::ZERO);
        assert!((p - Vec3::new(1.0, -2.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn spin_turns_about_z() {
        let t = MeshTransform {
            offset: Vec3::ZERO,
            rotation: Vec3::new(0.0, 0.0, std::f32::consts::FRAC_PI_2),
        };
        let p = t.model_matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::Y).length() < 1e-6);
    }
}
