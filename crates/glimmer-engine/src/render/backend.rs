use image::RgbaImage;

use crate::field::ParticleBuffers;

use super::{Camera, MeshTransform, ParticleUniforms};

/// Backend-issued id of an uploaded texture.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Outcome of one [`ParticleBackend::render`] call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RenderStatus {
    Drawn,
    /// Nothing was presented this frame; try again next frame.
    Skipped,
    /// The context is lost; the engine should tear itself down.
    Fatal,
}

/// GPU layer driven by the particle engine.
///
/// A backend owns its surface and every GPU object it creates. Calls after
/// [`dispose`](Self::dispose) are no-ops, and `dispose` itself may be called
/// any number of times.
pub trait ParticleBackend {
    /// Replaces the particle instances drawn by [`render`](Self::render).
    fn upload(&mut self, buffers: &ParticleBuffers);

    /// Uploads a straight-alpha RGBA image for particles to sample.
    fn upload_texture(&mut self, image: &RgbaImage) -> TextureHandle;

    fn set_uniforms(&mut self, uniforms: &ParticleUniforms);

    /// Clears the target and draws the uploaded particles once.
    fn render(&mut self, camera: &Camera, transform: &MeshTransform) -> RenderStatus;

    /// Resizes the drawable, in physical pixels.
    fn resize(&mut self, width: u32, height: u32);

    fn dispose(&mut self);
}
