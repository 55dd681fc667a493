//! GPU buffer layer and particle shaders.
//!
//! The engine talks to the GPU only through [`ParticleBackend`]. The wgpu
//! implementation, [`ParticleRenderer`], owns the window surface, uploads the
//! particle field as instance data and draws it with `shaders/particles.wgsl`.
//!
//! Convention:
//! - Sizes and viewport are physical pixels.
//! - World space is right-handed, +Y up; the camera looks down -Z.

mod backend;
mod camera;
mod ctx;
mod particles;
mod renderer;
mod transform;

pub use backend::{ParticleBackend, RenderStatus, TextureHandle};
pub use camera::Camera;
pub use ctx::{RenderCtx, RenderTarget};
pub use particles::ParticlePass;
pub use renderer::ParticleRenderer;
pub use transform::{MeshTransform, ParticleUniforms};
