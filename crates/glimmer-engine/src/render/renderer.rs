use std::sync::Arc;

use anyhow::Result;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::coords::Viewport;
use crate::device::{Gpu, GpuInit, SurfaceErrorAction};
use crate::field::ParticleBuffers;

use super::particles::ParticlePass;
use super::transform::UniformBlock;
use super::{
    Camera, MeshTransform, ParticleBackend, ParticleUniforms, RenderCtx, RenderStatus,
    RenderTarget, TextureHandle,
};

struct GpuTexture {
    // Kept alive for the view.
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// wgpu implementation of [`ParticleBackend`] bound to one window.
///
/// Dropping the GPU context on [`dispose`](ParticleBackend::dispose) releases
/// the surface, so the window stops showing particles.
pub struct ParticleRenderer {
    gpu: Option<Gpu>,
    pass: ParticlePass,
    textures: Vec<GpuTexture>,
    uniforms: ParticleUniforms,
}

impl ParticleRenderer {
    /// Creates the GPU context for `window`. Blocks until the device is ready.
    pub fn new(window: Arc<Window>, init: GpuInit) -> Result<Self> {
        let gpu = pollster::block_on(Gpu::new(window, init))?;
        Ok(Self {
            gpu: Some(gpu),
            pass: ParticlePass::new(),
            textures: Vec::new(),
            uniforms: ParticleUniforms::default(),
        })
    }

    fn viewport(gpu: &Gpu) -> Viewport {
        let size = gpu.size();
        Viewport::new(size.width as f32, size.height as f32)
    }
}

impl ParticleBackend for ParticleRenderer {
    fn upload(&mut self, buffers: &ParticleBuffers) {
        let Some(gpu) = self.gpu.as_ref() else { return };
        let ctx = RenderCtx::new(gpu.device(), gpu.queue(), gpu.surface_format(), Self::viewport(gpu));
        self.pass.upload(&ctx, buffers);
        log::debug!("uploaded {} particles", buffers.len());
    }

    fn upload_texture(&mut self, image: &RgbaImage) -> TextureHandle {
        let handle = TextureHandle(self.textures.len() as u32);
        let Some(gpu) = self.gpu.as_ref() else { return handle };

        // UVs are normalized, so a downscaled atlas keeps its cell mapping.
        let max_side = gpu.device().limits().max_texture_dimension_2d;
        let scaled;
        let image = if image.width() > max_side || image.height() > max_side {
            log::warn!(
                "{}x{} texture exceeds the GPU limit of {max_side}; downscaling",
                image.width(),
                image.height()
            );
            scaled = imageops::resize(
                image,
                image.width().min(max_side),
                image.height().min(max_side),
                FilterType::Triangle,
            );
            &scaled
        } else {
            image
        };

        let (width, height) = image.dimensions();
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("glimmer particle texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        gpu.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.textures.push(GpuTexture { _texture: texture, view });
        handle
    }

    fn set_uniforms(&mut self, uniforms: &ParticleUniforms) {
        self.uniforms = *uniforms;
    }

    fn render(&mut self, camera: &Camera, transform: &MeshTransform) -> RenderStatus {
        let Some(gpu) = self.gpu.as_mut() else { return RenderStatus::Skipped };

        let mut frame = match gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                return match gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => RenderStatus::Fatal,
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                        RenderStatus::Skipped
                    }
                };
            }
        };

        let viewport = Self::viewport(gpu);
        let block = UniformBlock::new(&self.uniforms, camera, transform, viewport);
        let texture = self
            .uniforms
            .texture
            .and_then(|h| self.textures.get(h.0 as usize).map(|t| (h, &t.view)));

        {
            let ctx = RenderCtx::new(gpu.device(), gpu.queue(), gpu.surface_format(), viewport);
            let mut target = RenderTarget::new(&mut frame.encoder, &frame.view);
            self.pass.render(&ctx, &mut target, &block, texture);
        }

        gpu.submit(frame);
        RenderStatus::Drawn
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.resize(PhysicalSize::new(width, height));
        }
    }

    fn dispose(&mut self) {
        if self.gpu.take().is_some() {
            self.pass = ParticlePass::new();
            self.textures.clear();
            log::debug!("particle renderer released");
        }
    }
}
