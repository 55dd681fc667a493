use bytemuck::{Pod, Zeroable};

/// Per-particle vertex attributes, uploaded as one instance record.
///
/// Layout (64 bytes):
///
///  offset  0  position   [f32; 3]   loc 1
///  offset 12  random     [f32; 4]   loc 2
///  offset 28  color      [f32; 3]   loc 3
///  offset 40  uv         [f32; 2]   loc 4
///  offset 48  uv_bounds  [f32; 4]   loc 5
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Particle {
    /// Rest position inside the unit ball.
    pub position: [f32; 3],
    /// Four independent uniforms in `[0, 1)` driving oscillation and size.
    pub random: [f32; 4],
    pub color: [f32; 3],
    /// Sprite-local texture coordinate; unused by the shader beyond layout.
    pub uv: [f32; 2],
    /// Atlas rectangle `(u1, v1, u2, v2)` this particle samples from.
    pub uv_bounds: [f32; 4],
}

impl Particle {
    pub const ATTRS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        1 => Float32x3, // position
        2 => Float32x4, // random
        3 => Float32x3, // color
        4 => Float32x2, // uv
        5 => Float32x4  // uv_bounds
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Particle>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

/// Generated particle field, ready for upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleBuffers {
    particles: Vec<Particle>,
}

impl ParticleBuffers {
    pub fn new(particles: Vec<Particle>) -> Self {
        Self { particles }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    /// Raw bytes for `Queue::write_buffer`.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.particles)
    }
}
