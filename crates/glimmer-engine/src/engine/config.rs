use thiserror::Error;

use crate::atlas::AtlasEntry;
use crate::device::GpuInit;
use crate::field::Particle;
use crate::paint::Palette;

/// Rejected configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("`{0}` must be a finite number")]
    NonFinite(&'static str),
    #[error("atlas size must be non-zero")]
    ZeroAtlasSize,
    #[error("atlas size {size} exceeds the GPU texture limit of {max}")]
    AtlasTooLarge { size: u32, max: u32 },
    #[error("{count} particles exceed the GPU buffer limit of {max}")]
    TooManyParticles { count: usize, max: usize },
}

/// Options of one particle field.
///
/// All fields are public; the `with_*` setters exist for chaining from
/// `ParticlesConfig::default()`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticlesConfig {
    pub particle_count: usize,
    /// Scales rest positions before animation; depth is stretched a further 10×.
    pub particle_spread: f32,
    /// Scales animation time and spin rate.
    pub speed: f32,
    /// Hex tint colors. `None` uses the default palette.
    pub particle_colors: Option<Vec<String>>,
    pub move_particles_on_hover: bool,
    pub particle_hover_factor: f32,
    /// Soft circular falloff instead of hard-edged discs.
    pub alpha_particles: bool,
    pub particle_base_size: f32,
    pub size_randomness: f32,
    pub camera_distance: f32,
    pub disable_rotation: bool,
    /// Texture particles with the symbol atlas rather than a plain dot.
    pub show_logos: bool,

    pub atlas_size: u32,
    pub icons: Vec<AtlasEntry>,
    /// Fixed seed for the field generator; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Font used to draw symbols whose icon fails to load.
    pub fallback_font: Option<Vec<u8>>,
}

impl Default for ParticlesConfig {
    fn default() -> Self {
        Self {
            particle_count: 200,
            particle_spread: 10.0,
            speed: 0.1,
            particle_colors: None,
            move_particles_on_hover: false,
            particle_hover_factor: 1.0,
            alpha_particles: false,
            particle_base_size: 100.0,
            size_randomness: 1.0,
            camera_distance: 20.0,
            disable_rotation: false,
            show_logos: true,
            atlas_size: 512,
            icons: AtlasEntry::defaults(),
            seed: None,
            fallback_font: None,
        }
    }
}

impl ParticlesConfig {
    pub fn with_count(mut self, count: usize) -> Self {
        self.particle_count = count;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_colors<S: Into<String>>(mut self, colors: impl IntoIterator<Item = S>) -> Self {
        self.particle_colors = Some(colors.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_hover(mut self, factor: f32) -> Self {
        self.move_particles_on_hover = true;
        self.particle_hover_factor = factor;
        self
    }

    pub fn with_alpha_particles(mut self, on: bool) -> Self {
        self.alpha_particles = on;
        self
    }

    pub fn with_rotation(mut self, on: bool) -> Self {
        self.disable_rotation = !on;
        self
    }

    pub fn with_logos(mut self, on: bool) -> Self {
        self.show_logos = on;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn palette(&self) -> Palette {
        match &self.particle_colors {
            Some(colors) => Palette::from_hex(colors.as_slice()),
            None => Palette::default(),
        }
    }

    /// Checks values against the limits the default [`GpuInit`] requests.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_for(&GpuInit::default().required_limits)
    }

    pub fn validate_for(&self, limits: &wgpu::Limits) -> Result<(), ConfigError> {
        let floats = [
            ("particle_spread", self.particle_spread),
            ("speed", self.speed),
            ("particle_hover_factor", self.particle_hover_factor),
            ("particle_base_size", self.particle_base_size),
            ("size_randomness", self.size_randomness),
            ("camera_distance", self.camera_distance),
        ];
        if let Some(&(name, _)) = floats.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::NonFinite(name));
        }
        if self.atlas_size == 0 {
            return Err(ConfigError::ZeroAtlasSize);
        }
        let max = limits.max_texture_dimension_2d;
        if self.atlas_size > max {
            return Err(ConfigError::AtlasTooLarge { size: self.atlas_size, max });
        }
        let max = max_particles(limits);
        if self.particle_count > max {
            return Err(ConfigError::TooManyParticles { count: self.particle_count, max });
        }
        Ok(())
    }
}

/// Largest field whose instance buffer fits in `limits.max_buffer_size`.
pub fn max_particles(limits: &wgpu::Limits) -> usize {
    let per_buffer = limits.max_buffer_size / std::mem::size_of::<Particle>() as u64;
    usize::try_from(per_buffer).unwrap_or(usize::MAX).min(u32::MAX as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ParticlesConfig::default();
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(cfg.particle_count, 200);
        assert_eq!(cfg.icons.len(), 2);
    }

    #[test]
    fn zero_particles_is_allowed() {
        assert!(ParticlesConfig::default().with_count(0).validate().is_ok());
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let cfg = ParticlesConfig::default().with_speed(f32::NAN);
        assert_eq!(cfg.validate(), Err(ConfigError::NonFinite("speed")));

        let cfg = ParticlesConfig { camera_distance: f32::INFINITY, ..Default::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::NonFinite("camera_distance")));
    }

    #[test]
    fn atlas_above_texture_limit_is_rejected() {
        let cfg = ParticlesConfig { atlas_size: 4096, ..Default::default() };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::AtlasTooLarge { size: 4096, max: 2048 })
        );

        let cfg = ParticlesConfig { atlas_size: 2048, ..Default::default() };
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn field_above_buffer_limit_is_rejected() {
        // 256 MiB of 64-byte instances.
        let max = 4 * 1024 * 1024;
        assert_eq!(max_particles(&wgpu::Limits::downlevel_webgl2_defaults()), max);

        let cfg = ParticlesConfig::default().with_count(5_000_000);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::TooManyParticles { count: 5_000_000, max })
        );
        assert_eq!(ParticlesConfig::default().with_count(max).validate(), Ok(()));
    }

    #[test]
    fn larger_device_limits_admit_larger_atlases() {
        let cfg = ParticlesConfig { atlas_size: 4096, ..Default::default() };
        assert_eq!(cfg.validate_for(&wgpu::Limits::default()), Ok(()));
    }

    #[test]
    fn colors_override_palette() {
        let cfg = ParticlesConfig::default().with_colors(["#ff0000"]);
        assert_eq!(cfg.palette().colors().len(), 1);
    }
}
