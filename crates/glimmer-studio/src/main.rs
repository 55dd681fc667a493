use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use glimmer_engine::device::GpuInit;
use glimmer_engine::engine::ParticlesConfig;
use glimmer_engine::logging::{LoggingConfig, init_logging};
use glimmer_engine::window::{Runtime, RuntimeConfig};
use winit::dpi::LogicalSize;

#[derive(Parser, Debug)]
#[command(about = "Animated particle field with a symbol atlas", version)]
struct Args {
    /// Number of particles
    #[arg(long, default_value_t = 200)]
    count: usize,

    /// Scale applied to particle rest positions
    #[arg(long, default_value_t = 10.0)]
    spread: f32,

    /// Animation and spin speed multiplier
    #[arg(long, default_value_t = 0.1)]
    speed: f32,

    /// Tint color as hex (repeatable); defaults to white
    #[arg(long = "color")]
    colors: Vec<String>,

    /// Push the field away from the cursor by this factor
    #[arg(long)]
    hover: Option<f32>,

    /// Soft-edged particles instead of hard discs
    #[arg(long)]
    alpha: bool,

    /// Base sprite size in pixels
    #[arg(long, default_value_t = 100.0)]
    base_size: f32,

    /// Per-particle size variation; 0 gives every sprite the base size
    #[arg(long, default_value_t = 1.0)]
    size_randomness: f32,

    #[arg(long, default_value_t = 20.0)]
    camera_distance: f32,

    /// Keep the field from tilting and spinning
    #[arg(long)]
    no_rotation: bool,

    /// Plain dots instead of symbol icons
    #[arg(long)]
    no_logos: bool,

    /// Directory holding the symbol icons
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/icons"))]
    icon_dir: PathBuf,

    /// Font for symbols whose icon cannot be loaded
    #[arg(long)]
    font: Option<PathBuf>,

    /// Seed for a reproducible field
    #[arg(long)]
    seed: Option<u64>,

    /// Opaque window background
    #[arg(long)]
    opaque: bool,
}

impl Args {
    fn particles(&self) -> Result<ParticlesConfig> {
        let mut config = ParticlesConfig {
            particle_count: self.count,
            particle_spread: self.spread,
            speed: self.speed,
            alpha_particles: self.alpha,
            particle_base_size: self.base_size,
            size_randomness: self.size_randomness,
            camera_distance: self.camera_distance,
            disable_rotation: self.no_rotation,
            show_logos: !self.no_logos,
            seed: self.seed,
            ..Default::default()
        };

        if !self.colors.is_empty() {
            config = config.with_colors(self.colors.iter().cloned());
        }
        if let Some(factor) = self.hover {
            config = config.with_hover(factor);
        }

        for entry in &mut config.icons {
            if let Some(icon) = entry.icon.as_mut() {
                *icon = self.icon_dir.join(icon.file_name().unwrap_or_default());
            }
        }

        if let Some(path) = &self.font {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read font {}", path.display()))?;
            config.fallback_font = Some(bytes);
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let args = Args::parse();
    let particles = args.particles()?;

    let runtime = RuntimeConfig {
        title: "glimmer".to_string(),
        initial_size: LogicalSize::new(960.0, 640.0),
        transparent: !args.opaque,
    };

    log::info!("starting glimmer studio");
    Runtime::run(runtime, GpuInit::default(), particles)
}
