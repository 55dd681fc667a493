//! Procedural particle attributes.

mod generator;
mod particle;

pub use generator::{generate, sample_in_unit_ball};
pub use particle::{Particle, ParticleBuffers};
