use rand::Rng;

use crate::atlas::UvRect;
use crate::paint::Palette;

use super::{Particle, ParticleBuffers};

/// Generates `count` particles.
///
/// Positions are uniform over the volume of the open unit ball. Each particle
/// takes a color from `palette` and, when `cells` is non-empty, one of the
/// atlas rectangles; otherwise it samples the whole texture.
pub fn generate<R: Rng + ?Sized>(
    count: usize,
    palette: &Palette,
    cells: &[UvRect],
    rng: &mut R,
) -> ParticleBuffers {
    let particles = (0..count)
        .map(|_| {
            let position = sample_in_unit_ball(rng);
            let random = [rng.random(), rng.random(), rng.random(), rng.random()];
            let color = palette.pick(rng).to_array();
            let bounds = if cells.is_empty() {
                UvRect::FULL
            } else {
                cells[rng.random_range(0..cells.len())]
            };

            Particle {
                position,
                random,
                color,
                uv: [0.5, 0.5],
                uv_bounds: bounds.to_array(),
            }
        })
        .collect();

    ParticleBuffers::new(particles)
}

/// Uniform sample from the interior of the unit ball (`|p| < 1`).
///
/// The direction comes from a rejection-sampled cube point, the radius from
/// the cube root of a uniform so density is constant per unit volume.
pub fn sample_in_unit_ball<R: Rng + ?Sized>(rng: &mut R) -> [f32; 3] {
    loop {
        let x: f32 = rng.random_range(-1.0..1.0);
        let y: f32 = rng.random_range(-1.0..1.0);
        let z: f32 = rng.random_range(-1.0..1.0);
        let len_sq = x * x + y * y + z * z;
        if len_sq == 0.0 || len_sq > 1.0 {
            continue;
        }

        let r = rng.random::<f32>().cbrt() / len_sq.sqrt();
        let p = [x * r, y * r, z * r];

        // Rounding can land exactly on the shell.
        if p.iter().map(|c| c * c).sum::<f32>() < 1.0 {
            return p;
        }
    }
}
