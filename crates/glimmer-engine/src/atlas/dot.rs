use image::{GrayImage, Luma, RgbaImage};

use crate::paint::Rgb;

use super::glyph::glow;

/// Side of the plain-dot texture.
pub const DOT_SIZE: u32 = 64;

/// White glowing disc used when logos are off or the atlas build failed.
///
/// Matches a `●` glyph filled at 0.6 em with a `shadowBlur` of a tenth of the
/// image side. Particles sample it through [`UvRect::FULL`](super::UvRect::FULL).
pub fn dot_texture() -> RgbaImage {
    dot_texture_sized(DOT_SIZE)
}

pub fn dot_texture_sized(size: u32) -> RgbaImage {
    let s = size as f32;
    let center = s / 2.0;
    let radius = s * 0.18;

    // One pixel of linear falloff for an antialiased rim.
    let mask = GrayImage::from_fn(size, size, |x, y| {
        let dx = x as f32 + 0.5 - center;
        let dy = y as f32 + 0.5 - center;
        let d = (dx * dx + dy * dy).sqrt();
        let cov = (radius + 0.5 - d).clamp(0.0, 1.0);
        Luma([(cov * 255.0).round() as u8])
    });

    glow(&mask, Rgb::WHITE, s * 0.1)
}
