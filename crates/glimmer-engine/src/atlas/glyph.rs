use image::{GrayImage, RgbaImage, imageops};

use crate::paint::Rgb;
use crate::text::{FontId, FontLoadError, FontSystem};

use super::AtlasBuildError;

/// Side of a synthesized glyph image, in pixels.
pub const GLYPH_SIZE: u32 = 128;
/// Glyph em size relative to the image side.
pub const GLYPH_FONT_SCALE: f32 = 0.6;
/// Glow radius in the canvas `shadowBlur` sense; the gaussian sigma is half.
pub const GLYPH_SHADOW_BLUR: f32 = 12.0;

/// Draws a stand-in image for an entry whose icon could not be loaded.
pub trait GlyphSynth: Send + Sync {
    fn synthesize(&self, symbol: &str, color: Rgb) -> Result<RgbaImage, AtlasBuildError>;
}

/// Renders symbols as a colored glyph with a same-colored glow.
pub struct GlowGlyphs {
    fonts: FontSystem,
    font: FontId,
    size: u32,
    shadow_blur: f32,
}

impl GlowGlyphs {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FontLoadError> {
        let mut fonts = FontSystem::new();
        let font = fonts.load_font(bytes)?;
        Ok(Self::with_font(fonts, font))
    }

    pub fn from_system() -> Result<Self, FontLoadError> {
        let mut fonts = FontSystem::new();
        let font = fonts.load_system_fallback()?;
        Ok(Self::with_font(fonts, font))
    }

    fn with_font(fonts: FontSystem, font: FontId) -> Self {
        Self {
            fonts,
            font,
            size: GLYPH_SIZE,
            shadow_blur: GLYPH_SHADOW_BLUR,
        }
    }
}

impl GlyphSynth for GlowGlyphs {
    fn synthesize(&self, symbol: &str, color: Rgb) -> Result<RgbaImage, AtlasBuildError> {
        let px = self.size as f32 * GLYPH_FONT_SCALE;
        let coverage = self
            .fonts
            .rasterize_centered(self.font, symbol, px, self.size)
            .ok_or(AtlasBuildError::NoFont)?;

        // A font without the symbol lays out nothing; a blank cell is a failure.
        if coverage.is_blank() {
            return Err(AtlasBuildError::EmptyGlyph(symbol.to_string()));
        }

        let mask = GrayImage::from_raw(coverage.width, coverage.height, coverage.data)
            .ok_or_else(|| AtlasBuildError::EmptyGlyph(symbol.to_string()))?;

        Ok(glow(&mask, color, self.shadow_blur))
    }
}

/// Fills `mask` with `color` over a blurred copy of itself.
///
/// Equivalent to a canvas fill with `shadowColor == fillStyle`: the shadow is
/// the mask blurred with sigma `shadow_blur / 2`, composited source-over
/// beneath the fill. Both layers share one color so only alpha combines.
pub(crate) fn glow(mask: &GrayImage, color: Rgb, shadow_blur: f32) -> RgbaImage {
    let shadow = if shadow_blur > 0.0 {
        imageops::blur(mask, shadow_blur / 2.0)
    } else {
        mask.clone()
    };

    RgbaImage::from_fn(mask.width(), mask.height(), |x, y| {
        let fill = mask.get_pixel(x, y).0[0] as f32 / 255.0;
        let under = shadow.get_pixel(x, y).0[0] as f32 / 255.0;
        let a = fill + under * (1.0 - fill);
        color.to_rgba8((a * 255.0).round() as u8)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glow_spreads_past_the_mask() {
        let mask = GrayImage::from_fn(32, 32, |x, y| {
            let inside = (12..20).contains(&x) && (12..20).contains(&y);
            image::Luma([if inside { 255 } else { 0 }])
        });

        let img = glow(&mask, Rgb::from_u8(0x61, 0xda, 0xfb), 6.0);

        assert_eq!(img.get_pixel(16, 16).0, [0x61, 0xda, 0xfb, 255]);
        let halo = img.get_pixel(10, 16).0[3];
        assert!(halo > 0 && halo < 255, "halo alpha {halo}");
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn system_font_glyph_is_centred_with_clear_corners() {
        let Ok(glyphs) = GlowGlyphs::from_system() else {
            eprintln!("no system font; skipping");
            return;
        };

        let img = glyphs.synthesize("TS", Rgb::from_u8(0x31, 0x78, 0xc6)).unwrap();
        assert_eq!(img.dimensions(), (GLYPH_SIZE, GLYPH_SIZE));

        let (mut sum, mut sx, mut sy) = (0.0f64, 0.0f64, 0.0f64);
        for (x, y, p) in img.enumerate_pixels() {
            let a = p.0[3] as f64;
            sum += a;
            sx += a * x as f64;
            sy += a * y as f64;
        }
        assert!(sum > 0.0, "glyph is blank");

        let half = GLYPH_SIZE as f64 / 2.0;
        let (cx, cy) = (sx / sum, sy / sum);
        assert!((cx - half).abs() < 12.0, "centroid x {cx}");
        assert!((cy - half).abs() < 12.0, "centroid y {cy}");

        let last = GLYPH_SIZE - 1;
        for (x, y) in [(0, 0), (last, 0), (0, last), (last, last)] {
            assert_eq!(img.get_pixel(x, y).0[3], 0, "corner ({x}, {y})");
        }
        assert_eq!(&img.get_pixel(64, 64).0[..3], &[0x31, 0x78, 0xc6]);
    }

    #[test]
    fn zero_blur_keeps_hard_edges() {
        let mask = GrayImage::from_fn(4, 1, |x, _| image::Luma([if x < 2 { 255 } else { 0 }]));
        let img = glow(&mask, Rgb::WHITE, 0.0);
        assert_eq!(img.get_pixel(1, 0).0[3], 255);
        assert_eq!(img.get_pixel(2, 0).0[3], 0);
    }
}
