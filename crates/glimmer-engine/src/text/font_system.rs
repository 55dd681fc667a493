use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use thiserror::Error;

/// Error returned by [`FontSystem::load_font`].
#[derive(Debug, Clone, Error)]
#[error("font load error: {0}")]
pub struct FontLoadError(pub String);

/// Opaque handle to a font loaded into a [`FontSystem`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FontId(pub(crate) usize);

/// Well-known locations probed when no font bytes are configured.
const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
    "/Library/Fonts/Arial Unicode.ttf",
    "C:\\Windows\\Fonts\\seguisym.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// 8-bit coverage mask of a laid-out line of text.
#[derive(Debug, Clone)]
pub struct Coverage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Coverage {
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&a| a == 0)
    }
}

/// Owns a collection of loaded fonts.
///
/// Fonts are immutable after loading. The atlas builder rasterizes fallback
/// glyphs through this system when an icon image cannot be loaded.
pub struct FontSystem {
    fonts: Vec<fontdue::Font>,
}

impl FontSystem {
    pub fn new() -> Self {
        Self { fonts: Vec::new() }
    }

    /// Parses and stores a TrueType or OpenType font from raw bytes.
    pub fn load_font(&mut self, bytes: &[u8]) -> Result<FontId, FontLoadError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| FontLoadError(e.to_string()))?;
        let id = FontId(self.fonts.len());
        self.fonts.push(font);
        Ok(id)
    }

    /// Loads the first readable font from the platform's usual locations.
    pub fn load_system_fallback(&mut self) -> Result<FontId, FontLoadError> {
        for path in SYSTEM_FONT_PATHS {
            let Ok(bytes) = std::fs::read(path) else { continue };
            match self.load_font(&bytes) {
                Ok(id) => {
                    log::debug!("loaded fallback font {path}");
                    return Ok(id);
                }
                Err(e) => log::debug!("skipping {path}: {e}"),
            }
        }
        Err(FontLoadError("no system font found".to_string()))
    }

    /// Returns a reference to the underlying `fontdue::Font`, if `id` is valid.
    pub(crate) fn get(&self, id: FontId) -> Option<&fontdue::Font> {
        self.fonts.get(id.0)
    }

    /// Rasterizes `text` on one line at `px` and centers it in a
    /// `size` × `size` mask.
    ///
    /// The ink bounding box (not the advance box) is centered, which matches
    /// how a centered, middle-baseline canvas `fillText` looks for short
    /// symbols. Ink falling outside the mask is clipped.
    pub fn rasterize_centered(&self, id: FontId, text: &str, px: f32, size: u32) -> Option<Coverage> {
        let font = self.get(id)?;

        let mut layout: Layout<()> = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings::default());
        layout.append(&[font], &TextStyle::new(text, px, 0));

        let glyphs: Vec<_> = layout
            .glyphs()
            .iter()
            .filter(|g| g.char_data.rasterize() && g.width > 0 && g.height > 0)
            .copied()
            .collect();

        let mut mask = Coverage {
            width: size,
            height: size,
            data: vec![0; (size * size) as usize],
        };

        if glyphs.is_empty() {
            return Some(mask);
        }

        let min_x = glyphs.iter().map(|g| g.x).fold(f32::MAX, f32::min);
        let min_y = glyphs.iter().map(|g| g.y).fold(f32::MAX, f32::min);
        let max_x = glyphs.iter().map(|g| g.x + g.width as f32).fold(f32::MIN, f32::max);
        let max_y = glyphs.iter().map(|g| g.y + g.height as f32).fold(f32::MIN, f32::max);

        let half = size as f32 / 2.0;
        let dx = (half - (max_x - min_x) / 2.0 - min_x).round() as i64;
        let dy = (half - (max_y - min_y) / 2.0 - min_y).round() as i64;

        for g in &glyphs {
            let (metrics, bitmap) = font.rasterize_config(g.key);
            let ox = g.x.round() as i64 + dx;
            let oy = g.y.round() as i64 + dy;

            for row in 0..metrics.height {
                for col in 0..metrics.width {
                    let x = ox + col as i64;
                    let y = oy + row as i64;
                    if x < 0 || y < 0 || x >= size as i64 || y >= size as i64 {
                        continue;
                    }
                    let dst = (y as u32 * size + x as u32) as usize;
                    let src = bitmap[row * metrics.width + col];
                    mask.data[dst] = mask.data[dst].max(src);
                }
            }
        }

        Some(mask)
    }
}

impl Default for FontSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_fail_to_load() {
        let mut fs = FontSystem::new();
        assert!(fs.load_font(b"definitely not a font").is_err());
    }

    #[test]
    fn unknown_font_id_rasterizes_nothing() {
        let fs = FontSystem::new();
        assert!(fs.rasterize_centered(FontId(3), "TS", 76.8, 128).is_none());
    }

    fn ink_bounds(mask: &Coverage) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (i, &a) in mask.data.iter().enumerate() {
            if a == 0 {
                continue;
            }
            let (x, y) = (i as u32 % mask.width, i as u32 / mask.width);
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
        bounds
    }

    #[test]
    fn system_font_ink_is_centred() {
        let mut fs = FontSystem::new();
        let Ok(id) = fs.load_system_fallback() else {
            eprintln!("no system font; skipping");
            return;
        };

        let mask = fs.rasterize_centered(id, "TS", 76.8, 128).unwrap();
        assert_eq!(mask.data.len(), 128 * 128);
        let (x0, y0, x1, y1) = ink_bounds(&mask).expect("ink");

        let cx = (x0 + x1 + 1) as f32 / 2.0;
        let cy = (y0 + y1 + 1) as f32 / 2.0;
        assert!((cx - 64.0).abs() <= 2.0, "ink centre x {cx}");
        assert!((cy - 64.0).abs() <= 2.0, "ink centre y {cy}");
    }

    #[test]
    fn oversized_text_is_clipped_to_the_mask() {
        let mut fs = FontSystem::new();
        let Ok(id) = fs.load_system_fallback() else {
            eprintln!("no system font; skipping");
            return;
        };

        let mask = fs.rasterize_centered(id, "III", 200.0, 32).unwrap();
        assert_eq!((mask.width, mask.height), (32, 32));
        assert_eq!(mask.data.len(), 32 * 32);
        assert!(!mask.is_blank());
    }

    #[test]
    fn whitespace_rasterizes_blank() {
        let mut fs = FontSystem::new();
        let Ok(id) = fs.load_system_fallback() else {
            eprintln!("no system font; skipping");
            return;
        };

        assert!(fs.rasterize_centered(id, " ", 76.8, 128).unwrap().is_blank());
    }

    #[test]
    fn blank_coverage_detects_empty_mask() {
        let mask = Coverage { width: 2, height: 2, data: vec![0; 4] };
        assert!(mask.is_blank());
        let mask = Coverage { width: 2, height: 2, data: vec![0, 0, 9, 0] };
        assert!(!mask.is_blank());
    }
}
