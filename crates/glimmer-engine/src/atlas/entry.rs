use std::collections::HashMap;
use std::path::PathBuf;

use image::RgbaImage;

use crate::paint::Rgb;

use super::UvRect;

/// One symbol to pack into the atlas.
///
/// `icon` is an image file (PNG, JPEG or SVG). When it is absent or fails to
/// load, `symbol` is drawn in `color` with a glow instead.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasEntry {
    pub name: String,
    pub symbol: String,
    pub color: Rgb,
    pub icon: Option<PathBuf>,
}

impl AtlasEntry {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, color: Rgb) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            color,
            icon: None,
        }
    }

    pub fn with_icon(mut self, path: impl Into<PathBuf>) -> Self {
        self.icon = Some(path.into());
        self
    }

    /// The two symbols the particle field ships with.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("React", "⚛", Rgb::from_u8(0x61, 0xda, 0xfb))
                .with_icon("icons/react-original.svg"),
            Self::new("TypeScript", "TS", Rgb::from_u8(0x31, 0x78, 0xc6))
                .with_icon("icons/typescript-original.svg"),
        ]
    }
}

/// A packed cell of the atlas.
#[derive(Debug, Clone, PartialEq)]
pub struct AtlasCell {
    pub name: String,
    pub uv: UvRect,
    /// The cell holds a synthesized glyph rather than the entry's icon.
    pub synthesized: bool,
}

/// Result of an atlas build: one square RGBA image plus a rectangle per entry.
///
/// The image is meant to be sampled with linear filtering, clamp-to-edge
/// addressing and no mipmaps; cells are packed tightly enough that mip levels
/// or repeat addressing would bleed neighbours into each other.
#[derive(Debug, Clone)]
pub struct Atlas {
    pub image: RgbaImage,
    cells: Vec<AtlasCell>,
    uv_by_key: HashMap<String, UvRect>,
}

impl Atlas {
    pub(crate) fn new(image: RgbaImage, cells: Vec<AtlasCell>) -> Self {
        let uv_by_key = cells.iter().map(|c| (c.name.clone(), c.uv)).collect();
        Self { image, cells, uv_by_key }
    }

    /// Cells in entry order.
    pub fn cells(&self) -> &[AtlasCell] {
        &self.cells
    }

    /// Rectangles in entry order, as consumed by the field generator.
    pub fn rects(&self) -> Vec<UvRect> {
        self.cells.iter().map(|c| c.uv).collect()
    }

    pub fn uv(&self, name: &str) -> Option<UvRect> {
        self.uv_by_key.get(name).copied()
    }

    pub fn size(&self) -> u32 {
        self.image.width()
    }
}
