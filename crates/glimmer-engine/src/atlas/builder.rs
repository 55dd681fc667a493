use std::sync::Arc;

use futures::future::join_all;
use image::{RgbaImage, imageops};
use thiserror::Error;

use super::entry::{Atlas, AtlasCell, AtlasEntry};
use super::glyph::GlyphSynth;
use super::source::{IconLoader, ImageSource};
use super::uv::UvRect;

/// Margin kept transparent around every cell.
pub const ATLAS_PADDING: u32 = 10;

/// Error surfaced by [`build_atlas`]. Callers fall back to the plain-dot texture.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AtlasBuildError {
    #[error("no font available to synthesize a glyph")]
    NoFont,
    #[error("font has no ink for symbol `{0}`")]
    EmptyGlyph(String),
    #[error("atlas of {atlas_size}px cannot hold {entries} entries")]
    InvalidSize { atlas_size: u32, entries: usize },
}

/// Square grid the entries are packed into, row-major.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AtlasLayout {
    pub cols: u32,
    pub cell: u32,
    pub padding: u32,
    pub size: u32,
}

impl AtlasLayout {
    pub fn new(entries: usize, atlas_size: u32) -> Result<Self, AtlasBuildError> {
        let invalid = AtlasBuildError::InvalidSize { atlas_size, entries };
        if entries == 0 {
            return Err(invalid);
        }

        let cols = (entries as f64).sqrt().ceil() as u32;
        let cell = atlas_size / cols;
        if cell <= 2 * ATLAS_PADDING {
            return Err(invalid);
        }

        Ok(Self { cols, cell, padding: ATLAS_PADDING, size: atlas_size })
    }

    /// Drawable side of a cell once the padding is removed.
    #[inline]
    pub fn inner(&self) -> u32 {
        self.cell - 2 * self.padding
    }

    /// Top-left pixel of the drawable area of entry `i`.
    pub fn slot(&self, i: usize) -> (u32, u32) {
        let i = i as u32;
        let col = i % self.cols;
        let row = i / self.cols;
        (col * self.cell + self.padding, row * self.cell + self.padding)
    }

    pub fn uv(&self, i: usize) -> UvRect {
        let (x, y) = self.slot(i);
        UvRect::from_pixels(x, y, self.inner(), self.size)
    }
}

/// Packs `entries` into one `atlas_size` × `atlas_size` image.
///
/// Every icon load is issued before any is awaited, and compositing starts
/// only once all of them have settled. An icon that fails is replaced by a
/// glyph from `glyphs`; if there is no synthesizer or it fails too, the whole
/// build fails.
pub async fn build_atlas(
    entries: &[AtlasEntry],
    atlas_size: u32,
    loader: &dyn IconLoader,
    glyphs: Option<&dyn GlyphSynth>,
) -> Result<Atlas, AtlasBuildError> {
    let layout = AtlasLayout::new(entries.len(), atlas_size)?;

    let pending: Vec<_> = entries
        .iter()
        .map(|e| e.icon.as_deref().map(|path| loader.load(path)))
        .collect();

    let loads = join_all(pending.into_iter().map(|load| async move {
        match load {
            Some(fut) => Some(fut.await),
            None => None,
        }
    }))
    .await;

    let mut sources = Vec::with_capacity(entries.len());
    for (entry, load) in entries.iter().zip(loads) {
        let source = match load {
            Some(Ok(img)) => ImageSource::Loaded(img),
            Some(Err(e)) => {
                log::warn!("icon for {} failed to load ({e}); drawing `{}`", entry.name, entry.symbol);
                ImageSource::Synthesized(synthesize(entry, glyphs)?)
            }
            None => ImageSource::Synthesized(synthesize(entry, glyphs)?),
        };
        sources.push(source);
    }

    Ok(composite(entries, &sources, layout))
}

fn synthesize(entry: &AtlasEntry, glyphs: Option<&dyn GlyphSynth>) -> Result<RgbaImage, AtlasBuildError> {
    glyphs
        .ok_or(AtlasBuildError::NoFont)?
        .synthesize(&entry.symbol, entry.color)
}

fn composite(entries: &[AtlasEntry], sources: &[ImageSource], layout: AtlasLayout) -> Atlas {
    let mut image = RgbaImage::new(layout.size, layout.size);
    let inner = layout.inner();

    let cells = entries
        .iter()
        .zip(sources)
        .enumerate()
        .map(|(i, (entry, source))| {
            let (x, y) = layout.slot(i);
            let scaled = imageops::resize(source.image(), inner, inner, imageops::FilterType::Triangle);
            imageops::overlay(&mut image, &scaled, x as i64, y as i64);

            AtlasCell {
                name: entry.name.clone(),
                uv: layout.uv(i),
                synthesized: source.is_synthesized(),
            }
        })
        .collect();

    Atlas::new(image, cells)
}

/// An atlas build detached from the engine that requested it.
///
/// The runtime drives it on a worker thread and hands the result back to the
/// event loop; the engine may be gone by then.
#[derive(Clone)]
pub struct AtlasJob {
    pub entries: Vec<AtlasEntry>,
    pub size: u32,
    pub loader: Arc<dyn IconLoader>,
    pub glyphs: Option<Arc<dyn GlyphSynth>>,
}

impl AtlasJob {
    pub async fn build(&self) -> Result<Atlas, AtlasBuildError> {
        build_atlas(&self.entries, self.size, self.loader.as_ref(), self.glyphs.as_deref()).await
    }

    pub fn run_blocking(&self) -> Result<Atlas, AtlasBuildError> {
        pollster::block_on(self.build())
    }
}

impl std::fmt::Debug for AtlasJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasJob")
            .field("entries", &self.entries.len())
            .field("size", &self.size)
            .field("glyphs", &self.glyphs.is_some())
            .finish()
    }
}
