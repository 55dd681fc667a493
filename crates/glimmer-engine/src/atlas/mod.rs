//! Texture atlas packing for particle symbols.

mod builder;
mod dot;
mod entry;
mod glyph;
mod source;
mod uv;

pub use builder::{ATLAS_PADDING, AtlasBuildError, AtlasJob, AtlasLayout, build_atlas};
pub use dot::{DOT_SIZE, dot_texture, dot_texture_sized};
pub use entry::{Atlas, AtlasCell, AtlasEntry};
pub use glyph::{GLYPH_FONT_SCALE, GLYPH_SHADOW_BLUR, GLYPH_SIZE, GlowGlyphs, GlyphSynth};
pub use source::{AssetLoadError, FileIconLoader, IconLoader, ImageSource, rasterize_svg};
pub use uv::UvRect;
