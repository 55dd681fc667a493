//! Font loading and glyph rasterization for synthesized atlas cells.

mod font_system;

pub use font_system::{Coverage, FontId, FontLoadError, FontSystem};
