//! Color model for particle tints and CPU-painted atlas cells.

mod color;
mod palette;

pub use color::{ColorParseError, Rgb};
pub use palette::{DEFAULT_PALETTE, Palette};
