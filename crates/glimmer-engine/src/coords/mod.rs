//! Coordinate helpers shared by the runtime, the engine and the renderer.
//!
//! Host space:
//! - Physical pixels
//! - Origin top-left
//! - +X right, +Y down
//!
//! The particle shader works in NDC; `Viewport` converts between the two.

mod viewport;

pub use viewport::Viewport;
