//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, mounts one particle engine into the
//! window and forwards the events it listens to.

mod host;
mod runtime;

pub use host::{RedrawScheduler, WindowHost};
pub use runtime::{Runtime, RuntimeConfig, RuntimeEvent};
