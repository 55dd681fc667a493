//! Glimmer engine crate.
//!
//! An animated field of GPU point-sprite particles textured from a small
//! symbol atlas. This crate owns the platform + GPU runtime pieces and the
//! particle engine itself; `glimmer-studio` is a thin binary on top.

pub mod device;
pub mod window;
pub mod input;
pub mod time;

pub mod logging;
pub mod coords;
pub mod render;
pub mod paint;
pub mod text;

pub mod atlas;
pub mod field;
pub mod engine;
