//! Particle engine lifecycle and frame loop.
//!
//! The engine is platform-agnostic: the host, the frame timer and the GPU
//! layer are all traits, so the window runtime and the tests drive the same
//! state machine.

mod animation;
mod config;
mod host;
mod lifecycle;
mod scheduler;

pub use animation::{LoopState, Motion, MotionParams};
pub use config::{ConfigError, ParticlesConfig, max_particles};
pub use host::Host;
pub use lifecycle::{Listeners, MountError, ParticleEngine, Phase};
pub use scheduler::{FrameRequest, FrameScheduler};
