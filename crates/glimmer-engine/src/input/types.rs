/// Pointer position in physical pixels, top-left origin, +Y down.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointerMoveEvent {
    pub x: f32,
    pub y: f32,
}

/// Platform-agnostic window events the particle engine listens to.
///
/// Runtime translates window system events into these.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InputEvent {
    PointerMoved(PointerMoveEvent),

    /// New drawable size in physical pixels.
    Resized { width: u32, height: u32 },
}
