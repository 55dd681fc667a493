use winit::event::WindowEvent;
use winit::window::Window;

use crate::input::{InputEvent, PointerMoveEvent};

/// Translates a winit `WindowEvent` into an engine `InputEvent`.
///
/// Returns `None` for events not represented by the input subsystem.
/// Positions stay in physical pixels, the same basis as the drawable size.
pub fn translate_window_event(window: &Window, event: &WindowEvent) -> Option<InputEvent> {
    match event {
        WindowEvent::CursorMoved { position, .. } => Some(InputEvent::PointerMoved(PointerMoveEvent {
            x: position.x as f32,
            y: position.y as f32,
        })),

        WindowEvent::Resized(size) => Some(InputEvent::Resized {
            width: size.width,
            height: size.height,
        }),

        // The new inner size is not carried by the event itself.
        WindowEvent::ScaleFactorChanged { .. } => {
            let size = window.inner_size();
            Some(InputEvent::Resized {
                width: size.width,
                height: size.height,
            })
        }

        _ => None,
    }
}
