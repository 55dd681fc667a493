use std::sync::Arc;

use winit::window::Window;

use crate::engine::{FrameRequest, FrameScheduler, Host};

/// [`Host`] backed by a winit window.
pub struct WindowHost(pub Arc<Window>);

impl Host for WindowHost {
    fn client_size(&self) -> (u32, u32) {
        let size = self.0.inner_size();
        (size.width, size.height)
    }
}

/// Frame timer built on `Window::request_redraw`.
///
/// At most one request is outstanding. The runtime claims it with
/// [`take_due`](Self::take_due) when the redraw arrives; a cancelled request
/// is never handed out.
pub struct RedrawScheduler {
    window: Arc<Window>,
    next: u64,
    pending: Option<FrameRequest>,
}

impl RedrawScheduler {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            next: 0,
            pending: None,
        }
    }

    pub fn take_due(&mut self) -> Option<FrameRequest> {
        self.pending.take()
    }
}

impl FrameScheduler for RedrawScheduler {
    fn request_frame(&mut self) -> FrameRequest {
        self.next += 1;
        let request = FrameRequest(self.next);
        self.pending = Some(request);
        self.window.request_redraw();
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.pending == Some(request) {
            self.pending = None;
        }
    }
}
