/// Ticket for one scheduled frame callback.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u64);

/// Platform frame timer: one callback per display refresh.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameRequest;

    /// Cancelling a request that already fired or was cancelled is a no-op.
    fn cancel_frame(&mut self, request: FrameRequest);
}
