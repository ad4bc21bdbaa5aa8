//! Frame scheduling capability for the flight animation
//!
//! The animation never sleeps or spawns anything. It asks its scheduler for
//! "one more frame" and gets a handle back; whoever drives the frames later
//! delivers that handle to `FlightAnimation::on_frame`. Cancelling a handle
//! means a late delivery of it is ignored.

/// Identifies one requested frame
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

pub trait FrameScheduler {
    /// Ask to be called back before the next paint
    fn request_frame(&mut self) -> FrameHandle;

    /// Withdraw a request made with `request_frame`
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Single-slot frame pump driven by an outer loop or a test.
///
/// At most one frame is outstanding; a new request replaces the previous one.
#[derive(Debug, Default)]
pub struct FramePump {
    next_id: u64,
    pending: Option<FrameHandle>,
}

impl FramePump {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the frame due for delivery, if any. Each handle is yielded once.
    pub fn poll(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl FrameScheduler for FramePump {
    fn request_frame(&mut self) -> FrameHandle {
        self.next_id += 1;
        let handle = FrameHandle::new(self.next_id);
        self.pending = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_yields_each_handle_once() {
        let mut pump = FramePump::new();
        assert!(pump.poll().is_none());
        let h = pump.request_frame();
        assert!(pump.has_pending());
        assert_eq!(pump.poll(), Some(h));
        assert_eq!(pump.poll(), None);
    }

    #[test]
    fn cancel_only_drops_matching_handle() {
        let mut pump = FramePump::new();
        let old = pump.request_frame();
        let new = pump.request_frame();
        assert_ne!(old, new);
        pump.cancel_frame(old);
        assert!(pump.has_pending());
        pump.cancel_frame(new);
        assert!(!pump.has_pending());
    }
}
