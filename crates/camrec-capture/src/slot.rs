//! Single-slot frame hand-off between the capture worker and consumers.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::frame::Frame;

/// A thread-safe single-slot buffer: newest frame wins.
///
/// The capture worker overwrites the slot on every frame; consumers either
/// `take` the frame (display + encode share one slot via `latest`) or observe
/// nothing and skip the tick. Frames lost under backpressure are counted, not
/// queued.
#[derive(Debug, Default)]
pub struct FrameSlot {
    slot: Mutex<Option<Frame>>,
    overwritten: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a frame, replacing any unconsumed one.
    pub fn store(&self, frame: Frame) {
        let previous = self.slot.lock().replace(frame);
        if previous.is_some() {
            self.overwritten.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Remove and return the latest frame, leaving the slot empty.
    pub fn take(&self) -> Option<Frame> {
        self.slot.lock().take()
    }

    /// Return a clone of the latest frame without consuming it.
    pub fn latest(&self) -> Option<Frame> {
        self.slot.lock().clone()
    }

    /// Number of frames dropped because they were never consumed.
    pub fn overwritten(&self) -> u64 {
        self.overwritten.load(Ordering::Relaxed)
    }

    /// Drop any pending frame.
    pub fn clear(&self) {
        self.slot.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::CaptureTimestamp;
    use bytes::Bytes;
    use std::time::Instant;

    fn frame(sequence: u64) -> Frame {
        Frame::new(
            Bytes::from(vec![0u8; 12]),
            2,
            2,
            CaptureTimestamp::now(Instant::now()),
            sequence,
        )
    }

    #[test]
    fn test_newest_frame_wins() {
        let slot = FrameSlot::new();
        slot.store(frame(1));
        slot.store(frame(2));
        slot.store(frame(3));

        assert_eq!(slot.take().unwrap().sequence, 3);
        assert!(slot.take().is_none());
        assert_eq!(slot.overwritten(), 2);
    }

    #[test]
    fn test_latest_does_not_consume() {
        let slot = FrameSlot::new();
        slot.store(frame(7));

        assert_eq!(slot.latest().unwrap().sequence, 7);
        assert_eq!(slot.take().unwrap().sequence, 7);
        assert!(slot.latest().is_none());
    }

    #[test]
    fn test_empty_slot_skips() {
        let slot = FrameSlot::new();
        assert!(slot.take().is_none());
        assert_eq!(slot.overwritten(), 0);
    }
}
