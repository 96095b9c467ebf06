//! Captured frame types.

use bytes::Bytes;
use std::time::Instant;

/// Timestamp for a captured frame.
#[derive(Debug, Clone, Copy)]
pub struct CaptureTimestamp {
    /// Monotonic timestamp when the frame was captured.
    pub capture_time: Instant,

    /// Frame presentation timestamp in 100ns units (for AV sync).
    pub pts_100ns: u64,
}

impl CaptureTimestamp {
    /// Create a new capture timestamp relative to a stream start time.
    pub fn now(start_time: Instant) -> Self {
        let capture_time = Instant::now();
        let elapsed = capture_time.duration_since(start_time);
        let pts_100ns = elapsed.as_nanos() as u64 / 100;

        Self {
            capture_time,
            pts_100ns,
        }
    }

    /// Get the presentation timestamp in milliseconds.
    pub fn pts_ms(&self) -> u64 {
        self.pts_100ns / 10_000
    }
}

/// A captured video frame in RGB24 layout.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Tightly packed RGB pixel data, 3 bytes per pixel.
    pub data: Bytes,

    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,

    /// Capture timestamp.
    pub timestamp: CaptureTimestamp,

    /// Monotonically increasing sequence number.
    pub sequence: u64,
}

impl Frame {
    /// Create a new frame.
    pub fn new(
        data: Bytes,
        width: u32,
        height: u32,
        timestamp: CaptureTimestamp,
        sequence: u64,
    ) -> Self {
        Self {
            data,
            width,
            height,
            timestamp,
            sequence,
        }
    }

    /// Expected RGB24 buffer size for the given dimensions.
    pub fn rgb_buffer_size(width: u32, height: u32) -> usize {
        (width * height) as usize * 3
    }

    /// Validate that the frame data matches its dimensions.
    pub fn is_valid(&self) -> bool {
        self.data.len() == Self::rgb_buffer_size(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_buffer_size() {
        assert_eq!(Frame::rgb_buffer_size(2, 2), 12);
        assert_eq!(Frame::rgb_buffer_size(1280, 720), 1280 * 720 * 3);
    }

    #[test]
    fn test_frame_validity() {
        let ts = CaptureTimestamp::now(Instant::now());
        let good = Frame::new(Bytes::from(vec![0u8; 12]), 2, 2, ts, 0);
        assert!(good.is_valid());

        let bad = Frame::new(Bytes::from(vec![0u8; 11]), 2, 2, ts, 1);
        assert!(!bad.is_valid());
    }
}
