//! Aspect-preserving scaling (letterbox) for display and encoding.

use bytes::Bytes;

use crate::frame::Frame;

/// Placement of a scaled image inside a target canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitRect {
    /// Horizontal offset of the scaled image.
    pub x: u32,

    /// Vertical offset of the scaled image.
    pub y: u32,

    /// Scaled image width.
    pub width: u32,

    /// Scaled image height.
    pub height: u32,
}

/// Compute the largest centered rectangle with the source aspect ratio that
/// fits inside `target_w` x `target_h`.
pub fn fit_rect(src_w: u32, src_h: u32, target_w: u32, target_h: u32) -> FitRect {
    let scale = f64::min(
        target_w as f64 / src_w as f64,
        target_h as f64 / src_h as f64,
    );
    let width = ((src_w as f64 * scale) as u32).max(1).min(target_w);
    let height = ((src_h as f64 * scale) as u32).max(1).min(target_h);

    FitRect {
        x: (target_w - width) / 2,
        y: (target_h - height) / 2,
        width,
        height,
    }
}

/// Scale a frame into a `target_w` x `target_h` black canvas, preserving the
/// source aspect ratio (letterbox/pillarbox rather than stretch).
///
/// Returns the input unchanged when it already matches the target size.
pub fn letterbox(frame: &Frame, target_w: u32, target_h: u32) -> Frame {
    if frame.width == target_w && frame.height == target_h {
        return frame.clone();
    }

    let rect = fit_rect(frame.width, frame.height, target_w, target_h);
    let mut canvas = vec![0u8; Frame::rgb_buffer_size(target_w, target_h)];

    let src = frame.data.as_ref();
    let src_stride = frame.width as usize * 3;
    let dst_stride = target_w as usize * 3;

    // Nearest-neighbor: cheap enough for preview and encoder fitting.
    for row in 0..rect.height {
        let src_y = (row as u64 * frame.height as u64 / rect.height as u64) as usize;
        let dst_row = (rect.y + row) as usize * dst_stride + rect.x as usize * 3;
        let src_row = src_y * src_stride;

        for col in 0..rect.width {
            let src_x = (col as u64 * frame.width as u64 / rect.width as u64) as usize;
            let s = src_row + src_x * 3;
            let d = dst_row + col as usize * 3;
            canvas[d..d + 3].copy_from_slice(&src[s..s + 3]);
        }
    }

    Frame::new(
        Bytes::from(canvas),
        target_w,
        target_h,
        frame.timestamp,
        frame.sequence,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::CaptureTimestamp;
    use std::time::Instant;

    fn solid_frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let data: Vec<u8> = rgb
            .iter()
            .copied()
            .cycle()
            .take(Frame::rgb_buffer_size(width, height))
            .collect();
        Frame::new(
            Bytes::from(data),
            width,
            height,
            CaptureTimestamp::now(Instant::now()),
            0,
        )
    }

    #[test]
    fn test_fit_rect_wider_source_letterboxes() {
        // 16:9 source into a 4:3 target: full width, bars top and bottom.
        let rect = fit_rect(1920, 1080, 640, 480);
        assert_eq!(rect.width, 640);
        assert_eq!(rect.height, 360);
        assert_eq!(rect.x, 0);
        assert_eq!(rect.y, 60);
    }

    #[test]
    fn test_fit_rect_taller_source_pillarboxes() {
        let rect = fit_rect(480, 640, 640, 480);
        assert_eq!(rect.height, 480);
        assert_eq!(rect.width, 360);
        assert_eq!(rect.y, 0);
        assert_eq!(rect.x, 140);
    }

    #[test]
    fn test_fit_rect_same_aspect_fills_target() {
        let rect = fit_rect(1280, 720, 640, 360);
        assert_eq!(
            rect,
            FitRect {
                x: 0,
                y: 0,
                width: 640,
                height: 360
            }
        );
    }

    #[test]
    fn test_letterbox_output_matches_target_size() {
        let frame = solid_frame(320, 240, [10, 20, 30]);
        let out = letterbox(&frame, 640, 360);
        assert_eq!((out.width, out.height), (640, 360));
        assert!(out.is_valid());
    }

    #[test]
    fn test_letterbox_bars_are_black() {
        let frame = solid_frame(100, 100, [255, 255, 255]);
        let out = letterbox(&frame, 200, 100);
        // Square source into 2:1 target: pillarbox with 50px bars either side.
        let left_edge = &out.data[0..3];
        assert_eq!(left_edge, &[0, 0, 0]);

        let center = (100usize * 200 / 2 + 100) * 3;
        assert_eq!(&out.data[center..center + 3], &[255, 255, 255]);
    }

    #[test]
    fn test_letterbox_noop_when_sizes_match() {
        let frame = solid_frame(64, 48, [1, 2, 3]);
        let out = letterbox(&frame, 64, 48);
        assert_eq!(out.data, frame.data);
    }

    #[test]
    fn test_ten_frames_match_configured_resolution() {
        for sequence in 0..10u64 {
            let mut frame = solid_frame(1920, 1080, [5, 5, 5]);
            frame.sequence = sequence;
            let out = letterbox(&frame, 1280, 720);
            assert_eq!((out.width, out.height), (1280, 720));
            assert!(out.is_valid());
            assert_eq!(out.sequence, sequence);
        }
    }
}
