//! Brightness/contrast pixel transforms.

use std::sync::atomic::{AtomicI32, Ordering};

use camrec_ipc::{ADJUST_MAX, ADJUST_MIN};

/// Shared adjustment values, snapshotted once per frame by the capture worker.
///
/// Atomics instead of a lock so a slider drag never stalls the worker.
#[derive(Debug, Default)]
pub struct AdjustControls {
    brightness: AtomicI32,
    contrast: AtomicI32,
}

impl AdjustControls {
    pub fn new(brightness: i32, contrast: i32) -> Self {
        let controls = Self::default();
        controls.set_brightness(brightness);
        controls.set_contrast(contrast);
        controls
    }

    pub fn set_brightness(&self, value: i32) {
        self.brightness
            .store(value.clamp(ADJUST_MIN, ADJUST_MAX), Ordering::Relaxed);
    }

    pub fn set_contrast(&self, value: i32) {
        self.contrast
            .store(value.clamp(ADJUST_MIN, ADJUST_MAX), Ordering::Relaxed);
    }

    /// Snapshot both values for one frame.
    pub fn snapshot(&self) -> (i32, i32) {
        (
            self.brightness.load(Ordering::Relaxed),
            self.contrast.load(Ordering::Relaxed),
        )
    }
}

/// Apply brightness and contrast to an RGB24 buffer in place.
///
/// `out = alpha * px + beta` per channel, where contrast maps [-100, 100] to
/// alpha in [0, 2] and brightness maps [-100, 100] to beta in [-127, 127].
/// (0, 0) is the identity. Out-of-range inputs are clamped.
pub fn apply_adjustments(pixels: &mut [u8], brightness: i32, contrast: i32) {
    let brightness = brightness.clamp(ADJUST_MIN, ADJUST_MAX);
    let contrast = contrast.clamp(ADJUST_MIN, ADJUST_MAX);

    if brightness == 0 && contrast == 0 {
        return;
    }

    let alpha = (contrast + 100) as f32 / 100.0;
    let beta = brightness as f32 * 1.27;

    // One 256-entry table per frame beats a float multiply per byte.
    let mut table = [0u8; 256];
    for (value, entry) in table.iter_mut().enumerate() {
        *entry = (alpha * value as f32 + beta).round().clamp(0.0, 255.0) as u8;
    }

    for px in pixels.iter_mut() {
        *px = table[*px as usize];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_at_zero() {
        let mut pixels = vec![0u8, 64, 128, 200, 255];
        let original = pixels.clone();
        apply_adjustments(&mut pixels, 0, 0);
        assert_eq!(pixels, original);
    }

    #[test]
    fn test_max_brightness_saturates() {
        let mut pixels = vec![128u8, 200, 255];
        apply_adjustments(&mut pixels, 100, 0);
        assert_eq!(pixels, vec![255, 255, 255]);
    }

    #[test]
    fn test_min_brightness_darkens() {
        let mut pixels = vec![0u8, 100, 255];
        apply_adjustments(&mut pixels, -100, 0);
        assert_eq!(pixels[0], 0);
        assert!(pixels[1] < 100);
        assert!(pixels[2] < 255);
    }

    #[test]
    fn test_min_contrast_flattens_to_beta() {
        // alpha = 0 collapses every value to the brightness offset.
        let mut pixels = vec![0u8, 128, 255];
        apply_adjustments(&mut pixels, 0, -100);
        assert_eq!(pixels, vec![0, 0, 0]);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let mut a = vec![10u8, 100, 240];
        let mut b = a.clone();
        apply_adjustments(&mut a, 1_000, -1_000);
        apply_adjustments(&mut b, ADJUST_MAX, ADJUST_MIN);
        assert_eq!(a, b);
    }

    #[test]
    fn test_controls_clamp_and_snapshot() {
        let controls = AdjustControls::new(250, -250);
        assert_eq!(controls.snapshot(), (ADJUST_MAX, ADJUST_MIN));

        controls.set_brightness(10);
        controls.set_contrast(-10);
        assert_eq!(controls.snapshot(), (10, -10));
    }
}
