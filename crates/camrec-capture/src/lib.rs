//! Webcam capture for the recorder.
//!
//! This crate opens a camera, pulls frames on a dedicated worker thread,
//! applies brightness/contrast, and hands frames to consumers through a
//! single-slot latest-wins buffer. It also provides aspect-preserving
//! letterbox scaling for display and encoder fitting.

mod adjust;
mod device;
mod error;
mod frame;
mod scale;
mod session;
mod slot;

pub use adjust::{apply_adjustments, AdjustControls};
pub use device::enumerate_video_devices;
pub use error::CaptureError;
pub use frame::{CaptureTimestamp, Frame};
pub use scale::{fit_rect, letterbox, FitRect};
pub use session::{CameraSession, CaptureConfig};
pub use slot::FrameSlot;

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;
