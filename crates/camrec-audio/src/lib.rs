//! Microphone enumeration and capture.
//!
//! This crate opens an input device via cpal and streams interleaved f32
//! chunks over a bounded channel. It never touches audio encoding; the
//! recorder decides what to do with the samples.

mod capture;
mod device;
mod error;

pub use capture::{AudioCaptureSession, AudioChunk, AudioFormat};
pub use device::enumerate_audio_devices;
pub use error::AudioError;

/// Channel capacity for audio chunks.
pub const AUDIO_CHANNEL_CAPACITY: usize = 32;

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;
