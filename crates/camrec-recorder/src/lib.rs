//! Recording primitives: external encoder process, WAV sink, output naming.
//!
//! This crate drives an external `ffmpeg` binary for video encoding and
//! stream merging, and writes microphone audio to a 16-bit PCM WAV file.

mod encoder;
mod error;
mod output;
mod wav;

pub use encoder::{
    default_encoder_path, merge_streams, EncoderConfig, EncoderProcess, STOP_TIMEOUT,
};
pub use error::RecorderError;
pub use output::PlannedOutputs;
pub use wav::WavSink;

/// Result type for recorder operations.
pub type RecorderResult<T> = Result<T, RecorderError>;
