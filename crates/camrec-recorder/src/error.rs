//! Error types for the recorder module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while managing the external encoder.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The encoder executable is missing or failed to launch.
    #[error("encoder executable not found or not launchable: {0}")]
    EncoderUnavailable(PathBuf),

    /// The encoder process exited unexpectedly or with a failure status.
    #[error("encoder process failed: {0}")]
    EncoderCrashed(String),

    /// A recording session is already active.
    #[error("a recording session is already active")]
    SessionActive,

    /// No recording session is active.
    #[error("no recording session is active")]
    NotRecording,

    /// Filesystem or pipe error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WAV file error.
    #[error("WAV write error: {0}")]
    Wav(String),
}
