//! Error types for the audio module.

use thiserror::Error;

/// Errors that can occur during audio operations.
#[derive(Debug, Clone, Error)]
pub enum AudioError {
    /// Microphone not found or not openable.
    #[error("microphone unavailable: {0}")]
    DeviceNotFound(String),

    /// The OS device query failed.
    #[error("audio enumeration failed: {0}")]
    Enumeration(String),

    /// The input stream could not be built or started.
    #[error("audio stream error: {0}")]
    Stream(String),

    /// Capture already started.
    #[error("audio capture already started")]
    AlreadyStarted,

    /// Capture not started.
    #[error("audio capture not started")]
    NotStarted,
}
