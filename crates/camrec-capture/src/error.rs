//! Error types for the capture module.

use thiserror::Error;

/// Errors that can occur during capture operations.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    /// The camera could not be opened (missing or in use).
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),

    /// The camera disconnected or failed mid-stream.
    #[error("capture failed: {0}")]
    Disconnected(String),

    /// The OS device query failed.
    #[error("device enumeration failed: {0}")]
    Enumeration(String),

    /// Device id is not a valid camera index.
    #[error("invalid camera id: {0}")]
    InvalidDeviceId(String),

    /// Capture already started.
    #[error("capture already started")]
    AlreadyStarted,

    /// Capture not started.
    #[error("capture not started")]
    NotStarted,
}
