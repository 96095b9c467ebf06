//! Events sent from the engine to the UI.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::state::RecorderState;
use crate::types::{DeviceDescriptor, PreviewStats, Settings};

/// Events that the engine can send to the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Recorder state has changed.
    StateChanged {
        /// Previous state.
        previous: Box<RecorderState>,

        /// Current state.
        current: Box<RecorderState>,
    },

    /// A recording session has started.
    RecordingStarted {
        /// Planned output path.
        output: PathBuf,
    },

    /// A recording session has finished.
    RecordingFinished {
        /// Output file left on disk.
        output: PathBuf,

        /// False if the session was cut short and the file may be partial.
        complete: bool,
    },

    /// Settings changed (via a validated setter).
    SettingsChanged(Settings),

    /// List of available cameras.
    VideoDevices(Vec<DeviceDescriptor>),

    /// List of available microphones.
    AudioDevices(Vec<DeviceDescriptor>),

    /// Preview statistics, emitted periodically while the camera runs.
    PreviewStats(PreviewStats),

    /// Error occurred.
    Error {
        /// Whether the engine keeps working (the UI should disable the
        /// affected control rather than exit).
        recoverable: bool,

        /// Error message.
        message: String,
    },

    /// Engine is ready.
    Ready,

    /// Engine has shut down.
    Shutdown,
}
