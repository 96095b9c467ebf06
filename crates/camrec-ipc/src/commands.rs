//! Commands sent from the UI to the engine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::Resolution;

/// Commands that the UI can send to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineCommand {
    /// Start (or restart) the live camera preview.
    StartPreview,

    /// Stop the live camera preview.
    StopPreview,

    /// Start recording with the current settings.
    StartRecording,

    /// Stop the current recording session.
    StopRecording,

    /// Set brightness in [-100, 100]; out-of-range values are clamped.
    SetBrightness(i32),

    /// Set contrast in [-100, 100]; out-of-range values are clamped.
    SetContrast(i32),

    /// Change the capture resolution. Rejected while recording.
    SetResolution(Resolution),

    /// Select a camera by id. Rejected while recording.
    SelectVideoDevice(String),

    /// Select a microphone by id (None disables audio). Rejected while recording.
    SelectAudioDevice(Option<String>),

    /// Change the output directory for future recordings.
    SetOutputDir(PathBuf),

    /// Request the list of available cameras.
    GetVideoDevices,

    /// Request the list of available microphones.
    GetAudioDevices,

    /// Request the current recorder state.
    GetState,

    /// Request the current settings.
    GetSettings,

    /// Shutdown the engine completely.
    Shutdown,
}
