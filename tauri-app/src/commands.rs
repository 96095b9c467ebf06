//! Tauri command handlers.

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use tauri::State;
use tracing::{debug, instrument};

use camrec_ipc::{EngineCommand, EngineEvent, Resolution};

use crate::AppState;

/// One preview frame, base64-encoded RGB24 for a canvas blit.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewFrame {
    pub width: u32,
    pub height: u32,
    pub sequence: u64,
    pub data: String,
}

/// Start the live camera preview.
#[tauri::command]
#[instrument(skip(state))]
pub async fn start_preview(state: State<'_, AppState>) -> Result<(), String> {
    debug!("start_preview command");
    state
        .command_tx
        .send(EngineCommand::StartPreview)
        .map_err(|e| format!("Failed to send command: {}", e))
}

/// Stop the live camera preview.
#[tauri::command]
#[instrument(skip(state))]
pub async fn stop_preview(state: State<'_, AppState>) -> Result<(), String> {
    debug!("stop_preview command");
    state
        .command_tx
        .send(EngineCommand::StopPreview)
        .map_err(|e| format!("Failed to send command: {}", e))
}

/// Start recording with the current settings.
#[tauri::command]
#[instrument(skip(state))]
pub async fn start_recording(state: State<'_, AppState>) -> Result<(), String> {
    debug!("start_recording command");
    state
        .command_tx
        .send(EngineCommand::StartRecording)
        .map_err(|e| format!("Failed to send command: {}", e))
}

/// Stop the current recording session.
#[tauri::command]
#[instrument(skip(state))]
pub async fn stop_recording(state: State<'_, AppState>) -> Result<(), String> {
    debug!("stop_recording command");
    state
        .command_tx
        .send(EngineCommand::StopRecording)
        .map_err(|e| format!("Failed to send command: {}", e))
}

/// Set brightness in [-100, 100].
#[tauri::command]
pub async fn set_brightness(state: State<'_, AppState>, value: i32) -> Result<(), String> {
    state
        .command_tx
        .send(EngineCommand::SetBrightness(value))
        .map_err(|e| format!("Failed to send command: {}", e))
}

/// Set contrast in [-100, 100].
#[tauri::command]
pub async fn set_contrast(state: State<'_, AppState>, value: i32) -> Result<(), String> {
    state
        .command_tx
        .send(EngineCommand::SetContrast(value))
        .map_err(|e| format!("Failed to send command: {}", e))
}

/// Change the capture resolution.
#[tauri::command]
pub async fn set_resolution(
    state: State<'_, AppState>,
    width: u32,
    height: u32,
) -> Result<(), String> {
    state
        .command_tx
        .send(EngineCommand::SetResolution(Resolution::new(width, height)))
        .map_err(|e| format!("Failed to send command: {}", e))
}

/// Select a camera by id.
#[tauri::command]
pub async fn select_video_device(state: State<'_, AppState>, id: String) -> Result<(), String> {
    state
        .command_tx
        .send(EngineCommand::SelectVideoDevice(id))
        .map_err(|e| format!("Failed to send command: {}", e))
}

/// Select a microphone by id (null disables audio).
#[tauri::command]
pub async fn select_audio_device(
    state: State<'_, AppState>,
    id: Option<String>,
) -> Result<(), String> {
    state
        .command_tx
        .send(EngineCommand::SelectAudioDevice(id))
        .map_err(|e| format!("Failed to send command: {}", e))
}

/// Change the output directory for future recordings.
#[tauri::command]
pub async fn set_output_dir(state: State<'_, AppState>, path: String) -> Result<(), String> {
    state
        .command_tx
        .send(EngineCommand::SetOutputDir(PathBuf::from(path)))
        .map_err(|e| format!("Failed to send command: {}", e))
}

/// Request the list of available cameras.
#[tauri::command]
pub async fn get_video_devices(state: State<'_, AppState>) -> Result<(), String> {
    state
        .command_tx
        .send(EngineCommand::GetVideoDevices)
        .map_err(|e| format!("Failed to send command: {}", e))
}

/// Request the list of available microphones.
#[tauri::command]
pub async fn get_audio_devices(state: State<'_, AppState>) -> Result<(), String> {
    state
        .command_tx
        .send(EngineCommand::GetAudioDevices)
        .map_err(|e| format!("Failed to send command: {}", e))
}

/// Request current recorder state.
#[tauri::command]
pub async fn get_state(state: State<'_, AppState>) -> Result<(), String> {
    state
        .command_tx
        .send(EngineCommand::GetState)
        .map_err(|e| format!("Failed to send command: {}", e))
}

/// Request current settings.
#[tauri::command]
pub async fn get_settings(state: State<'_, AppState>) -> Result<(), String> {
    state
        .command_tx
        .send(EngineCommand::GetSettings)
        .map_err(|e| format!("Failed to send command: {}", e))
}

/// Poll for engine events (non-blocking).
#[tauri::command]
pub async fn poll_events(state: State<'_, AppState>) -> Result<Vec<EngineEvent>, String> {
    let rx = state.event_rx.lock();
    let mut events = Vec::new();

    // Collect all available events without blocking
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(crossbeam_channel::TryRecvError::Empty) => break,
            Err(crossbeam_channel::TryRecvError::Disconnected) => {
                return Err("Event channel disconnected".to_string());
            }
        }
    }

    Ok(events)
}

/// Poll the latest preview frame (non-blocking).
///
/// Returns `None` when no frame has arrived since the last poll, so the
/// frontend simply skips that render tick.
#[tauri::command]
pub async fn poll_preview(state: State<'_, AppState>) -> Result<Option<PreviewFrame>, String> {
    let Some(frame) = state.preview.latest() else {
        return Ok(None);
    };

    let last = state.last_preview_seq.swap(frame.sequence, Ordering::SeqCst);
    if last == frame.sequence {
        return Ok(None);
    }

    Ok(Some(PreviewFrame {
        width: frame.width,
        height: frame.height,
        sequence: frame.sequence,
        data: STANDARD.encode(&frame.data),
    }))
}
