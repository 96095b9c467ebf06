//! Webcam recorder Tauri application library.

mod commands;

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use camrec_capture::FrameSlot;
use camrec_engine::Engine;
use camrec_ipc::{command_channel, event_channel, EngineCommand, EngineEvent};

/// Application state shared with Tauri commands.
pub struct AppState {
    pub command_tx: Sender<EngineCommand>,
    pub event_rx: Mutex<Receiver<EngineEvent>>,

    /// Latest-wins frame buffer shared with the camera worker.
    pub preview: Arc<FrameSlot>,

    /// Sequence of the last frame handed to the frontend, for tick skipping.
    pub last_preview_seq: AtomicU64,
}

/// Initialize logging.
fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "camrec=debug,camrec_engine=debug,camrec_capture=debug,camrec_audio=debug,camrec_recorder=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    init_logging();
    info!("Webcam recorder starting");

    // Create IPC channels and the shared preview buffer
    let (command_tx, command_rx) = command_channel();
    let (event_tx, event_rx) = event_channel();
    let preview = Arc::new(FrameSlot::new());

    // Start engine in background thread
    let engine_preview = Arc::clone(&preview);
    thread::spawn(move || {
        let mut engine = Engine::new(command_rx, event_tx, engine_preview);
        engine.run();
    });

    // Create app state
    let state = AppState {
        command_tx,
        event_rx: Mutex::new(event_rx),
        preview,
        last_preview_seq: AtomicU64::new(u64::MAX),
    };

    tauri::Builder::default()
        .plugin(tauri_plugin_shell::init())
        .manage(state)
        .invoke_handler(tauri::generate_handler![
            commands::start_preview,
            commands::stop_preview,
            commands::start_recording,
            commands::stop_recording,
            commands::set_brightness,
            commands::set_contrast,
            commands::set_resolution,
            commands::select_video_device,
            commands::select_audio_device,
            commands::set_output_dir,
            commands::get_video_devices,
            commands::get_audio_devices,
            commands::get_state,
            commands::get_settings,
            commands::poll_events,
            commands::poll_preview,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
