//! Main engine orchestrator.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use camrec_audio::enumerate_audio_devices;
use camrec_capture::{
    enumerate_video_devices, letterbox, AdjustControls, CameraSession, CaptureConfig, FrameSlot,
};
use camrec_ipc::{
    EngineCommand, EngineEvent, RecorderState, Resolution, SessionConfig, ShutdownPhase,
    StartupPhase, StopReason,
};
use camrec_recorder::{
    default_encoder_path, merge_streams, EncoderProcess, RecorderError, STOP_TIMEOUT,
};

use crate::resources::ResourceManager;
use crate::settings::{DeviceCache, SettingsManager};

/// How often preview statistics are emitted while the camera runs.
const STATS_INTERVAL: Duration = Duration::from_secs(1);

/// The main recording engine.
pub struct Engine {
    command_rx: Receiver<EngineCommand>,
    event_tx: Sender<EngineEvent>,
    state: Arc<RwLock<RecorderState>>,
    settings: SettingsManager,
    device_cache: DeviceCache,
    resources: Arc<ResourceManager>,
    adjust: Arc<AdjustControls>,
    preview: Arc<FrameSlot>,
    record_thread: Option<JoinHandle<()>>,
    should_stop: Arc<AtomicBool>,
    record_failure: Arc<Mutex<Option<StopReason>>>,
    last_stats: Instant,
}

impl Engine {
    /// Create a new engine with default on-disk settings and device cache.
    pub fn new(
        command_rx: Receiver<EngineCommand>,
        event_tx: Sender<EngineEvent>,
        preview: Arc<FrameSlot>,
    ) -> Self {
        Self::with_stores(
            command_rx,
            event_tx,
            preview,
            SettingsManager::load_default(),
            DeviceCache::load_default(),
        )
    }

    /// Create a new engine with explicit stores.
    pub fn with_stores(
        command_rx: Receiver<EngineCommand>,
        event_tx: Sender<EngineEvent>,
        preview: Arc<FrameSlot>,
        settings: SettingsManager,
        device_cache: DeviceCache,
    ) -> Self {
        let snapshot = settings.snapshot();
        let adjust = Arc::new(AdjustControls::new(snapshot.brightness, snapshot.contrast));

        Self {
            command_rx,
            event_tx,
            state: Arc::new(RwLock::new(RecorderState::Idle)),
            settings,
            device_cache,
            resources: Arc::new(ResourceManager::new()),
            adjust,
            preview,
            record_thread: None,
            should_stop: Arc::new(AtomicBool::new(false)),
            record_failure: Arc::new(Mutex::new(None)),
            last_stats: Instant::now(),
        }
    }

    /// Run the engine (blocking).
    #[instrument(name = "engine_run", skip(self))]
    pub fn run(&mut self) {
        info!("Engine starting");
        self.send_event(EngineEvent::Ready);

        loop {
            match self.command_rx.recv_timeout(Duration::from_millis(100)) {
                Ok(command) => {
                    if !self.handle_command(command) {
                        break;
                    }
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    self.tick();
                }
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                    info!("Command channel disconnected, shutting down");
                    self.stop_recording(StopReason::AppExit);
                    break;
                }
            }
        }

        self.resources.release_all();
        info!("Engine stopped");
    }

    /// Handle a command. Returns false if engine should stop.
    fn handle_command(&mut self, command: EngineCommand) -> bool {
        debug!(?command, "Handling command");

        match command {
            EngineCommand::StartPreview => self.start_preview(),
            EngineCommand::StopPreview => self.stop_preview(),
            EngineCommand::StartRecording => self.start_recording(),
            EngineCommand::StopRecording => self.stop_recording(StopReason::UserRequested),
            EngineCommand::SetBrightness(value) => self.set_brightness(value),
            EngineCommand::SetContrast(value) => self.set_contrast(value),
            EngineCommand::SetResolution(resolution) => self.set_resolution(resolution),
            EngineCommand::SelectVideoDevice(id) => self.select_video_device(id),
            EngineCommand::SelectAudioDevice(id) => self.select_audio_device(id),
            EngineCommand::SetOutputDir(dir) => {
                self.settings.set_output_dir(dir);
                self.send_settings();
            }
            EngineCommand::GetVideoDevices => self.send_video_devices(),
            EngineCommand::GetAudioDevices => self.send_audio_devices(),
            EngineCommand::GetState => self.send_state(),
            EngineCommand::GetSettings => self.send_settings(),
            EngineCommand::Shutdown => {
                self.stop_recording(StopReason::AppExit);
                self.resources.release_all();
                self.preview.clear();
                self.send_event(EngineEvent::Shutdown);
                return false;
            }
        }

        true
    }

    /// Idle-tick work: poll worker failures and emit preview stats.
    fn tick(&mut self) {
        // A failed record loop asks the engine to wind the session down.
        let failure = self.record_failure.lock().take();
        if let Some(reason) = failure {
            self.stop_recording(reason);
        }

        // Camera death mid-stream surfaces here rather than on a worker panic.
        let camera_error = {
            let resources = self.resources.resources().lock();
            resources.camera.as_ref().and_then(|c| c.take_failure())
        };
        if let Some(e) = camera_error {
            warn!("Camera failed: {e}");
            self.send_event(EngineEvent::Error {
                recoverable: true,
                message: e.to_string(),
            });

            if self.state.read().is_recording() {
                self.stop_recording(StopReason::CaptureError {
                    message: e.to_string(),
                });
            }

            let mut resources = self.resources.resources().lock();
            resources.camera = None;
            resources.camera_for_session = false;
            self.preview.clear();
        }

        if self.last_stats.elapsed() >= STATS_INTERVAL {
            let stats = {
                let resources = self.resources.resources().lock();
                resources
                    .camera
                    .as_ref()
                    .filter(|c| c.is_active())
                    .map(|c| c.stats())
            };
            if let Some(stats) = stats {
                self.send_event(EngineEvent::PreviewStats(stats));
            }
            self.last_stats = Instant::now();
        }
    }

    #[instrument(name = "start_preview", skip(self))]
    fn start_preview(&mut self) {
        {
            let resources = self.resources.resources().lock();
            if resources.camera.as_ref().is_some_and(|c| c.is_active()) {
                debug!("Preview already running");
                return;
            }
        }

        let settings = self.settings.snapshot();
        let config = CaptureConfig {
            device_id: settings
                .video_device
                .clone()
                .unwrap_or_else(|| "0".to_string()),
            width: settings.resolution.width,
            height: settings.resolution.height,
            fps: settings.fps,
        };

        match CameraSession::open(config, Arc::clone(&self.adjust), Arc::clone(&self.preview)) {
            Ok(session) => {
                self.resources.resources().lock().camera = Some(session);
                info!("Preview started");
            }
            Err(e) => {
                warn!("Preview start failed: {e}");
                self.send_event(EngineEvent::Error {
                    recoverable: true,
                    message: e.to_string(),
                });
            }
        }
    }

    #[instrument(name = "stop_preview", skip(self))]
    fn stop_preview(&mut self) {
        if self.state.read().is_recording() {
            self.send_event(EngineEvent::Error {
                recoverable: true,
                message: "Preview cannot be stopped while recording".to_string(),
            });
            return;
        }

        let mut resources = self.resources.resources().lock();
        if let Some(mut camera) = resources.camera.take() {
            camera.stop();
        }
        resources.camera_for_session = false;
        drop(resources);

        self.preview.clear();
        info!("Preview stopped");
    }

    /// Restart the camera worker after a device or resolution change.
    fn restart_preview(&mut self) {
        let running = {
            let resources = self.resources.resources().lock();
            resources.camera.is_some()
        };
        if running {
            self.stop_preview();
            self.start_preview();
        }
    }

    #[instrument(name = "start_recording", skip(self))]
    fn start_recording(&mut self) {
        {
            let state = self.state.read();
            if !state.can_start() {
                debug!("Session already active, ignoring start command");
                return;
            }
        }

        let settings = self.settings.snapshot();
        let output_dir = settings
            .output_dir
            .clone()
            .or_else(dirs::video_dir)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        if let Err(e) = fs::create_dir_all(&output_dir) {
            self.send_event(EngineEvent::Error {
                recoverable: true,
                message: format!("Cannot create output directory: {e}"),
            });
            return;
        }

        info!("Starting recording");
        self.transition_to(RecorderState::Starting {
            phase: StartupPhase::EnsureCamera,
        });
        self.settings.lock();

        match self.resources.initialize(
            &settings,
            &self.adjust,
            &self.preview,
            &output_dir,
            StartupPhase::StartWriter,
        ) {
            Ok(()) => {
                // The writer loop owns the encoder process so pipe writes never
                // block command handling; it hands it back when it exits.
                let (outputs, encoder) = {
                    let mut resources = self.resources.resources().lock();
                    (resources.outputs.clone(), resources.encoder.take())
                };
                let (Some(outputs), Some(encoder)) = (outputs, encoder) else {
                    error!("Startup completed without an encoder session");
                    self.resources.rollback();
                    self.settings.unlock();
                    self.transition_to(RecorderState::Failed {
                        message: "Startup completed without an encoder session".to_string(),
                        partial_output: None,
                    });
                    self.send_event(EngineEvent::Error {
                        recoverable: true,
                        message: "Startup completed without an encoder session".to_string(),
                    });
                    return;
                };

                let config = SessionConfig {
                    width: settings.resolution.width,
                    height: settings.resolution.height,
                    fps: settings.fps,
                    video_device: settings
                        .video_device
                        .clone()
                        .unwrap_or_else(|| "0".to_string()),
                    audio_device: settings.audio_device.clone(),
                    output: outputs.merged.clone(),
                };

                self.transition_to(RecorderState::Recording { config });
                self.start_record_loop(encoder, settings.resolution, settings.fps);
                self.send_event(EngineEvent::RecordingStarted {
                    output: outputs.merged,
                });

                info!("Recording started");
            }
            Err(e) => {
                error!("Recording start failed: {}", e);

                self.resources.rollback();
                self.settings.unlock();

                self.transition_to(RecorderState::Failed {
                    message: e.clone(),
                    partial_output: None,
                });
                self.send_event(EngineEvent::Error {
                    recoverable: true,
                    message: e,
                });
            }
        }
    }

    /// Start the frame writer loop in a separate thread.
    fn start_record_loop(&mut self, encoder: EncoderProcess, resolution: Resolution, fps: u32) {
        let resources = Arc::clone(&self.resources);
        let slot = Arc::clone(&self.preview);
        let should_stop = Arc::clone(&self.should_stop);
        let failure = Arc::clone(&self.record_failure);

        should_stop.store(false, Ordering::SeqCst);
        *failure.lock() = None;

        let handle = thread::spawn(move || {
            record_loop(resources, encoder, slot, resolution, fps, should_stop, failure);
        });

        self.record_thread = Some(handle);
    }

    /// Stop the active recording session.
    #[instrument(name = "stop_recording", skip(self))]
    fn stop_recording(&mut self, reason: StopReason) {
        {
            let state = self.state.read();
            if !state.is_recording() && !state.is_starting() {
                debug!("No active session, ignoring stop command");
                return;
            }
        }

        info!(?reason, "Stopping recording");

        self.transition_to(RecorderState::Stopping {
            reason: reason.clone(),
            phase: ShutdownPhase::StopWriter,
        });
        self.should_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.record_thread.take() {
            let _ = handle.join();
        }

        let wav = self.resources.resources().lock().wav.take();
        let audio_path = wav.and_then(|w| match w.stop() {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("WAV finalize failed: {e}");
                None
            }
        });

        self.transition_to(RecorderState::Stopping {
            reason: reason.clone(),
            phase: ShutdownPhase::CloseEncoder,
        });
        let encoder = self.resources.resources().lock().encoder.take();
        let exit_status = encoder.map(|enc| enc.finish(STOP_TIMEOUT));

        self.transition_to(RecorderState::Stopping {
            reason: reason.clone(),
            phase: ShutdownPhase::CloseMicrophone,
        });
        {
            let mut resources = self.resources.resources().lock();
            if let Some(mut microphone) = resources.microphone.take() {
                microphone.stop();
            }
            resources.audio_format = None;
            resources.audio_rx = None;

            if resources.camera_for_session {
                resources.camera = None;
                resources.camera_for_session = false;
                self.preview.clear();
            }
        }

        self.transition_to(RecorderState::Stopping {
            reason: reason.clone(),
            phase: ShutdownPhase::FinalizeOutput,
        });
        let outputs = self.resources.resources().lock().outputs.take();
        self.settings.unlock();

        let Some(outputs) = outputs else {
            // Session never reached the encoder phase.
            self.transition_to(RecorderState::Idle);
            return;
        };

        let status_ok = matches!(exit_status, Some(Ok(ref status)) if status.success());
        let requested = matches!(
            reason,
            StopReason::UserRequested | StopReason::AppExit
        );

        if requested && status_ok {
            let finalize = match audio_path {
                Some(ref audio) => merge_streams(
                    &default_encoder_path(),
                    &outputs.video,
                    audio,
                    &outputs.merged,
                )
                .and_then(|()| outputs.remove_intermediates().map_err(RecorderError::Io)),
                None => fs::rename(&outputs.video, &outputs.merged).map_err(RecorderError::Io),
            };

            match finalize {
                Ok(()) => {
                    self.transition_to(RecorderState::Idle);
                    self.send_event(EngineEvent::RecordingFinished {
                        output: outputs.merged,
                        complete: true,
                    });
                    info!("Recording stopped");
                    return;
                }
                Err(e) => {
                    warn!("Finalize failed: {e}");
                    self.fail_session(format!("Finalize failed: {e}"), &outputs.video);
                    return;
                }
            }
        }

        let message = if requested {
            match exit_status {
                Some(Ok(status)) => format!("Encoder exited abnormally: {status}"),
                Some(Err(e)) => format!("Encoder shutdown failed: {e}"),
                None => "Encoder was not running".to_string(),
            }
        } else {
            reason.message()
        };
        self.fail_session(message, &outputs.video);
    }

    /// Record a failed session, preserving whatever partial output exists.
    fn fail_session(&mut self, message: String, partial: &std::path::Path) {
        let partial_output = partial.exists().then(|| partial.to_path_buf());

        if let Some(ref output) = partial_output {
            self.send_event(EngineEvent::RecordingFinished {
                output: output.clone(),
                complete: false,
            });
        }
        self.send_event(EngineEvent::Error {
            recoverable: true,
            message: message.clone(),
        });
        self.transition_to(RecorderState::Failed {
            message,
            partial_output,
        });
    }

    fn set_brightness(&mut self, value: i32) {
        let stored = self.settings.set_brightness(value);
        self.adjust.set_brightness(stored);
        self.send_settings();
    }

    fn set_contrast(&mut self, value: i32) {
        let stored = self.settings.set_contrast(value);
        self.adjust.set_contrast(stored);
        self.send_settings();
    }

    fn set_resolution(&mut self, resolution: Resolution) {
        match self.settings.set_resolution(resolution) {
            Ok(()) => {
                self.restart_preview();
                self.send_settings();
            }
            Err(e) => self.send_event(EngineEvent::Error {
                recoverable: true,
                message: e.to_string(),
            }),
        }
    }

    fn select_video_device(&mut self, id: String) {
        match self.settings.set_video_device(id) {
            Ok(()) => {
                self.restart_preview();
                self.send_settings();
            }
            Err(e) => self.send_event(EngineEvent::Error {
                recoverable: true,
                message: e.to_string(),
            }),
        }
    }

    fn select_audio_device(&mut self, id: Option<String>) {
        match self.settings.set_audio_device(id) {
            Ok(()) => self.send_settings(),
            Err(e) => self.send_event(EngineEvent::Error {
                recoverable: true,
                message: e.to_string(),
            }),
        }
    }

    fn send_video_devices(&self) {
        match self.device_cache.video_devices(enumerate_video_devices) {
            Ok(devices) => self.send_event(EngineEvent::VideoDevices(devices)),
            Err(e) => {
                warn!("Camera enumeration failed: {e}");
                self.send_event(EngineEvent::Error {
                    recoverable: true,
                    message: format!("Camera enumeration failed: {e}"),
                });
            }
        }
    }

    fn send_audio_devices(&self) {
        match self.device_cache.audio_devices(enumerate_audio_devices) {
            Ok(devices) => self.send_event(EngineEvent::AudioDevices(devices)),
            Err(e) => {
                warn!("Microphone enumeration failed: {e}");
                self.send_event(EngineEvent::Error {
                    recoverable: true,
                    message: format!("Microphone enumeration failed: {e}"),
                });
            }
        }
    }

    fn send_state(&self) {
        let state = self.state.read().clone();
        self.send_event(EngineEvent::StateChanged {
            previous: Box::new(state.clone()),
            current: Box::new(state),
        });
    }

    fn send_settings(&self) {
        self.send_event(EngineEvent::SettingsChanged(self.settings.snapshot()));
    }

    fn transition_to(&self, new_state: RecorderState) {
        let previous = {
            let mut state = self.state.write();
            let prev = state.clone();
            *state = new_state.clone();
            prev
        };

        debug!(
            previous = %previous.name(),
            current = %new_state.name(),
            "State transition"
        );

        self.send_event(EngineEvent::StateChanged {
            previous: Box::new(previous),
            current: Box::new(new_state),
        });
    }

    fn send_event(&self, event: EngineEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("Failed to send event: {}", e);
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.should_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.record_thread.take() {
            let _ = handle.join();
        }
    }
}

/// Frame writer loop.
///
/// Paced to the target fps; each tick takes whatever frame is currently in
/// the slot, letterboxes it to the configured resolution if the camera
/// negotiated something else, and pipes it to the encoder. No frame yet means
/// the tick is skipped; an unchanged frame is written again to keep the
/// output stream at constant rate.
///
/// The loop owns the encoder process for its lifetime so pipe writes under
/// encoder backpressure never hold the shared resources lock. The encoder is
/// handed back to `resources` on exit; the engine joins this thread before
/// shutting the encoder down.
fn record_loop(
    resources: Arc<ResourceManager>,
    mut encoder: EncoderProcess,
    slot: Arc<FrameSlot>,
    resolution: Resolution,
    fps: u32,
    should_stop: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<StopReason>>>,
) {
    debug!("Record loop starting");

    let frame_interval = Duration::from_nanos(1_000_000_000 / u64::from(fps.max(1)));
    let start_time = Instant::now();
    let mut frames_written: u64 = 0;
    let mut frames_duplicated: u64 = 0;
    let mut last_sequence: Option<u64> = None;
    let mut last_log_time = Instant::now();

    while !should_stop.load(Ordering::SeqCst) {
        let tick_start = Instant::now();

        if last_log_time.elapsed() >= Duration::from_secs(5) {
            info!(
                "Recording stats: written={}, duplicated={}, uptime={:.1}s",
                frames_written,
                frames_duplicated,
                start_time.elapsed().as_secs_f32()
            );
            last_log_time = Instant::now();
        }

        if let Some(frame) = slot.latest() {
            if last_sequence == Some(frame.sequence) {
                frames_duplicated += 1;
            }
            last_sequence = Some(frame.sequence);

            let frame = if frame.width != resolution.width || frame.height != resolution.height {
                letterbox(&frame, resolution.width, resolution.height)
            } else {
                frame
            };

            if let Err(e) = encoder.write_frame(&frame.data) {
                // A broken pipe means the process died; fetch the exit status.
                let status = encoder.exit_status();
                let message = match status {
                    Some(status) => format!("encoder exited: {status}"),
                    None => format!("write failed: {e}"),
                };
                warn!("Encoder write failed: {message}");
                *failure.lock() = Some(StopReason::EncoderCrashed { message });
                break;
            }

            frames_written += 1;
        }

        let elapsed = tick_start.elapsed();
        if elapsed < frame_interval {
            thread::sleep(frame_interval - elapsed);
        }
    }

    resources.resources().lock().encoder = Some(encoder);
    info!(
        "Record loop stopped: total written={}, duplicated={}",
        frames_written, frames_duplicated
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use camrec_ipc::{command_channel, event_channel, Settings};

    fn spawn_engine() -> (
        Sender<EngineCommand>,
        Receiver<EngineEvent>,
        JoinHandle<()>,
    ) {
        let (command_tx, command_rx) = command_channel();
        let (event_tx, event_rx) = event_channel();
        let preview = Arc::new(FrameSlot::new());

        let handle = thread::spawn(move || {
            let mut engine = Engine::with_stores(
                command_rx,
                event_tx,
                preview,
                SettingsManager::new(None),
                DeviceCache::new(None),
            );
            engine.run();
        });

        (command_tx, event_rx, handle)
    }

    fn recv(event_rx: &Receiver<EngineEvent>) -> EngineEvent {
        event_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("engine event")
    }

    #[test]
    fn test_engine_reports_ready_then_shuts_down() {
        let (command_tx, event_rx, handle) = spawn_engine();

        assert!(matches!(recv(&event_rx), EngineEvent::Ready));

        command_tx.send(EngineCommand::Shutdown).unwrap();
        loop {
            if matches!(recv(&event_rx), EngineEvent::Shutdown) {
                break;
            }
        }
        handle.join().unwrap();
    }

    #[test]
    fn test_engine_clamps_brightness() {
        let (command_tx, event_rx, handle) = spawn_engine();
        assert!(matches!(recv(&event_rx), EngineEvent::Ready));

        command_tx.send(EngineCommand::SetBrightness(500)).unwrap();
        let settings = loop {
            if let EngineEvent::SettingsChanged(settings) = recv(&event_rx) {
                break settings;
            }
        };
        assert_eq!(settings.brightness, 100);

        command_tx.send(EngineCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_engine_reports_default_settings() {
        let (command_tx, event_rx, handle) = spawn_engine();
        assert!(matches!(recv(&event_rx), EngineEvent::Ready));

        command_tx.send(EngineCommand::GetSettings).unwrap();
        let settings = loop {
            if let EngineEvent::SettingsChanged(settings) = recv(&event_rx) {
                break settings;
            }
        };
        assert_eq!(settings, Settings::default());

        command_tx.send(EngineCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_engine_reports_idle_state() {
        let (command_tx, event_rx, handle) = spawn_engine();
        assert!(matches!(recv(&event_rx), EngineEvent::Ready));

        command_tx.send(EngineCommand::GetState).unwrap();
        let current = loop {
            if let EngineEvent::StateChanged { current, .. } = recv(&event_rx) {
                break current;
            }
        };
        assert!(matches!(*current, RecorderState::Idle));

        command_tx.send(EngineCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_output_dir_change_allowed_anytime() {
        let (command_tx, event_rx, handle) = spawn_engine();
        assert!(matches!(recv(&event_rx), EngineEvent::Ready));

        command_tx
            .send(EngineCommand::SetOutputDir(PathBuf::from("/tmp/recordings")))
            .unwrap();
        let settings = loop {
            if let EngineEvent::SettingsChanged(settings) = recv(&event_rx) {
                break settings;
            }
        };
        assert_eq!(settings.output_dir, Some(PathBuf::from("/tmp/recordings")));

        command_tx.send(EngineCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_record_loop_hands_encoder_back_to_resources() {
        use std::io::Write as _;
        use std::os::unix::fs::PermissionsExt;

        use bytes::Bytes;
        use camrec_capture::{CaptureTimestamp, Frame};
        use camrec_recorder::EncoderConfig;

        let dir = tempfile::tempdir().unwrap();
        let stub = dir.path().join("ffmpeg");
        let mut file = fs::File::create(&stub).unwrap();
        writeln!(file, "#!/bin/sh\ncat > /dev/null").unwrap();
        drop(file);
        fs::set_permissions(&stub, fs::Permissions::from_mode(0o755)).unwrap();

        let encoder = EncoderProcess::spawn(&EncoderConfig {
            ffmpeg_path: stub,
            width: 4,
            height: 4,
            fps: 30,
            output: dir.path().join("out.mp4"),
        })
        .unwrap();

        let resources = Arc::new(ResourceManager::new());
        let slot = Arc::new(FrameSlot::new());
        let ts = CaptureTimestamp::now(Instant::now());
        slot.store(Frame::new(Bytes::from(vec![0u8; 48]), 4, 4, ts, 0));

        let should_stop = Arc::new(AtomicBool::new(false));
        let failure: Arc<Mutex<Option<StopReason>>> = Arc::new(Mutex::new(None));

        let loop_resources = Arc::clone(&resources);
        let loop_slot = Arc::clone(&slot);
        let loop_stop = Arc::clone(&should_stop);
        let loop_failure = Arc::clone(&failure);
        let writer = thread::spawn(move || {
            record_loop(
                loop_resources,
                encoder,
                loop_slot,
                Resolution::new(4, 4),
                30,
                loop_stop,
                loop_failure,
            );
        });

        // Let the loop write a few frames, then wind it down.
        thread::sleep(Duration::from_millis(200));
        should_stop.store(true, Ordering::SeqCst);
        writer.join().unwrap();

        assert!(failure.lock().is_none());

        // The encoder must be back in shared state so shutdown can reap it.
        let encoder = resources.resources().lock().encoder.take();
        let status = encoder
            .expect("record loop did not return the encoder")
            .finish(STOP_TIMEOUT)
            .unwrap();
        assert!(status.success());
    }
}
