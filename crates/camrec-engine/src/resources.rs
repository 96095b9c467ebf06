//! Session resource management and initialization tracking.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use camrec_audio::{AudioCaptureSession, AudioChunk, AudioFormat};
use camrec_capture::{AdjustControls, CameraSession, CaptureConfig, FrameSlot};
use camrec_ipc::{Settings, StartupPhase};
use camrec_recorder::{default_encoder_path, EncoderConfig, EncoderProcess, PlannedOutputs, WavSink};

/// Resources held by the current recording session (and the shared camera).
#[derive(Default)]
pub struct ActiveResources {
    /// Camera session, shared between preview and recording.
    pub camera: Option<CameraSession>,

    /// Whether the camera was opened for this session (close it on teardown)
    /// rather than inherited from a running preview.
    pub camera_for_session: bool,

    /// Microphone session, if an audio device is selected.
    pub microphone: Option<AudioCaptureSession>,

    /// Negotiated microphone format.
    pub audio_format: Option<AudioFormat>,

    /// Microphone chunk receiver, handed to the WAV sink.
    pub audio_rx: Option<Receiver<AudioChunk>>,

    /// External encoder process.
    pub encoder: Option<EncoderProcess>,

    /// WAV sink draining the microphone.
    pub wav: Option<WavSink>,

    /// Output files planned for this session.
    pub outputs: Option<PlannedOutputs>,
}

impl ActiveResources {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Manages session resource initialization and cleanup.
pub struct ResourceManager {
    resources: Mutex<ActiveResources>,
    current_phase: Mutex<Option<StartupPhase>>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self {
            resources: Mutex::new(ActiveResources::new()),
            current_phase: Mutex::new(None),
        }
    }

    /// Initialize resources up to and including the specified phase.
    #[instrument(name = "init_resources", skip_all)]
    pub fn initialize(
        &self,
        settings: &Settings,
        adjust: &Arc<AdjustControls>,
        preview: &Arc<FrameSlot>,
        output_dir: &Path,
        target_phase: StartupPhase,
    ) -> Result<(), String> {
        let mut phase = StartupPhase::EnsureCamera;

        loop {
            *self.current_phase.lock() = Some(phase);
            self.init_phase(settings, adjust, preview, output_dir, phase)?;

            if phase == target_phase {
                break;
            }

            phase = phase.next().ok_or("No more phases")?;
        }

        Ok(())
    }

    fn init_phase(
        &self,
        settings: &Settings,
        adjust: &Arc<AdjustControls>,
        preview: &Arc<FrameSlot>,
        output_dir: &Path,
        phase: StartupPhase,
    ) -> Result<(), String> {
        info!("Initializing phase: {:?}", phase);

        match phase {
            StartupPhase::EnsureCamera => self.ensure_camera(settings, adjust, preview),
            StartupPhase::OpenMicrophone => self.open_microphone(settings),
            StartupPhase::SpawnEncoder => self.spawn_encoder(settings, output_dir),
            StartupPhase::StartWriter => self.start_writer(),
        }
    }

    fn ensure_camera(
        &self,
        settings: &Settings,
        adjust: &Arc<AdjustControls>,
        preview: &Arc<FrameSlot>,
    ) -> Result<(), String> {
        let mut resources = self.resources.lock();

        if resources.camera.as_ref().is_some_and(|c| c.is_active()) {
            debug!("Reusing running preview camera");
            resources.camera_for_session = false;
            return Ok(());
        }

        let config = CaptureConfig {
            device_id: settings
                .video_device
                .clone()
                .unwrap_or_else(|| "0".to_string()),
            width: settings.resolution.width,
            height: settings.resolution.height,
            fps: settings.fps,
        };

        let session = CameraSession::open(config, Arc::clone(adjust), Arc::clone(preview))
            .map_err(|e| format!("Camera init failed: {e}"))?;

        resources.camera = Some(session);
        resources.camera_for_session = true;

        debug!("Camera initialized");
        Ok(())
    }

    fn open_microphone(&self, settings: &Settings) -> Result<(), String> {
        let Some(ref device) = settings.audio_device else {
            debug!("No audio device selected, recording without audio");
            return Ok(());
        };

        let mut session = AudioCaptureSession::new(Some(device.clone()));
        let (format, rx) = session
            .start()
            .map_err(|e| format!("Microphone init failed: {e}"))?;

        let mut resources = self.resources.lock();
        resources.microphone = Some(session);
        resources.audio_format = Some(format);
        resources.audio_rx = Some(rx);

        debug!("Microphone initialized");
        Ok(())
    }

    fn spawn_encoder(&self, settings: &Settings, output_dir: &Path) -> Result<(), String> {
        let outputs = PlannedOutputs::new(output_dir);

        let config = EncoderConfig {
            ffmpeg_path: default_encoder_path(),
            width: settings.resolution.width,
            height: settings.resolution.height,
            fps: settings.fps,
            output: outputs.video.clone(),
        };

        let encoder =
            EncoderProcess::spawn(&config).map_err(|e| format!("Encoder init failed: {e}"))?;

        let mut resources = self.resources.lock();
        resources.encoder = Some(encoder);
        resources.outputs = Some(outputs);

        debug!("Encoder spawned");
        Ok(())
    }

    fn start_writer(&self) -> Result<(), String> {
        let mut resources = self.resources.lock();

        let Some(rx) = resources.audio_rx.take() else {
            debug!("Writer ready (video only)");
            return Ok(());
        };

        let format = resources
            .audio_format
            .ok_or("Audio format missing after microphone init")?;
        let audio_path = resources
            .outputs
            .as_ref()
            .map(|o| o.audio.clone())
            .ok_or("Outputs missing after encoder init")?;

        let wav = WavSink::start(&audio_path, format, rx)
            .map_err(|e| format!("WAV writer init failed: {e}"))?;
        resources.wav = Some(wav);

        debug!("Writer ready");
        Ok(())
    }

    /// Rollback resources from the current phase backwards.
    #[instrument(name = "rollback_resources", skip(self))]
    pub fn rollback(&self) {
        let current = *self.current_phase.lock();

        if let Some(mut phase) = current {
            loop {
                info!("Rolling back phase: {:?}", phase);
                self.rollback_phase(phase);

                match phase.previous() {
                    Some(prev) => phase = prev,
                    None => break,
                }
            }
        }

        *self.current_phase.lock() = None;
    }

    fn rollback_phase(&self, phase: StartupPhase) {
        let mut resources = self.resources.lock();

        match phase {
            StartupPhase::StartWriter => {
                if let Some(wav) = resources.wav.take() {
                    let path = wav.path().to_path_buf();
                    if let Err(e) = wav.stop() {
                        warn!("WAV rollback error: {e}");
                    }
                    let _ = fs::remove_file(path);
                }
            }
            StartupPhase::SpawnEncoder => {
                if let Some(mut encoder) = resources.encoder.take() {
                    let _ = encoder.kill();
                }
                if let Some(outputs) = resources.outputs.take() {
                    let _ = fs::remove_file(&outputs.video);
                }
            }
            StartupPhase::OpenMicrophone => {
                if let Some(mut microphone) = resources.microphone.take() {
                    microphone.stop();
                }
                resources.audio_format = None;
                resources.audio_rx = None;
            }
            StartupPhase::EnsureCamera => {
                if resources.camera_for_session {
                    resources.camera = None;
                    resources.camera_for_session = false;
                }
            }
        }
    }

    /// Release everything, the shared camera included. Used at shutdown.
    #[instrument(name = "release_resources", skip(self))]
    pub fn release_all(&self) {
        self.rollback();

        let mut resources = self.resources.lock();
        if let Some(mut camera) = resources.camera.take() {
            camera.stop();
        }
        resources.camera_for_session = false;
    }

    /// Get a reference to the resources (for the record loop).
    pub fn resources(&self) -> &Mutex<ActiveResources> {
        &self.resources
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        self.release_all();
    }
}
