//! Camera session management.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, FrameFormat, RequestedFormat, RequestedFormatType,
    Resolution as CameraResolution,
};
use nokhwa::Camera;
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use camrec_ipc::PreviewStats;

use crate::adjust::{apply_adjustments, AdjustControls};
use crate::device::parse_device_index;
use crate::error::CaptureError;
use crate::frame::{CaptureTimestamp, Frame};
use crate::slot::FrameSlot;
use crate::CaptureResult;

/// Delay before the single retry on a transient open failure.
const OPEN_RETRY_DELAY: Duration = Duration::from_millis(300);

/// Requested capture parameters.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Camera id (index as produced by enumeration).
    pub device_id: String,

    /// Requested frame width.
    pub width: u32,

    /// Requested frame height.
    pub height: u32,

    /// Requested frames per second.
    pub fps: u32,
}

/// A live camera session.
///
/// A dedicated worker thread owns the camera handle; a blocked device read
/// never touches the caller's thread. Adjusted frames land in a single-slot
/// latest-wins buffer.
pub struct CameraSession {
    slot: Arc<FrameSlot>,
    adjust: Arc<AdjustControls>,
    should_stop: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<CaptureError>>>,
    frames_captured: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
    dimensions: (u32, u32),
    started: Instant,
}

impl CameraSession {
    /// Open the camera and start the capture worker.
    ///
    /// Fails with `DeviceUnavailable` if the camera cannot be opened after
    /// one bounded retry.
    ///
    /// The worker publishes into the caller-supplied `slot`, so the same
    /// buffer can outlive individual sessions (device switches, restarts).
    #[instrument(name = "camera_open", skip(config, adjust, slot), fields(device_id = %config.device_id))]
    pub fn open(
        config: CaptureConfig,
        adjust: Arc<AdjustControls>,
        slot: Arc<FrameSlot>,
    ) -> CaptureResult<Self> {
        let index = parse_device_index(&config.device_id)?;

        let should_stop = Arc::new(AtomicBool::new(false));
        let failure = Arc::new(Mutex::new(None));
        let frames_captured = Arc::new(AtomicU64::new(0));

        // The camera handle lives on the worker thread; open results come
        // back over a rendezvous channel.
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<CaptureResult<(u32, u32)>>(1);

        let worker = {
            let slot = Arc::clone(&slot);
            let adjust = Arc::clone(&adjust);
            let should_stop = Arc::clone(&should_stop);
            let failure = Arc::clone(&failure);
            let frames_captured = Arc::clone(&frames_captured);
            let config = config.clone();

            thread::spawn(move || {
                let mut camera = match open_camera(index.clone(), &config) {
                    Ok(camera) => camera,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let resolution = camera.resolution();
                let _ = ready_tx.send(Ok((resolution.width(), resolution.height())));

                capture_loop(
                    &mut camera,
                    &slot,
                    &adjust,
                    &should_stop,
                    &failure,
                    &frames_captured,
                );

                if let Err(e) = camera.stop_stream() {
                    debug!("Stream close error: {e}");
                }
            })
        };

        let dimensions = match ready_rx.recv() {
            Ok(Ok(dims)) => dims,
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(CaptureError::DeviceUnavailable(config.device_id));
            }
        };

        info!(
            width = dimensions.0,
            height = dimensions.1,
            "Camera opened"
        );

        Ok(Self {
            slot,
            adjust,
            should_stop,
            failure,
            frames_captured,
            worker: Some(worker),
            dimensions,
            started: Instant::now(),
        })
    }

    /// The single-slot buffer the worker publishes frames into.
    pub fn frames(&self) -> Arc<FrameSlot> {
        Arc::clone(&self.slot)
    }

    /// Shared brightness/contrast controls applied by the worker.
    pub fn adjust(&self) -> Arc<AdjustControls> {
        Arc::clone(&self.adjust)
    }

    /// Actual capture dimensions negotiated with the device.
    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    /// Whether the worker is still capturing.
    pub fn is_active(&self) -> bool {
        !self.should_stop.load(Ordering::SeqCst) && self.failure.lock().is_none()
    }

    /// Take the worker's failure, if the camera died mid-stream.
    pub fn take_failure(&self) -> Option<CaptureError> {
        self.failure.lock().take()
    }

    /// Preview statistics since the session started.
    pub fn stats(&self) -> PreviewStats {
        let frames_captured = self.frames_captured.load(Ordering::Relaxed);
        let elapsed = self.started.elapsed().as_secs_f32();
        let fps = if elapsed > 0.0 {
            frames_captured as f32 / elapsed
        } else {
            0.0
        };

        PreviewStats {
            fps,
            frames_captured,
        }
    }

    /// Stop the worker and release the camera.
    #[instrument(name = "camera_stop", skip(self))]
    pub fn stop(&mut self) {
        self.should_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        self.slot.clear();
        info!("Camera stopped");
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_camera(
    index: nokhwa::utils::CameraIndex,
    config: &CaptureConfig,
) -> CaptureResult<Camera> {
    let mut last_error = None;
    for attempt in 0..2 {
        if attempt > 0 {
            thread::sleep(OPEN_RETRY_DELAY);
            debug!("Retrying camera open");
        }

        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(
                CameraResolution::new(config.width, config.height),
                FrameFormat::MJPEG,
                config.fps,
            ),
        ));

        match Camera::new(index.clone(), requested) {
            Ok(mut camera) => match camera.open_stream() {
                Ok(()) => return Ok(camera),
                Err(e) => last_error = Some(e.to_string()),
            },
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    Err(CaptureError::DeviceUnavailable(
        last_error.unwrap_or_else(|| config.device_id.clone()),
    ))
}

fn capture_loop(
    camera: &mut Camera,
    slot: &FrameSlot,
    adjust: &AdjustControls,
    should_stop: &AtomicBool,
    failure: &Mutex<Option<CaptureError>>,
    frames_captured: &AtomicU64,
) {
    let start_time = Instant::now();
    let mut sequence: u64 = 0;

    while !should_stop.load(Ordering::SeqCst) {
        let buffer = match camera.frame() {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!("Camera read failed: {e}");
                *failure.lock() = Some(CaptureError::Disconnected(e.to_string()));
                break;
            }
        };

        let decoded = match buffer.decode_image::<RgbFormat>() {
            Ok(image) => image,
            Err(e) => {
                warn!("Frame decode failed: {e}");
                *failure.lock() = Some(CaptureError::Disconnected(e.to_string()));
                break;
            }
        };

        let (width, height) = (decoded.width(), decoded.height());
        let mut pixels = decoded.into_raw();

        // Settings are read once per frame to avoid tearing mid-buffer.
        let (brightness, contrast) = adjust.snapshot();
        apply_adjustments(&mut pixels, brightness, contrast);

        let frame = Frame::new(
            Bytes::from(pixels),
            width,
            height,
            CaptureTimestamp::now(start_time),
            sequence,
        );
        sequence += 1;

        slot.store(frame);
        frames_captured.fetch_add(1, Ordering::Relaxed);
    }
}
