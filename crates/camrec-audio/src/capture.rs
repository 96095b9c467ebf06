//! Microphone capture session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, instrument, warn};

use crate::error::AudioError;
use crate::{AudioResult, AUDIO_CHANNEL_CAPACITY};

/// A chunk of interleaved f32 samples straight from the input callback.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Interleaved samples, `channels` values per frame.
    pub samples: Vec<f32>,
}

/// Negotiated stream parameters, needed by whoever writes the samples out.
#[derive(Debug, Clone, Copy)]
pub struct AudioFormat {
    /// Number of interleaved channels.
    pub channels: u16,

    /// Sample rate in Hz.
    pub sample_rate: u32,
}

/// A live microphone session.
///
/// cpal streams are not `Send`, so a dedicated worker thread owns the stream
/// and forwards chunks over a bounded channel. The service does no decoding
/// or encoding; chunks go to the recorder as-is.
pub struct AudioCaptureSession {
    device_name: Option<String>,
    should_stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    active: bool,
}

impl AudioCaptureSession {
    /// Create a session for the named microphone (None uses the default).
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            device_name,
            should_stop: Arc::new(AtomicBool::new(false)),
            worker: None,
            active: false,
        }
    }

    /// Open the microphone and start streaming chunks.
    #[instrument(name = "audio_start", skip(self), fields(device = ?self.device_name))]
    pub fn start(&mut self) -> AudioResult<(AudioFormat, Receiver<AudioChunk>)> {
        if self.active {
            return Err(AudioError::AlreadyStarted);
        }

        let (chunk_tx, chunk_rx) = crossbeam_channel::bounded(AUDIO_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<AudioResult<AudioFormat>>(1);

        let device_name = self.device_name.clone();
        let should_stop = Arc::clone(&self.should_stop);
        should_stop.store(false, Ordering::SeqCst);

        let worker = thread::spawn(move || {
            run_input_stream(device_name, chunk_tx, ready_tx, should_stop);
        });

        let format = match ready_rx.recv() {
            Ok(Ok(format)) => format,
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(AudioError::Stream("audio worker died".into()));
            }
        };

        self.worker = Some(worker);
        self.active = true;

        info!(
            channels = format.channels,
            sample_rate = format.sample_rate,
            "Microphone capture started"
        );
        Ok((format, chunk_rx))
    }

    /// Stop capturing and release the device.
    #[instrument(name = "audio_stop", skip(self))]
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }

        self.should_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        self.active = false;
        info!("Microphone capture stopped");
    }

    /// Whether capture is running.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for AudioCaptureSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_input_stream(
    device_name: Option<String>,
    chunk_tx: Sender<AudioChunk>,
    ready_tx: Sender<AudioResult<AudioFormat>>,
    should_stop: Arc<AtomicBool>,
) {
    let host = cpal::default_host();

    let device = match &device_name {
        Some(name) => {
            let found = host
                .input_devices()
                .ok()
                .and_then(|mut devices| {
                    devices.find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                });
            match found {
                Some(device) => device,
                None => {
                    let _ = ready_tx.send(Err(AudioError::DeviceNotFound(name.clone())));
                    return;
                }
            }
        }
        None => match host.default_input_device() {
            Some(device) => device,
            None => {
                let _ = ready_tx.send(Err(AudioError::DeviceNotFound(
                    "no default input device".into(),
                )));
                return;
            }
        },
    };

    let supported = match device.default_input_config() {
        Ok(config) => config,
        Err(e) => {
            let _ = ready_tx.send(Err(AudioError::Stream(e.to_string())));
            return;
        }
    };

    if supported.sample_format() != SampleFormat::F32 {
        let _ = ready_tx.send(Err(AudioError::Stream(format!(
            "unsupported sample format: {:?}",
            supported.sample_format()
        ))));
        return;
    }

    let config = supported.config();
    let format = AudioFormat {
        channels: config.channels,
        sample_rate: config.sample_rate.0,
    };

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            // Full channel means the consumer stalled; dropping a chunk is
            // preferable to unbounded queueing.
            if chunk_tx
                .try_send(AudioChunk {
                    samples: data.to_vec(),
                })
                .is_err()
            {
                debug!("Audio chunk dropped (consumer behind)");
            }
        },
        |err| {
            warn!("Audio stream error: {err}");
        },
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(AudioError::Stream(e.to_string())));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(AudioError::Stream(e.to_string())));
        return;
    }

    let _ = ready_tx.send(Ok(format));

    // The stream captures for as long as it is alive; park here until told
    // to stop.
    while !should_stop.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(50));
    }

    drop(stream);
}
