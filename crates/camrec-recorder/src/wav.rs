//! WAV sink for microphone chunks.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::{info, instrument, warn};

use camrec_audio::{AudioChunk, AudioFormat};

use crate::error::RecorderError;
use crate::RecorderResult;

/// Convert one f32 sample to the i16 range written to disk.
fn sample_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

/// Writes incoming audio chunks to a 16-bit PCM WAV file on its own thread.
pub struct WavSink {
    path: PathBuf,
    should_stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<Result<(), String>>>,
}

impl WavSink {
    /// Create the WAV file and start draining `chunks`.
    #[instrument(name = "wav_start", skip(format, chunks), fields(path = %path.display()))]
    pub fn start(
        path: &Path,
        format: AudioFormat,
        chunks: Receiver<AudioChunk>,
    ) -> RecorderResult<Self> {
        let spec = WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut writer =
            WavWriter::create(path, spec).map_err(|e| RecorderError::Wav(e.to_string()))?;

        let should_stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&should_stop);

        let worker = thread::spawn(move || -> Result<(), String> {
            loop {
                match chunks.recv_timeout(Duration::from_millis(100)) {
                    Ok(chunk) => {
                        for sample in chunk.samples {
                            writer
                                .write_sample(sample_to_i16(sample))
                                .map_err(|e| e.to_string())?;
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        if stop_flag.load(Ordering::SeqCst) {
                            break;
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }

            writer.finalize().map_err(|e| e.to_string())
        });

        info!("WAV sink started");
        Ok(Self {
            path: path.to_path_buf(),
            should_stop,
            worker: Some(worker),
        })
    }

    /// Stop draining, finalize the file, and return its path.
    #[instrument(name = "wav_stop", skip(self))]
    pub fn stop(mut self) -> RecorderResult<PathBuf> {
        self.should_stop.store(true, Ordering::SeqCst);

        if let Some(handle) = self.worker.take() {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(RecorderError::Wav(e)),
                Err(_) => return Err(RecorderError::Wav("WAV writer panicked".into())),
            }
        }

        Ok(self.path.clone())
    }

    /// Path of the file being written.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WavSink {
    fn drop(&mut self) {
        self.should_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("WAV writer panicked during drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_conversion_clamps() {
        assert_eq!(sample_to_i16(0.0), 0);
        assert_eq!(sample_to_i16(1.0), 32767);
        assert_eq!(sample_to_i16(-1.0), -32767);
        assert_eq!(sample_to_i16(2.0), 32767);
        assert_eq!(sample_to_i16(-2.0), -32767);
    }

    #[test]
    fn test_sink_writes_playable_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audio.wav");

        let format = AudioFormat {
            channels: 1,
            sample_rate: 8_000,
        };
        let (tx, rx) = crossbeam_channel::bounded(4);

        let sink = WavSink::start(&path, format, rx).unwrap();
        tx.send(AudioChunk {
            samples: vec![0.0, 0.5, -0.5, 1.0],
        })
        .unwrap();
        drop(tx);

        let written = sink.stop().unwrap();
        assert_eq!(written, path);

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 8_000);
        assert_eq!(reader.len(), 4);
    }
}
