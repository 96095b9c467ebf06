//! External encoder (ffmpeg) process management.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use crate::error::RecorderError;
use crate::RecorderResult;

/// Bounded wait for the encoder to exit after its stdin closes.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Parameters for one encoder process.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Path to the ffmpeg executable.
    pub ffmpeg_path: PathBuf,

    /// Input frame width.
    pub width: u32,

    /// Input frame height.
    pub height: u32,

    /// Input frames per second.
    pub fps: u32,

    /// Output video file.
    pub output: PathBuf,
}

/// Default location of the bundled encoder, relative to the working
/// directory.
pub fn default_encoder_path() -> PathBuf {
    let binary = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };
    Path::new("ffmpeg").join(binary)
}

/// Arguments for encoding raw RGB24 frames from stdin into an H.264 file.
fn raw_video_args(config: &EncoderConfig) -> Vec<String> {
    vec![
        "-y".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgb24".into(),
        "-s".into(),
        format!("{}x{}", config.width, config.height),
        "-r".into(),
        config.fps.to_string(),
        "-i".into(),
        "pipe:0".into(),
        "-c:v".into(),
        "libx264".into(),
        "-preset".into(),
        "ultrafast".into(),
        "-crf".into(),
        "23".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        config.output.to_string_lossy().into_owned(),
    ]
}

/// Arguments for merging a video file and a WAV file into one container.
fn merge_args(video: &Path, audio: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-i".into(),
        video.to_string_lossy().into_owned(),
        "-i".into(),
        audio.to_string_lossy().into_owned(),
        "-c:v".into(),
        "copy".into(),
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        "192k".into(),
        output.to_string_lossy().into_owned(),
    ]
}

/// A running external encoder process fed raw frames over stdin.
#[derive(Debug)]
pub struct EncoderProcess {
    child: Child,
    stdin: Option<ChildStdin>,
}

impl EncoderProcess {
    /// Spawn the encoder.
    ///
    /// Fails with `EncoderUnavailable` if the binary is missing or cannot be
    /// launched. The spawned process inherits nothing; stdout/stderr are
    /// discarded like the original tool does.
    #[instrument(name = "encoder_spawn", skip(config), fields(output = %config.output.display()))]
    pub fn spawn(config: &EncoderConfig) -> RecorderResult<Self> {
        if !config.ffmpeg_path.is_file() {
            return Err(RecorderError::EncoderUnavailable(config.ffmpeg_path.clone()));
        }

        let mut child = Command::new(&config.ffmpeg_path)
            .args(raw_video_args(config))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                    RecorderError::EncoderUnavailable(config.ffmpeg_path.clone())
                }
                _ => RecorderError::Io(e),
            })?;

        let stdin = child.stdin.take();
        info!(pid = child.id(), "Encoder process spawned");

        Ok(Self { child, stdin })
    }

    /// Write one raw frame to the encoder's stdin.
    ///
    /// A `BrokenPipe` error means the process died; callers should check
    /// [`exit_status`](Self::exit_status) and surface `EncoderCrashed`.
    pub fn write_frame(&mut self, data: &[u8]) -> io::Result<()> {
        match self.stdin.as_mut() {
            Some(stdin) => stdin.write_all(data),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "encoder stdin already closed",
            )),
        }
    }

    /// Whether the process is still running.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Exit status if the process has already exited.
    pub fn exit_status(&mut self) -> Option<ExitStatus> {
        self.child.try_wait().ok().flatten()
    }

    /// Close stdin and wait for the encoder to flush and exit.
    ///
    /// Graceful first: dropping stdin signals EOF so ffmpeg can finalize the
    /// container. If the process is still alive after `timeout` it is killed,
    /// so stop never leaves a zombie.
    #[instrument(name = "encoder_finish", skip(self))]
    pub fn finish(mut self, timeout: Duration) -> RecorderResult<ExitStatus> {
        drop(self.stdin.take());

        let deadline = Instant::now() + timeout;
        loop {
            match self.child.try_wait()? {
                Some(status) => {
                    debug!(?status, "Encoder exited");
                    return Ok(status);
                }
                None if Instant::now() >= deadline => {
                    warn!("Encoder did not exit in time, killing");
                    self.child.kill()?;
                    let status = self.child.wait()?;
                    return Ok(status);
                }
                None => thread::sleep(Duration::from_millis(100)),
            }
        }
    }

    /// Kill the process immediately and reap it.
    pub fn kill(&mut self) -> RecorderResult<()> {
        drop(self.stdin.take());
        if self.is_running() {
            self.child.kill()?;
        }
        self.child.wait()?;
        Ok(())
    }
}

impl Drop for EncoderProcess {
    fn drop(&mut self) {
        let _ = self.kill();
    }
}

/// Merge a video file and a WAV file into `output` with a second encoder
/// invocation. Inputs are left in place; the caller decides what to delete.
#[instrument(name = "merge_streams", skip_all, fields(output = %output.display()))]
pub fn merge_streams(
    ffmpeg_path: &Path,
    video: &Path,
    audio: &Path,
    output: &Path,
) -> RecorderResult<()> {
    if !ffmpeg_path.is_file() {
        return Err(RecorderError::EncoderUnavailable(ffmpeg_path.to_path_buf()));
    }

    let status = Command::new(ffmpeg_path)
        .args(merge_args(video, audio, output))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                RecorderError::EncoderUnavailable(ffmpeg_path.to_path_buf())
            }
            _ => RecorderError::Io(e),
        })?;

    if !status.success() {
        return Err(RecorderError::EncoderCrashed(format!(
            "merge exited with {status}"
        )));
    }

    info!("Merged video and audio");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write as _;

    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    /// Write an executable shell script `body` and return its path.
    #[cfg(unix)]
    fn stub_encoder(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("ffmpeg");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh\n{body}").unwrap();
        drop(file);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn config(ffmpeg_path: PathBuf, output: PathBuf) -> EncoderConfig {
        EncoderConfig {
            ffmpeg_path,
            width: 4,
            height: 4,
            fps: 30,
            output,
        }
    }

    #[test]
    fn test_raw_video_args_shape() {
        let cfg = config(PathBuf::from("ffmpeg"), PathBuf::from("out.mp4"));
        let args = raw_video_args(&cfg);

        assert_eq!(args[0], "-y");
        let s_pos = args.iter().position(|a| a == "-s").unwrap();
        assert_eq!(args[s_pos + 1], "4x4");
        let r_pos = args.iter().position(|a| a == "-r").unwrap();
        assert_eq!(args[r_pos + 1], "30");
        assert!(args.contains(&"pipe:0".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        assert_eq!(args.last().unwrap(), "out.mp4");
    }

    #[test]
    fn test_merge_args_shape() {
        let args = merge_args(
            Path::new("v.mp4"),
            Path::new("a.wav"),
            Path::new("final.mkv"),
        );
        assert!(args.contains(&"copy".to_string()));
        assert!(args.contains(&"aac".to_string()));
        assert_eq!(args.last().unwrap(), "final.mkv");
    }

    #[test]
    fn test_spawn_missing_binary_is_unavailable() {
        let cfg = config(
            PathBuf::from("/nonexistent/ffmpeg"),
            PathBuf::from("out.mp4"),
        );
        match EncoderProcess::spawn(&cfg) {
            Err(RecorderError::EncoderUnavailable(path)) => {
                assert_eq!(path, PathBuf::from("/nonexistent/ffmpeg"));
            }
            other => panic!("expected EncoderUnavailable, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_crashing_encoder_breaks_the_pipe() {
        let dir = tempfile::tempdir().unwrap();
        let stub = stub_encoder(dir.path(), "exit 1");
        let cfg = config(stub, dir.path().join("out.mp4"));

        let mut encoder = EncoderProcess::spawn(&cfg).unwrap();

        // The stub exits immediately; writes eventually hit a broken pipe.
        let frame = vec![0u8; 4 * 4 * 3];
        let mut saw_error = false;
        for _ in 0..200 {
            if encoder.write_frame(&frame).is_err() {
                saw_error = true;
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(saw_error, "writes kept succeeding against a dead process");

        let status = encoder.finish(Duration::from_secs(2)).unwrap();
        assert_eq!(status.code(), Some(1));
    }

    #[cfg(unix)]
    #[test]
    fn test_finish_reaps_the_process() {
        let dir = tempfile::tempdir().unwrap();
        let stub = stub_encoder(dir.path(), "cat > /dev/null");
        let cfg = config(stub, dir.path().join("out.mp4"));

        let mut encoder = EncoderProcess::spawn(&cfg).unwrap();
        encoder.write_frame(&[0u8; 48]).unwrap();
        assert!(encoder.is_running());

        // Closing stdin lets `cat` see EOF and exit cleanly.
        let status = encoder.finish(STOP_TIMEOUT).unwrap();
        assert!(status.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_finish_kills_a_hung_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let stub = stub_encoder(dir.path(), "sleep 60");
        let cfg = config(stub, dir.path().join("out.mp4"));

        let encoder = EncoderProcess::spawn(&cfg).unwrap();
        let started = Instant::now();
        let status = encoder.finish(Duration::from_millis(300)).unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!status.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_merge_failure_surfaces_encoder_crashed() {
        let dir = tempfile::tempdir().unwrap();
        let stub = stub_encoder(dir.path(), "exit 3");

        let result = merge_streams(
            &stub,
            Path::new("v.mp4"),
            Path::new("a.wav"),
            Path::new("final.mkv"),
        );
        assert!(matches!(result, Err(RecorderError::EncoderCrashed(_))));
    }
}
