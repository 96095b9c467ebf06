//! Common types used across IPC messages.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lower bound for brightness/contrast adjustments.
pub const ADJUST_MIN: i32 = -100;

/// Upper bound for brightness/contrast adjustments.
pub const ADJUST_MAX: i32 = 100;

/// A selectable camera or microphone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Unique identifier for this device (camera index or audio device name).
    pub id: String,

    /// Display name for the UI.
    pub name: String,

    /// Kind of device.
    pub kind: DeviceKind,

    /// Whether this is the default device of its kind.
    pub is_default: bool,
}

/// Kind of capture device.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeviceKind {
    /// A camera.
    Video,

    /// A microphone.
    Audio,
}

/// An output resolution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| format!("invalid resolution: {s}"))?;
        let width = w.parse().map_err(|_| format!("invalid width: {w}"))?;
        let height = h.parse().map_err(|_| format!("invalid height: {h}"))?;
        Ok(Self { width, height })
    }
}

/// User-adjustable preferences, persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Brightness offset in [-100, 100]; 0 is neutral.
    pub brightness: i32,

    /// Contrast adjustment in [-100, 100]; 0 is neutral.
    pub contrast: i32,

    /// Selected camera id (None selects the default camera).
    pub video_device: Option<String>,

    /// Selected microphone id (None records video only).
    pub audio_device: Option<String>,

    /// Capture/output resolution.
    pub resolution: Resolution,

    /// Target frames per second.
    pub fps: u32,

    /// Directory recordings are written to (None falls back to the home dir).
    pub output_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            brightness: 0,
            contrast: 0,
            video_device: None,
            audio_device: None,
            resolution: Resolution::default(),
            fps: 30,
            output_dir: None,
        }
    }
}

/// Parameters of an active recording session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Frame width fed to the encoder.
    pub width: u32,

    /// Frame height fed to the encoder.
    pub height: u32,

    /// Frames per second fed to the encoder.
    pub fps: u32,

    /// Camera id the session records from.
    pub video_device: String,

    /// Microphone id, if audio is recorded.
    pub audio_device: Option<String>,

    /// Final output path.
    pub output: PathBuf,
}

/// Live preview statistics, emitted periodically while the camera runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviewStats {
    /// Measured frames per second since the preview started.
    pub fps: f32,

    /// Total frames captured since the preview started.
    pub frames_captured: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_roundtrip() {
        let res: Resolution = "1920x1080".parse().unwrap();
        assert_eq!(res, Resolution::new(1920, 1080));
        assert_eq!(res.to_string(), "1920x1080");
    }

    #[test]
    fn test_resolution_rejects_garbage() {
        assert!("1920".parse::<Resolution>().is_err());
        assert!("axb".parse::<Resolution>().is_err());
        assert!("1920x".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.brightness, 0);
        assert_eq!(settings.contrast, 0);
        assert_eq!(settings.resolution, Resolution::new(1280, 720));
        assert_eq!(settings.fps, 30);
        assert!(settings.video_device.is_none());
    }
}
