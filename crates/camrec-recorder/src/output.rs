//! Timestamped output paths for a recording session.

use std::path::{Path, PathBuf};

use chrono::Local;

/// Files produced by one recording session.
///
/// The video and audio files are intermediate artifacts. They are merged
/// into `merged` when the session finishes cleanly, then removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOutputs {
    pub video: PathBuf,
    pub audio: PathBuf,
    pub merged: PathBuf,
}

impl PlannedOutputs {
    /// Build paths for a session starting now, under `dir`.
    pub fn new(dir: &Path) -> Self {
        Self::with_stamp(dir, &Local::now().format("%Y%m%d_%H%M%S").to_string())
    }

    fn with_stamp(dir: &Path, stamp: &str) -> Self {
        Self {
            video: dir.join(format!("video_{stamp}.mp4")),
            audio: dir.join(format!("audio_{stamp}.wav")),
            merged: dir.join(format!("recording_{stamp}.mkv")),
        }
    }

    /// Remove the intermediate video and audio files, keeping the merged output.
    pub fn remove_intermediates(&self) -> std::io::Result<()> {
        std::fs::remove_file(&self.video)?;
        std::fs::remove_file(&self.audio)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planned_names_share_stamp() {
        let outputs = PlannedOutputs::with_stamp(Path::new("/tmp/rec"), "20260830_120000");
        assert_eq!(
            outputs.video,
            PathBuf::from("/tmp/rec/video_20260830_120000.mp4")
        );
        assert_eq!(
            outputs.audio,
            PathBuf::from("/tmp/rec/audio_20260830_120000.wav")
        );
        assert_eq!(
            outputs.merged,
            PathBuf::from("/tmp/rec/recording_20260830_120000.mkv")
        );
    }

    #[test]
    fn test_remove_intermediates_keeps_merged() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = PlannedOutputs::with_stamp(dir.path(), "20260830_120001");
        std::fs::write(&outputs.video, b"v").unwrap();
        std::fs::write(&outputs.audio, b"a").unwrap();
        std::fs::write(&outputs.merged, b"m").unwrap();

        outputs.remove_intermediates().unwrap();

        assert!(!outputs.video.exists());
        assert!(!outputs.audio.exists());
        assert!(outputs.merged.exists());
    }
}
