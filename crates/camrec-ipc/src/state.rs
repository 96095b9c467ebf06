//! Recorder state machine types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::SessionConfig;

/// The current state of the recording engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum RecorderState {
    /// No recording session; preview may still be running.
    #[default]
    Idle,

    /// A session is starting up.
    Starting {
        /// Current startup phase.
        phase: StartupPhase,
    },

    /// Frames and audio are being streamed to the encoder process.
    Recording {
        /// Active session parameters.
        config: SessionConfig,
    },

    /// The session is shutting down.
    Stopping {
        /// Reason for stopping.
        reason: StopReason,

        /// Current shutdown phase.
        phase: ShutdownPhase,
    },

    /// The last session failed. Partial output, if any, is preserved.
    Failed {
        /// Error message.
        message: String,

        /// Partial output file left on disk, if one was written.
        partial_output: Option<PathBuf>,
    },
}

impl RecorderState {
    /// Returns true if no session is active (Idle or Failed).
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Idle | Self::Failed { .. })
    }

    /// Returns true if a session is currently recording.
    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    /// Returns true if a session is starting.
    pub fn is_starting(&self) -> bool {
        matches!(self, Self::Starting { .. })
    }

    /// Returns true if a session is stopping.
    pub fn is_stopping(&self) -> bool {
        matches!(self, Self::Stopping { .. })
    }

    /// Returns true if the last session failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Starting { .. } => "Starting",
            Self::Recording { .. } => "Recording",
            Self::Stopping { .. } => "Stopping",
            Self::Failed { .. } => "Failed",
        }
    }
}

/// Startup phases for a recording session, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartupPhase {
    /// Making sure the camera worker is live.
    EnsureCamera,

    /// Opening the microphone input stream.
    OpenMicrophone,

    /// Spawning the external encoder process.
    SpawnEncoder,

    /// Starting the frame writer loop.
    StartWriter,
}

impl StartupPhase {
    /// Returns the next phase, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::EnsureCamera => Some(Self::OpenMicrophone),
            Self::OpenMicrophone => Some(Self::SpawnEncoder),
            Self::SpawnEncoder => Some(Self::StartWriter),
            Self::StartWriter => None,
        }
    }

    /// Returns the previous phase, if any (for rollback).
    pub fn previous(self) -> Option<Self> {
        match self {
            Self::EnsureCamera => None,
            Self::OpenMicrophone => Some(Self::EnsureCamera),
            Self::SpawnEncoder => Some(Self::OpenMicrophone),
            Self::StartWriter => Some(Self::SpawnEncoder),
        }
    }

    /// Returns the display name for this phase.
    pub fn name(self) -> &'static str {
        match self {
            Self::EnsureCamera => "Checking camera",
            Self::OpenMicrophone => "Opening microphone",
            Self::SpawnEncoder => "Starting encoder",
            Self::StartWriter => "Starting recording",
        }
    }
}

/// Shutdown phases for a recording session, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShutdownPhase {
    /// Stopping the frame writer loop.
    StopWriter,

    /// Closing the encoder's stdin and waiting for it to exit.
    CloseEncoder,

    /// Closing the microphone stream and finalizing the WAV file.
    CloseMicrophone,

    /// Merging video and audio temporaries into the final file.
    FinalizeOutput,
}

impl ShutdownPhase {
    /// Returns the next phase, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::StopWriter => Some(Self::CloseEncoder),
            Self::CloseEncoder => Some(Self::CloseMicrophone),
            Self::CloseMicrophone => Some(Self::FinalizeOutput),
            Self::FinalizeOutput => None,
        }
    }

    /// Returns the display name for this phase.
    pub fn name(self) -> &'static str {
        match self {
            Self::StopWriter => "Stopping recording",
            Self::CloseEncoder => "Closing encoder",
            Self::CloseMicrophone => "Closing microphone",
            Self::FinalizeOutput => "Finalizing output",
        }
    }
}

/// Reason for stopping a recording session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StopReason {
    /// User pressed Stop.
    UserRequested,

    /// The encoder process exited unexpectedly.
    EncoderCrashed { message: String },

    /// The camera disconnected mid-recording.
    CaptureError { message: String },

    /// The application is shutting down.
    AppExit,
}

impl StopReason {
    /// Returns a display message for this reason.
    pub fn message(&self) -> String {
        match self {
            Self::UserRequested => "Recording stopped by user".to_string(),
            Self::EncoderCrashed { message } => format!("Encoder error: {message}"),
            Self::CaptureError { message } => format!("Capture error: {message}"),
            Self::AppExit => "Application exiting".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_phases_walk_forward_and_back() {
        let mut phase = StartupPhase::EnsureCamera;
        let mut count = 1;
        while let Some(next) = phase.next() {
            assert_eq!(next.previous(), Some(phase));
            phase = next;
            count += 1;
        }
        assert_eq!(count, 4);
        assert_eq!(phase, StartupPhase::StartWriter);
    }

    #[test]
    fn test_can_start_only_from_idle_or_failed() {
        assert!(RecorderState::Idle.can_start());
        assert!(RecorderState::Failed {
            message: "boom".into(),
            partial_output: None,
        }
        .can_start());
        assert!(!RecorderState::Starting {
            phase: StartupPhase::EnsureCamera,
        }
        .can_start());
        assert!(!RecorderState::Stopping {
            reason: StopReason::UserRequested,
            phase: ShutdownPhase::StopWriter,
        }
        .can_start());
    }

    #[test]
    fn test_state_names() {
        assert_eq!(RecorderState::Idle.name(), "Idle");
        assert_eq!(
            RecorderState::Failed {
                message: String::new(),
                partial_output: None
            }
            .name(),
            "Failed"
        );
    }
}
