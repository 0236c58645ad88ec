//! Recording state management
//!
//! Defines the recording state machine and the records a session leaves
//! behind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::audio::AudioStats;
use crate::output::OutputPaths;
use crate::video::VideoStats;

/// Current state of the recorder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No recording in progress
    #[default]
    Idle,
    /// Capture loops running
    Recording,
    /// Loops stopped, files being closed and muxed
    Finalizing,
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordingState::Idle => "idle",
            RecordingState::Recording => "recording",
            RecordingState::Finalizing => "finalizing",
        };
        f.write_str(name)
    }
}

/// Identity and outputs of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub with_audio: bool,
    pub started_at: DateTime<Utc>,
    pub paths: OutputPaths,
}

impl SessionInfo {
    pub fn new(with_audio: bool, paths: OutputPaths) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            with_audio,
            started_at: Utc::now(),
            paths,
        }
    }
}

/// Outcome of a finished session
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub info: SessionInfo,
    pub video: VideoStats,
    /// Present when audio was requested and the track was written
    pub audio: Option<AudioStats>,
    /// Final file, when finalization produced one
    pub output: Option<PathBuf>,
    /// Errors hit while capturing or finalizing
    pub errors: Vec<String>,
    pub finished_at: DateTime<Utc>,
}

impl SessionReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.output.is_some()
    }

    pub fn duration_secs(&self) -> f64 {
        self.finished_at
            .signed_duration_since(self.info.started_at)
            .num_milliseconds() as f64
            / 1000.0
    }
}

/// Snapshot of the recorder for control surfaces
#[derive(Debug, Clone, Serialize)]
pub struct RecorderStatus {
    pub state: RecordingState,
    /// The session being recorded or finalized
    pub session: Option<SessionInfo>,
    pub last_report: Option<SessionReport>,
    /// Most recent start or finalization failure
    pub last_error: Option<String>,
}
