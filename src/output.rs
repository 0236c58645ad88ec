//! Output file naming
//!
//! Every session writes `recorded_<YYYYMMDD_HHMMSS>.<ext>` files. The
//! timestamp has one-second resolution, so two sessions started within the
//! same second resolve to the same names.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const VIDEO_EXTENSION: &str = "avi";
pub const AUDIO_EXTENSION: &str = "wav";
pub const MUXED_EXTENSION: &str = "mp4";

/// `recorded_<YYYYMMDD_HHMMSS>.<extension>`
pub fn timestamped_filename(at: DateTime<Local>, extension: &str) -> String {
    format!("recorded_{}.{}", at.format("%Y%m%d_%H%M%S"), extension)
}

/// Files belonging to one recording session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputPaths {
    /// AVI written by the video loop (final output when there is no audio)
    pub video: PathBuf,
    /// Temporary WAV, only when audio was requested
    pub audio: Option<PathBuf>,
    /// File the user ends up with
    pub final_output: PathBuf,
}

impl OutputPaths {
    pub fn new(output_dir: &Path, at: DateTime<Local>, with_audio: bool) -> Self {
        let video = output_dir.join(timestamped_filename(at, VIDEO_EXTENSION));

        if with_audio {
            Self {
                audio: Some(output_dir.join(timestamped_filename(at, AUDIO_EXTENSION))),
                final_output: muxed_path_for(&video),
                video,
            }
        } else {
            Self {
                audio: None,
                final_output: video.clone(),
                video,
            }
        }
    }

    /// Paths for a session starting now
    pub fn now(output_dir: &Path, with_audio: bool) -> Self {
        Self::new(output_dir, Local::now(), with_audio)
    }

    pub fn with_audio(&self) -> bool {
        self.audio.is_some()
    }
}

/// The .mp4 next to a video file
pub fn muxed_path_for(video: &Path) -> PathBuf {
    video.with_extension(MUXED_EXTENSION)
}
