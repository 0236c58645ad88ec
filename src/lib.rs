pub mod audio;
pub mod config;
pub mod console;
pub mod devices;
pub mod error;
pub mod http;
pub mod mux;
pub mod output;
pub mod recorder;
pub mod video;

pub use audio::{AudioBackend, AudioBackendConfig, AudioFile, AudioFrame, AudioStats, AudioWriter};
pub use config::Config;
pub use devices::{CaptureDevices, SystemDevices};
pub use error::{RecorderError, RecorderResult};
pub use http::{create_router, AppState};
pub use mux::{FfmpegMuxer, Muxer};
pub use output::OutputPaths;
pub use recorder::{Recorder, RecorderStatus, RecordingState, SessionInfo, SessionReport, SessionSettings};
pub use video::{Frame, ScreenSource, VideoStats, VideoWriter};

use std::sync::Arc;

/// Recorder wired to the real screen, encoder, audio input and ffmpeg muxer
pub fn system_recorder(config: &Config) -> Recorder {
    Recorder::new(
        SessionSettings::from(config),
        Arc::new(SystemDevices::from_config(config)),
        Arc::new(FfmpegMuxer::from_config(&config.recorder, &config.mux)),
    )
}
