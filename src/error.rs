use crate::recorder::RecordingState;
use std::io;

/// Errors raised by the recorder and its devices
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("Cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: RecordingState,
    },

    #[error("Screen capture error: {0}")]
    ScreenCapture(String),

    #[error("Could not open video file for writing: {0}")]
    VideoWriterOpen(String),

    #[error("Video write error: {0}")]
    VideoWrite(String),

    #[error("Could not open audio input: {0}")]
    AudioDeviceOpen(String),

    #[error("Audio write error: {0}")]
    AudioWrite(String),

    #[error("Error combining video and audio: {0}")]
    Mux(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl RecorderError {
    /// Short machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            RecorderError::InvalidState { .. } => "INVALID_STATE",
            RecorderError::ScreenCapture(_) => "SCREEN_CAPTURE_ERROR",
            RecorderError::VideoWriterOpen(_) => "VIDEO_WRITER_OPEN_ERROR",
            RecorderError::VideoWrite(_) => "VIDEO_WRITE_ERROR",
            RecorderError::AudioDeviceOpen(_) => "AUDIO_DEVICE_OPEN_ERROR",
            RecorderError::AudioWrite(_) => "AUDIO_WRITE_ERROR",
            RecorderError::Mux(_) => "MUX_ERROR",
            RecorderError::Io(_) => "IO_ERROR",
        }
    }
}

pub type RecorderResult<T> = Result<T, RecorderError>;
