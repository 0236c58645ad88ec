//! Device seam between the recorder and the platform
//!
//! The recorder only talks to `CaptureDevices`; `SystemDevices` wires in
//! xcap, ffmpeg and cpal, tests substitute their own.

use std::path::Path;

use crate::audio::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioSource};
use crate::config::Config;
use crate::error::RecorderResult;
use crate::video::{FfmpegAviWriter, ScreenSource, VideoWriter, VideoWriterSettings};

/// Opens everything a recording session captures from or writes to
pub trait CaptureDevices: Send + Sync {
    /// Screen to record. May block while probing the display.
    fn open_screen(&self) -> RecorderResult<Box<dyn ScreenSource>>;

    /// Video writer for `path`. Failure aborts the session before capture.
    fn open_video_writer(
        &self,
        path: &Path,
        settings: &VideoWriterSettings,
    ) -> RecorderResult<Box<dyn VideoWriter>>;

    /// Audio input, not yet started
    fn open_audio(&self, config: &AudioBackendConfig) -> RecorderResult<Box<dyn AudioBackend>>;
}

/// Primary monitor via xcap, AVI via ffmpeg, audio from the configured source
#[derive(Debug, Clone)]
pub struct SystemDevices {
    audio_source: AudioSource,
}

impl SystemDevices {
    pub fn new(audio_source: AudioSource) -> Self {
        Self { audio_source }
    }

    pub fn from_config(config: &Config) -> Self {
        let source = match &config.audio.input_file {
            Some(path) => AudioSource::File(path.clone()),
            None => AudioSource::Microphone(config.audio.device.clone()),
        };
        Self::new(source)
    }
}

impl CaptureDevices for SystemDevices {
    fn open_screen(&self) -> RecorderResult<Box<dyn ScreenSource>> {
        #[cfg(feature = "capture")]
        {
            Ok(Box::new(crate::video::PrimaryScreen::open()?))
        }

        #[cfg(not(feature = "capture"))]
        {
            Err(crate::error::RecorderError::ScreenCapture(
                "Built without the `capture` feature".to_string(),
            ))
        }
    }

    fn open_video_writer(
        &self,
        path: &Path,
        settings: &VideoWriterSettings,
    ) -> RecorderResult<Box<dyn VideoWriter>> {
        Ok(Box::new(FfmpegAviWriter::open(path, settings)?))
    }

    fn open_audio(&self, config: &AudioBackendConfig) -> RecorderResult<Box<dyn AudioBackend>> {
        AudioBackendFactory::create(self.audio_source.clone(), config.clone())
    }
}
