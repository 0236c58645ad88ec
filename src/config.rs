use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Default config file location, without extension
pub const DEFAULT_CONFIG_PATH: &str = "config/screenrec";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub recorder: RecorderConfig,
    pub audio: AudioConfig,
    pub mux: MuxConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Directory the recorded_* files are written to
    pub output_dir: PathBuf,
    /// Nominal frame rate of the AVI stream
    pub frame_rate: f64,
    /// ffmpeg encoder used for the temporary/video-only AVI
    pub video_codec: String,
    /// FourCC stored in the AVI stream header
    pub video_tag: String,
    /// ffmpeg executable used for encoding and muxing
    pub ffmpeg_path: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            frame_rate: 20.0,
            video_codec: "mpeg4".to_string(),
            video_tag: "XVID".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Sample frames per captured chunk
    pub chunk_frames: usize,
    /// Chunks buffered between the device callback and the WAV writer
    pub queue_capacity: usize,
    /// Input device name; the default input device when unset
    pub device: Option<String>,
    /// Replay this WAV file instead of opening a microphone
    pub input_file: Option<PathBuf>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            chunk_frames: 1024,
            queue_capacity: 256,
            device: None,
            input_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MuxConfig {
    pub video_codec: String,
    pub audio_codec: String,
    /// Keep the .avi/.wav temporaries after a successful mux
    pub keep_sources: bool,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            keep_sources: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8765,
        }
    }
}

impl Config {
    /// Load configuration from an optional file layered with `SCREENREC__*`
    /// environment variables (e.g. `SCREENREC__RECORDER__FRAME_RATE=30`).
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("SCREENREC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        let cfg: Config = settings
            .try_deserialize()
            .context("Failed to parse config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.recorder.frame_rate.is_finite() && self.recorder.frame_rate > 0.0) {
            anyhow::bail!(
                "recorder.frame_rate must be positive, got {}",
                self.recorder.frame_rate
            );
        }
        if self.audio.channels == 0 || self.audio.sample_rate == 0 {
            anyhow::bail!("audio.channels and audio.sample_rate must be non-zero");
        }
        if self.audio.chunk_frames == 0 || self.audio.queue_capacity == 0 {
            anyhow::bail!("audio.chunk_frames and audio.queue_capacity must be non-zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_recording_format() {
        let cfg = Config::default();

        assert_eq!(cfg.recorder.frame_rate, 20.0);
        assert_eq!(cfg.recorder.video_tag, "XVID");
        assert_eq!(cfg.audio.sample_rate, 44100);
        assert_eq!(cfg.audio.channels, 2);
        assert_eq!(cfg.audio.chunk_frames, 1024);
        assert_eq!(cfg.mux.video_codec, "libx264");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("absent");
        let cfg = Config::load(path.to_str().unwrap())?;

        assert_eq!(cfg.http.port, 8765);
        assert_eq!(cfg.recorder.output_dir, PathBuf::from("."));
        Ok(())
    }

    #[test]
    fn test_load_partial_file() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("screenrec.toml");
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "[recorder]\nframe_rate = 30.0\n\n[audio]\nchannels = 1")?;

        let base = dir.path().join("screenrec");
        let cfg = Config::load(base.to_str().unwrap())?;

        assert_eq!(cfg.recorder.frame_rate, 30.0);
        assert_eq!(cfg.recorder.video_codec, "mpeg4");
        assert_eq!(cfg.audio.channels, 1);
        assert_eq!(cfg.audio.sample_rate, 44100);
        Ok(())
    }

    #[test]
    fn test_validate_rejects_zero_frame_rate() {
        let mut cfg = Config::default();
        cfg.recorder.frame_rate = 0.0;
        assert!(cfg.validate().is_err());
    }
}
