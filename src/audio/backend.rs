use crate::error::RecorderResult;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since recording started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Number of sample frames (samples per channel)
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_ms(&self) -> u64 {
        self.frame_count() as u64 * 1000 / self.sample_rate.max(1) as u64
    }
}

/// Configuration for audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Requested sample rate in Hz
    pub sample_rate: u32,
    /// Channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Sample frames per emitted chunk
    pub chunk_frames: usize,
    /// Chunks the channel holds before new ones are dropped
    pub queue_capacity: usize,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            chunk_frames: 1024,
            queue_capacity: 256,
        }
    }
}

impl From<&crate::config::AudioConfig> for AudioBackendConfig {
    fn from(cfg: &crate::config::AudioConfig) -> Self {
        Self {
            sample_rate: cfg.sample_rate,
            channels: cfg.channels,
            chunk_frames: cfg.chunk_frames,
            queue_capacity: cfg.queue_capacity,
        }
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - Microphone: cpal default (or named) input device
/// - File: replay a WAV file in real time (headless machines, demos)
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a bounded channel receiver that will receive audio frames.
    /// The channel closes once the backend is stopped.
    async fn start(&mut self) -> RecorderResult<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> RecorderResult<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Chunks discarded because the channel was full
    fn dropped_chunks(&self) -> u64 {
        0
    }

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio source type
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Microphone input, default device when no name is given
    Microphone(Option<String>),
    /// WAV file replayed as if it were live input
    File(PathBuf),
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create audio backend based on source and configuration
    pub fn create(
        source: AudioSource,
        config: AudioBackendConfig,
    ) -> RecorderResult<Box<dyn AudioBackend>> {
        match source {
            AudioSource::Microphone(device) => {
                #[cfg(feature = "capture")]
                {
                    let backend = super::microphone::MicrophoneBackend::new(config, device);
                    Ok(Box::new(backend))
                }

                #[cfg(not(feature = "capture"))]
                {
                    let _ = (config, device);
                    Err(crate::error::RecorderError::AudioDeviceOpen(
                        "Built without the `capture` feature".to_string(),
                    ))
                }
            }

            AudioSource::File(path) => {
                let backend = super::replay::FileBackend::open(&path, config)?;
                Ok(Box::new(backend))
            }
        }
    }
}
