use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A 16-bit PCM WAV held in memory, used as a replayable audio input
pub struct AudioFile {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

        let spec = reader.spec();
        ensure_pcm16(&spec)?;

        let samples = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to decode {}", path.display()))?;

        let file = Self {
            path: path.to_path_buf(),
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        };
        debug!(
            "Loaded {}: {:.1}s at {}Hz/{}ch",
            path.display(),
            file.duration_secs(),
            file.sample_rate,
            file.channels
        );

        Ok(file)
    }

    /// Number of sample frames (samples per channel)
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate.max(1) as f64
    }
}

/// The recorder's audio path is 16-bit integer PCM end to end
fn ensure_pcm16(spec: &WavSpec) -> Result<()> {
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        anyhow::bail!(
            "Unsupported WAV format: {:?} {} bits (expected 16-bit PCM)",
            spec.sample_format,
            spec.bits_per_sample
        );
    }
    Ok(())
}
