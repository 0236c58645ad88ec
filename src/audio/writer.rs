use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::backend::AudioFrame;
use crate::error::{RecorderError, RecorderResult};

/// Counters for one audio track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioStats {
    pub chunks_written: usize,
    pub samples_written: usize,
    /// Chunks the capture side discarded on a full queue
    pub chunks_dropped: u64,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_secs: f64,
}

/// Streams captured chunks into a WAV file as they arrive
///
/// The WAV header is rewritten about once per second of audio, so an
/// interrupted session still leaves a readable file up to the last flush.
pub struct AudioWriter {
    path: PathBuf,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    stats: AudioStats,
    samples_since_flush: usize,
}

impl AudioWriter {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            writer: None,
            stats: AudioStats::default(),
            samples_since_flush: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consume frames until the channel closes, then finalize the file
    pub async fn record(mut self, mut audio_rx: mpsc::Receiver<AudioFrame>) -> RecorderResult<AudioStats> {
        info!("Writing audio to {}", self.path.display());

        while let Some(frame) = audio_rx.recv().await {
            self.write_frame(&frame)?;
        }

        self.finish()
    }

    pub fn write_frame(&mut self, frame: &AudioFrame) -> RecorderResult<()> {
        if self.writer.is_none() {
            self.open(frame)?;
        }

        if frame.sample_rate != self.stats.sample_rate || frame.channels != self.stats.channels {
            return Err(RecorderError::AudioWrite(format!(
                "Format changed mid-stream: {}Hz/{}ch -> {}Hz/{}ch",
                self.stats.sample_rate, self.stats.channels, frame.sample_rate, frame.channels
            )));
        }

        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };

        for &sample in &frame.samples {
            writer
                .write_sample(sample)
                .map_err(|e| RecorderError::AudioWrite(format!("Failed to write sample to WAV: {}", e)))?;
        }

        self.stats.chunks_written += 1;
        self.stats.samples_written += frame.samples.len();
        self.samples_since_flush += frame.samples.len();

        let flush_every = self.stats.sample_rate as usize * self.stats.channels as usize;
        if self.samples_since_flush >= flush_every {
            writer
                .flush()
                .map_err(|e| RecorderError::AudioWrite(format!("Failed to flush WAV: {}", e)))?;
            self.samples_since_flush = 0;
            debug!(
                "Audio flushed: {} samples in {} chunks",
                self.stats.samples_written, self.stats.chunks_written
            );
        }

        Ok(())
    }

    fn open(&mut self, first: &AudioFrame) -> RecorderResult<()> {
        let spec = hound::WavSpec {
            channels: first.channels,
            sample_rate: first.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&self.path, spec).map_err(|e| {
            RecorderError::AudioWrite(format!("Failed to create WAV file {:?}: {}", self.path, e))
        })?;

        self.writer = Some(writer);
        self.stats.sample_rate = first.sample_rate;
        self.stats.channels = first.channels;
        Ok(())
    }

    /// Finalize the WAV header and return the track counters
    pub fn finish(mut self) -> RecorderResult<AudioStats> {
        match self.writer.take() {
            Some(writer) => writer
                .finalize()
                .map_err(|e| RecorderError::AudioWrite(format!("Failed to finalize WAV file: {}", e)))?,
            None => {
                warn!("No audio received, {} was not created", self.path.display());
            }
        }

        let frames = self.stats.samples_written / self.stats.channels.max(1) as usize;
        self.stats.duration_secs = frames as f64 / self.stats.sample_rate.max(1) as f64;

        info!(
            "Audio complete: {:.1}s ({} chunks, {} samples)",
            self.stats.duration_secs, self.stats.chunks_written, self.stats.samples_written
        );

        Ok(self.stats.clone())
    }
}

impl Drop for AudioWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}
