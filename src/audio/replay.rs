use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use super::chunker::ChunkAssembler;
use super::file::AudioFile;
use crate::error::{RecorderError, RecorderResult};

/// Replays a WAV file as live input, one chunk per chunk-duration
///
/// The channel closes when the file is exhausted or the backend is stopped.
pub struct FileBackend {
    config: AudioBackendConfig,
    file: std::sync::Arc<AudioFile>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn open(path: &Path, config: AudioBackendConfig) -> RecorderResult<Self> {
        let file = AudioFile::open(path)
            .map_err(|e| RecorderError::AudioDeviceOpen(format!("{:#}", e)))?;

        if file.sample_rate != config.sample_rate || file.channels != config.channels {
            warn!(
                "Replaying {} at its own format {}Hz/{}ch",
                file.path.display(), file.sample_rate, file.channels
            );
        }

        Ok(Self {
            config,
            file: std::sync::Arc::new(file),
            cancel: None,
            task: None,
        })
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> RecorderResult<mpsc::Receiver<AudioFrame>> {
        if self.task.is_some() {
            return Err(RecorderError::AudioDeviceOpen("Already capturing".to_string()));
        }

        let (tx, rx) = mpsc::channel(self.config.queue_capacity);
        let cancel = CancellationToken::new();

        let file = std::sync::Arc::clone(&self.file);
        let chunk_frames = self.config.chunk_frames;
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut assembler = ChunkAssembler::new(file.sample_rate, file.channels, chunk_frames);
            let mut chunks = assembler.push(&file.samples);
            chunks.extend(assembler.flush());

            let period = Duration::from_secs_f64(chunk_frames as f64 / file.sample_rate.max(1) as f64);
            let mut ticker = tokio::time::interval(period);

            for chunk in chunks {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }

            info!("Replay of {} finished", file.path.display());
        });

        info!(
            "Replaying {} ({:.1}s) as audio input",
            self.file.path.display(),
            self.file.duration_secs()
        );

        self.cancel = Some(cancel);
        self.task = Some(task);

        Ok(rx)
    }

    async fn stop(&mut self) -> RecorderResult<()> {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Replay task panicked: {}", e);
            }
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.is_some()
    }

    fn name(&self) -> &str {
        "WAV replay"
    }
}
