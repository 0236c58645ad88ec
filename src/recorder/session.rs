use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::state::{SessionInfo, SessionReport};
use crate::audio::{AudioBackend, AudioBackendConfig, AudioStats, AudioWriter};
use crate::config::Config;
use crate::devices::CaptureDevices;
use crate::error::{RecorderError, RecorderResult};
use crate::mux::{mux_session, Muxer};
use crate::video::{VideoCapture, VideoStats, VideoWriterSettings};

/// Per-session parameters taken from the config
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub output_dir: PathBuf,
    pub frame_rate: f64,
    pub video_codec: String,
    pub video_tag: String,
    pub ffmpeg_path: String,
    pub audio: AudioBackendConfig,
    pub keep_sources: bool,
}

impl From<&Config> for SessionSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            output_dir: cfg.recorder.output_dir.clone(),
            frame_rate: cfg.recorder.frame_rate,
            video_codec: cfg.recorder.video_codec.clone(),
            video_tag: cfg.recorder.video_tag.clone(),
            ffmpeg_path: cfg.recorder.ffmpeg_path.clone(),
            audio: AudioBackendConfig::from(&cfg.audio),
            keep_sources: cfg.mux.keep_sources,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

struct VideoOutcome {
    stats: VideoStats,
    errors: Vec<RecorderError>,
}

struct AudioTrack {
    backend: Box<dyn AudioBackend>,
    writer_task: JoinHandle<RecorderResult<AudioStats>>,
}

/// A session whose capture loops are running
pub(crate) struct ActiveSession {
    info: SessionInfo,
    cancel: CancellationToken,
    failed: Arc<AtomicBool>,
    video_task: JoinHandle<VideoOutcome>,
    audio: Option<AudioTrack>,
}

impl ActiveSession {
    /// Open the writer and devices, then start capturing
    ///
    /// Any open failure releases what was already opened and leaves no
    /// session behind.
    pub async fn open(
        info: SessionInfo,
        devices: Arc<dyn CaptureDevices>,
        settings: &SessionSettings,
    ) -> RecorderResult<Self> {
        let video_path = info.paths.video.clone();

        let (screen, writer) = {
            let devices = Arc::clone(&devices);
            let settings = settings.clone();
            let path = video_path.clone();

            tokio::task::spawn_blocking(move || {
                let screen = devices.open_screen()?;
                let (width, height) = screen.size();
                let writer_settings = VideoWriterSettings {
                    width,
                    height,
                    frame_rate: settings.frame_rate,
                    codec: settings.video_codec,
                    tag: settings.video_tag,
                    ffmpeg_path: settings.ffmpeg_path,
                };
                let writer = devices
                    .open_video_writer(&path, &writer_settings)
                    .map_err(|e| match e {
                        RecorderError::VideoWriterOpen(_) => e,
                        other => RecorderError::VideoWriterOpen(other.to_string()),
                    })?;
                Ok::<_, RecorderError>((screen, writer))
            })
            .await
            .map_err(|e| RecorderError::VideoWriterOpen(format!("Open task failed: {}", e)))??
        };

        let audio = match &info.paths.audio {
            Some(wav_path) => match start_audio(devices.as_ref(), &settings.audio, wav_path.clone()).await {
                Ok(track) => Some(track),
                Err(e) => {
                    // Release the writer and drop the empty AVI
                    match tokio::task::spawn_blocking(move || writer.finish()).await {
                        Ok(Ok(())) => {}
                        Ok(Err(close)) => warn!("Failed to close video writer: {}", close),
                        Err(join) => warn!("Video writer close task failed: {}", join),
                    }
                    if let Err(rm) = tokio::fs::remove_file(&video_path).await {
                        warn!("Failed to remove {}: {}", video_path.display(), rm);
                    }
                    return Err(e);
                }
            },
            None => None,
        };

        let cancel = CancellationToken::new();
        let failed = Arc::new(AtomicBool::new(false));
        let frame_rate = settings.frame_rate;

        let video_task = {
            let cancel = cancel.clone();
            let failed = Arc::clone(&failed);

            tokio::task::spawn_blocking(move || {
                let mut capture = VideoCapture::new(screen, writer, frame_rate);
                let mut errors = Vec::new();

                if let Err(e) = capture.run(&cancel) {
                    error!("Video capture failed: {}", e);
                    failed.store(true, Ordering::SeqCst);
                    cancel.cancel();
                    errors.push(e);
                }

                let (stats, finished) = capture.finish();
                if let Err(e) = finished {
                    error!("Failed to close video writer: {}", e);
                    errors.push(e);
                }

                VideoOutcome { stats, errors }
            })
        };

        info!(
            "Session {} recording to {}",
            info.session_id,
            info.paths.final_output.display()
        );

        Ok(Self {
            info,
            cancel,
            failed,
            video_task,
            audio,
        })
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    /// Fires when the session is stopped or a capture loop fails
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Set when a capture loop ended on its own with an error
    pub fn failure_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.failed)
    }

    /// Stop both loops, close the files and mux when audio was recorded
    pub async fn finalize(self, muxer: &dyn Muxer, keep_sources: bool) -> SessionReport {
        let Self {
            info,
            cancel,
            video_task,
            audio,
            ..
        } = self;

        cancel.cancel();
        let mut errors: Vec<String> = Vec::new();

        let video = match video_task.await {
            Ok(outcome) => {
                errors.extend(outcome.errors.iter().map(|e| e.to_string()));
                outcome.stats
            }
            Err(e) => {
                errors.push(format!("Video task panicked: {}", e));
                VideoStats::default()
            }
        };

        let audio_stats = match audio {
            Some(track) => finish_audio(track, &mut errors).await,
            None => None,
        };

        let paths = &info.paths;
        let output = match (&paths.audio, &audio_stats) {
            (None, _) => paths.video.exists().then(|| paths.video.clone()),
            (Some(wav), Some(stats)) if stats.samples_written > 0 => {
                match mux_session(muxer, &paths.video, wav, &paths.final_output, keep_sources).await {
                    Ok(muxed) => {
                        for leftover in &muxed.leftovers {
                            errors.push(format!("Could not remove {}", leftover.display()));
                        }
                        Some(muxed.output)
                    }
                    Err(e) => {
                        errors.push(e.to_string());
                        None
                    }
                }
            }
            (Some(_), Some(_)) => {
                warn!("No audio was recorded, keeping video-only {}", paths.video.display());
                errors.push("No audio was recorded".to_string());
                paths.video.exists().then(|| paths.video.clone())
            }
            // The writer failed; its error is already in `errors`
            (Some(wav), None) => {
                warn!(
                    "Audio track failed, keeping {} and {} unmuxed",
                    paths.video.display(),
                    wav.display()
                );
                None
            }
        };

        let report = SessionReport {
            info,
            video,
            audio: audio_stats,
            output,
            errors,
            finished_at: Utc::now(),
        };

        if report.is_success() {
            info!(
                "Session {} finished: {:.1}s, {} frames",
                report.info.session_id,
                report.duration_secs(),
                report.video.frames_written
            );
        } else {
            warn!(
                "Session {} finished with errors: {}",
                report.info.session_id,
                report.errors.join("; ")
            );
        }

        report
    }
}

async fn start_audio(
    devices: &dyn CaptureDevices,
    config: &AudioBackendConfig,
    wav_path: PathBuf,
) -> RecorderResult<AudioTrack> {
    let mut backend = devices.open_audio(config).map_err(as_audio_open_error)?;
    let audio_rx = backend.start().await.map_err(as_audio_open_error)?;

    info!("Audio capture started ({})", backend.name());

    let writer_task = tokio::spawn(AudioWriter::new(wav_path).record(audio_rx));

    Ok(AudioTrack {
        backend,
        writer_task,
    })
}

async fn finish_audio(mut track: AudioTrack, errors: &mut Vec<String>) -> Option<AudioStats> {
    if let Err(e) = track.backend.stop().await {
        error!("Failed to stop audio backend: {}", e);
        errors.push(e.to_string());
    }
    let dropped = track.backend.dropped_chunks();

    match track.writer_task.await {
        Ok(Ok(mut stats)) => {
            stats.chunks_dropped = dropped;
            Some(stats)
        }
        Ok(Err(e)) => {
            error!("Audio writer failed: {}", e);
            errors.push(e.to_string());
            None
        }
        Err(e) => {
            errors.push(format!("Audio writer task panicked: {}", e));
            None
        }
    }
}

fn as_audio_open_error(e: RecorderError) -> RecorderError {
    match e {
        RecorderError::AudioDeviceOpen(_) => e,
        other => RecorderError::AudioDeviceOpen(other.to_string()),
    }
}
