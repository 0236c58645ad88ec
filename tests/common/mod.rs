// Test doubles for the device and muxer seams
//
// Screens produce small synthetic frames, the video writer appends raw
// bytes to the target file, the microphone emits silent stereo chunks on a
// timer and the muxer concatenates its inputs.

#![allow(dead_code)]

use screenrec::audio::{AudioBackend, AudioBackendConfig, AudioFrame};
use screenrec::video::{BgrFrame, Frame, ScreenSource, VideoWriter, VideoWriterSettings};
use screenrec::{CaptureDevices, Muxer, Recorder, RecorderError, RecorderResult, SessionSettings};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const WIDTH: u32 = 8;
pub const HEIGHT: u32 = 6;

/// Knobs and counters shared between a test and its fake devices
#[derive(Default)]
pub struct FakeControls {
    pub fail_video_open: AtomicBool,
    pub fail_audio_open: AtomicBool,
    /// Screen capture errors once this many frames were grabbed (0 = never)
    pub fail_capture_after: AtomicU64,
    /// Microphone opens but never delivers a chunk
    pub silent_microphone: AtomicBool,
    /// Microphone switches to mono after this many chunks (0 = never)
    pub switch_to_mono_after: AtomicU64,
    pub frames_grabbed: AtomicU64,
    pub frames_written: AtomicU64,
    pub audio_chunks_sent: AtomicU64,
}

#[derive(Clone, Default)]
pub struct FakeDevices {
    pub controls: Arc<FakeControls>,
}

impl CaptureDevices for FakeDevices {
    fn open_screen(&self) -> RecorderResult<Box<dyn ScreenSource>> {
        Ok(Box::new(FakeScreen {
            controls: Arc::clone(&self.controls),
        }))
    }

    fn open_video_writer(
        &self,
        path: &Path,
        settings: &VideoWriterSettings,
    ) -> RecorderResult<Box<dyn VideoWriter>> {
        if self.controls.fail_video_open.load(Ordering::SeqCst) {
            return Err(RecorderError::VideoWriterOpen("codec unavailable".to_string()));
        }
        assert_eq!((settings.width, settings.height), (WIDTH, HEIGHT));

        let file = File::create(path)?;
        Ok(Box::new(FakeVideoWriter {
            file,
            frames: 0,
            controls: Arc::clone(&self.controls),
        }))
    }

    fn open_audio(&self, config: &AudioBackendConfig) -> RecorderResult<Box<dyn AudioBackend>> {
        Ok(Box::new(FakeMicrophone {
            config: config.clone(),
            controls: Arc::clone(&self.controls),
            cancel: None,
            task: None,
        }))
    }
}

pub struct FakeScreen {
    controls: Arc<FakeControls>,
}

impl ScreenSource for FakeScreen {
    fn name(&self) -> &str {
        "fake screen"
    }

    fn size(&self) -> (u32, u32) {
        (WIDTH, HEIGHT)
    }

    fn capture(&mut self) -> RecorderResult<Frame> {
        let grabbed = self.controls.frames_grabbed.load(Ordering::SeqCst);
        let fail_after = self.controls.fail_capture_after.load(Ordering::SeqCst);
        if fail_after > 0 && grabbed >= fail_after {
            return Err(RecorderError::ScreenCapture("display disconnected".to_string()));
        }

        self.controls.frames_grabbed.fetch_add(1, Ordering::SeqCst);
        Ok(Frame::filled(WIDTH, HEIGHT, [grabbed as u8, 128, 255, 255]))
    }
}

pub struct FakeVideoWriter {
    file: File,
    frames: u64,
    controls: Arc<FakeControls>,
}

impl VideoWriter for FakeVideoWriter {
    fn write_frame(&mut self, frame: &BgrFrame) -> RecorderResult<()> {
        self.file.write_all(&frame.data)?;
        self.frames += 1;
        self.controls.frames_written.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames
    }

    fn finish(mut self: Box<Self>) -> RecorderResult<()> {
        self.file.flush()?;
        Ok(())
    }
}

pub struct FakeMicrophone {
    config: AudioBackendConfig,
    controls: Arc<FakeControls>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

#[async_trait::async_trait]
impl AudioBackend for FakeMicrophone {
    async fn start(&mut self) -> RecorderResult<mpsc::Receiver<AudioFrame>> {
        if self.controls.fail_audio_open.load(Ordering::SeqCst) {
            return Err(RecorderError::AudioDeviceOpen("no input device".to_string()));
        }

        let (tx, rx) = mpsc::channel(self.config.queue_capacity);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let controls = Arc::clone(&self.controls);
        let config = self.config.clone();

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(10));
            let mut timestamp_ms = 0;
            if controls.silent_microphone.load(Ordering::SeqCst) {
                token.cancelled().await;
                return;
            }
            loop {
                // The first tick is immediate, so every session gets audio
                tokio::select! {
                    biased;
                    _ = ticker.tick() => {}
                    _ = token.cancelled() => break,
                }
                let sent = controls.audio_chunks_sent.load(Ordering::SeqCst);
                let mono_after = controls.switch_to_mono_after.load(Ordering::SeqCst);
                let channels = if mono_after > 0 && sent >= mono_after {
                    1
                } else {
                    config.channels
                };
                let frame = AudioFrame {
                    samples: vec![0i16; config.chunk_frames * channels as usize],
                    sample_rate: config.sample_rate,
                    channels,
                    timestamp_ms,
                };
                timestamp_ms += 10;
                if tx.send(frame).await.is_err() {
                    break;
                }
                controls.audio_chunks_sent.fetch_add(1, Ordering::SeqCst);
            }
        }));
        self.cancel = Some(cancel);

        Ok(rx)
    }

    async fn stop(&mut self) -> RecorderResult<()> {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.is_some()
    }

    fn name(&self) -> &str {
        "fake microphone"
    }
}

/// Writes the concatenation of both inputs, or fails on demand
#[derive(Default)]
pub struct FakeMuxer {
    pub fail: AtomicBool,
    pub calls: AtomicU64,
}

#[async_trait::async_trait]
impl Muxer for FakeMuxer {
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> RecorderResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RecorderError::Mux("libx264 not available".to_string()));
        }

        let mut out = OpenOptions::new().create(true).truncate(true).write(true).open(output)?;
        out.write_all(&std::fs::read(video)?)?;
        out.write_all(&std::fs::read(audio)?)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "fake muxer"
    }
}

pub struct Harness {
    pub recorder: Recorder,
    pub devices: FakeDevices,
    pub muxer: Arc<FakeMuxer>,
    pub output_dir: PathBuf,
}

/// Recorder writing into `output_dir` at 50 fps with small audio chunks
pub fn harness(output_dir: &Path) -> Harness {
    let devices = FakeDevices::default();
    let muxer = Arc::new(FakeMuxer::default());

    let mut settings = SessionSettings::default();
    settings.output_dir = output_dir.to_path_buf();
    settings.frame_rate = 50.0;
    settings.audio.chunk_frames = 441;

    let recorder = Recorder::new(
        settings,
        Arc::new(devices.clone()),
        Arc::clone(&muxer) as Arc<dyn Muxer>,
    );

    Harness {
        recorder,
        devices,
        muxer,
        output_dir: output_dir.to_path_buf(),
    }
}

/// File names in `dir`, sorted
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

pub fn count_with_extension(dir: &Path, ext: &str) -> usize {
    files_in(dir)
        .iter()
        .filter(|name| name.ends_with(&format!(".{}", ext)))
        .count()
}
